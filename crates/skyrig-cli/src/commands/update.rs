use std::path::Path;

use anyhow::Context;
use skyrig_core::{
    ClusterConfigGenerator, ConfigSource, RayAwsClusterConfigGenerator, DEFAULT_REGION,
};

use crate::UpdateArgs;

pub fn update(
    config: &str,
    merge: Option<&str>,
    output: Option<&str>,
    update: &UpdateArgs,
) -> anyhow::Result<()> {
    let config_path = Path::new(config);
    let mut generator = RayAwsClusterConfigGenerator::new(
        Some(ConfigSource::File(config_path.to_path_buf())),
        DEFAULT_REGION,
    )
    .with_context(|| format!("failed to load {}", config_path.display()))?;

    if let Some(merge) = merge {
        let merge_path = Path::new(merge);
        generator
            .update_config(merge_path)
            .with_context(|| format!("failed to merge {}", merge_path.display()))?;
    }
    generator.apply_update(&update.to_update())?;

    let output = output.map(Path::new).unwrap_or(config_path);
    generator
        .save_config(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("✓ Updated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyrig_core::ClusterConfig;
    use tempfile::TempDir;

    #[test]
    fn update_in_place_with_merge() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("cluster.yaml");
        std::fs::write(&config, "cluster_name: base\n").unwrap();
        let merge = dir.path().join("merge.yaml");
        std::fs::write(&merge, "cluster_name: merged\n").unwrap();

        let args = UpdateArgs {
            volumes_size: Some(512),
            ..Default::default()
        };
        update(config.to_str().unwrap(), Some(merge.to_str().unwrap()), None, &args).unwrap();

        let saved = ClusterConfig::from_file(&config).unwrap();
        assert_eq!(saved.get("cluster_name").and_then(|v| v.as_str()), Some("merged"));
        assert_eq!(saved.node_type("worker").unwrap().volume_size(), Some(512));
    }

    #[test]
    fn update_missing_config_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.yaml");
        let result = update(missing.to_str().unwrap(), None, None, &UpdateArgs::default());
        assert!(result.is_err());
    }
}
