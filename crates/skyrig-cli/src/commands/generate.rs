use std::path::{Path, PathBuf};

use anyhow::Context;
use skyrig_core::{
    ClusterConfigGenerator, ConfigSource, RayAwsClusterConfigGenerator, StaticAmiResolver,
};
use tracing::info;

use crate::UpdateArgs;

pub fn generate(
    config: Option<&str>,
    region: &str,
    latest_ami: Option<&str>,
    output: &str,
    update: &UpdateArgs,
) -> anyhow::Result<()> {
    let source = config.map(|path| ConfigSource::File(PathBuf::from(path)));

    let mut generator = match latest_ami {
        Some(ami) => {
            let resolver = StaticAmiResolver::any_region(ami);
            RayAwsClusterConfigGenerator::with_latest_ami(source, region, &resolver)
        }
        None => RayAwsClusterConfigGenerator::new(source, region),
    }
    .context("failed to build cluster config")?;

    generator.apply_update(&update.to_update())?;

    let output = Path::new(output);
    generator
        .save_config(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(region, "generated cluster config");
    println!("✓ Generated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyrig_core::ClusterConfig;
    use tempfile::TempDir;

    #[test]
    fn generate_writes_updated_config() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("cluster.yaml");
        let update = UpdateArgs {
            instance_count: Some(4),
            custom_image_uri: Some("my/image:1".to_string()),
            ..Default::default()
        };

        generate(None, "eu-west-1", Some("ami-1"), output.to_str().unwrap(), &update).unwrap();

        let config = ClusterConfig::from_file(&output).unwrap();
        assert_eq!(
            config.get_path(&["provider", "region"]).and_then(|v| v.as_str()),
            Some("eu-west-1")
        );
        let worker = config.node_type("worker").unwrap();
        assert_eq!(worker.min_workers(), Some(4));
        assert_eq!(worker.image_id(), Some("ami-1"));
    }
}
