use std::path::Path;

use skyrig_core::{
    ClusterConfig, ClusterConfigGenerator, ConfigSource, RayAwsClusterConfigGenerator,
    DEFAULT_REGION,
};

pub fn show(config: Option<&str>, format: &str) -> anyhow::Result<()> {
    println!("{}", render(config, format)?);
    Ok(())
}

fn render(config: Option<&str>, format: &str) -> anyhow::Result<String> {
    let source = config.map(|path| ConfigSource::File(Path::new(path).to_path_buf()));
    let generator = RayAwsClusterConfigGenerator::new(source, DEFAULT_REGION)?;
    let config: &ClusterConfig = generator.config();

    match format {
        "json" => Ok(serde_json::to_string_pretty(config)?),
        "yaml" => Ok(config.to_yaml_string()?),
        other => anyhow::bail!("unsupported output format: {other}"),
    }
}
