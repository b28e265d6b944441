//! Packaged default cluster templates.

use crate::document::ClusterConfig;
use crate::error::ConfigResult;

const RAY_AWS_DEFAULT: &str = include_str!("../templates/ray_aws_default.yaml");

/// Raw YAML text of the Ray/AWS default cluster template.
pub fn default_template() -> &'static str {
    RAY_AWS_DEFAULT
}

/// Parse the Ray/AWS default cluster template.
pub fn default_config() -> ConfigResult<ClusterConfig> {
    ClusterConfig::from_yaml_str(RAY_AWS_DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::*;

    #[test]
    fn default_template_parses() {
        let config = default_config().unwrap();
        assert!(config.missing_sections().is_empty());
        assert_eq!(config.node_type_names(), vec![HEAD, WORKER]);
    }

    #[test]
    fn default_worker_has_root_volume() {
        let config = default_config().unwrap();
        let worker = config.node_type(WORKER).unwrap();
        assert_eq!(worker.volume_size(), Some(256));
        assert_eq!(worker.min_workers(), Some(1));
    }
}
