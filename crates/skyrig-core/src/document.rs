//! ClusterConfig — the nested YAML document behind every generator.
//!
//! The document is an insertion-ordered YAML mapping, so a config that is
//! loaded, edited, and saved again keeps its key order. Typed access to
//! individual node types goes through [`NodeTypeEntry`] and
//! [`NodeTypeEntryMut`] views instead of raw path lookups.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::keys::*;

/// A cloud autoscaler cluster specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterConfig {
    root: Mapping,
}

impl ClusterConfig {
    /// An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    /// Wrap a parsed YAML value. A null document (empty file) becomes an
    /// empty mapping; anything other than a mapping is rejected.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::new()),
            _ => Err(ConfigError::type_mismatch(&["<root>"], "mapping")),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Load a document from a YAML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = Self::from_yaml_str(&content)?;
        debug!(?path, keys = config.root.len(), "cluster config loaded");
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> ConfigResult<String> {
        serde_yaml::to_string(&self.root).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Write the document to `path` as YAML, replacing any existing file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let yaml = self.to_yaml_string()?;
        std::fs::write(path, yaml).map_err(|e| ConfigError::io(path, e))?;
        debug!(?path, "cluster config written");
        Ok(())
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Follow `path` through nested mappings.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.root.get(*first)?;
        for key in rest {
            current = current.as_mapping()?.get(*key)?;
        }
        Some(current)
    }

    /// Set a top-level key, returning the previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.root.insert(Value::from(key), value.into())
    }

    /// Walk to the mapping at `path`, creating missing (or null)
    /// intermediate mappings on the way.
    pub fn mapping_at_mut(&mut self, path: &[&str]) -> ConfigResult<&mut Mapping> {
        walk_mut(&mut self.root, path, &[])
    }

    /// Recursively merge `overrides` into the document. Mappings merge key
    /// by key; scalars and sequences replace what was there.
    pub fn deep_merge(&mut self, overrides: Mapping) {
        debug!(keys = overrides.len(), "deep-merging overrides");
        merge_mapping(&mut self.root, overrides);
    }

    /// Replace each top-level key present in `overrides` wholesale.
    pub fn merge_top_level(&mut self, overrides: Mapping) {
        debug!(keys = overrides.len(), "merging top-level overrides");
        for (key, value) in overrides {
            self.root.insert(key, value);
        }
    }

    /// Dotted paths of required sections that are absent or null.
    pub fn missing_sections(&self) -> Vec<String> {
        let mut missing: Vec<String> = REQUIRED_SECTIONS
            .iter()
            .filter(|section| is_absent(self.root.get(**section)))
            .map(|section| section.to_string())
            .collect();

        match self.node_type(WORKER) {
            Some(worker) => {
                for key in [MIN_WORKERS, MAX_WORKERS] {
                    if is_absent(worker.entry.get(key)) {
                        missing.push(format!("{AVAILABLE_NODE_TYPES}.{WORKER}.{key}"));
                    }
                }
            }
            None => missing.push(format!("{AVAILABLE_NODE_TYPES}.{WORKER}")),
        }
        missing
    }

    /// Deep-fill every key of `defaults` this document lacks (or holds as
    /// null). Existing values are kept, so after a fill the document carries
    /// every key path of `defaults` and merging it onto `defaults` again is a
    /// no-op.
    pub fn fill_defaults(&mut self, defaults: &ClusterConfig) {
        fill_mapping(&mut self.root, &defaults.root);
    }

    /// Check the shape of the required sections: `provider`, `auth`,
    /// `docker` and `available_node_types` are mappings, every node type is
    /// a mapping, and the worker bounds are non-negative integers.
    pub fn validate(&self) -> ConfigResult<()> {
        for section in [PROVIDER, AUTH, DOCKER, AVAILABLE_NODE_TYPES] {
            expect_mapping(self.root.get(section), &[section])?;
        }
        expect_count(self.root.get(MAX_WORKERS), &[MAX_WORKERS])?;

        let node_types =
            expect_mapping(self.root.get(AVAILABLE_NODE_TYPES), &[AVAILABLE_NODE_TYPES])?;
        for (name, entry) in node_types {
            if let Some(name) = name.as_str() {
                expect_mapping(Some(entry), &[AVAILABLE_NODE_TYPES, name])?;
            }
        }

        let worker = expect_mapping(node_types.get(WORKER), &[AVAILABLE_NODE_TYPES, WORKER])?;
        for key in [MIN_WORKERS, MAX_WORKERS] {
            expect_count(worker.get(key), &[AVAILABLE_NODE_TYPES, WORKER, key])?;
        }
        Ok(())
    }

    /// Names under `available_node_types`, in document order.
    pub fn node_type_names(&self) -> Vec<&str> {
        self.root
            .get(AVAILABLE_NODE_TYPES)
            .and_then(Value::as_mapping)
            .map(|types| types.keys().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn node_type(&self, name: &str) -> Option<NodeTypeEntry<'_>> {
        let entry = self.get_path(&[AVAILABLE_NODE_TYPES, name])?.as_mapping()?;
        Some(NodeTypeEntry { entry })
    }

    /// Mutable view of a node type, created empty if absent.
    pub fn node_type_mut(&mut self, name: &str) -> ConfigResult<NodeTypeEntryMut<'_>> {
        let entry = self.mapping_at_mut(&[AVAILABLE_NODE_TYPES, name])?;
        Ok(NodeTypeEntryMut {
            name: name.to_string(),
            entry,
        })
    }
}

impl From<Mapping> for ClusterConfig {
    fn from(root: Mapping) -> Self {
        Self::from_mapping(root)
    }
}

/// Read-only view of one entry under `available_node_types`.
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeEntry<'a> {
    entry: &'a Mapping,
}

impl<'a> NodeTypeEntry<'a> {
    pub fn as_mapping(&self) -> &'a Mapping {
        self.entry
    }

    pub fn node_config(&self) -> Option<&'a Mapping> {
        self.entry.get(NODE_CONFIG)?.as_mapping()
    }

    pub fn instance_type(&self) -> Option<&'a str> {
        self.node_config()?.get(INSTANCE_TYPE)?.as_str()
    }

    pub fn image_id(&self) -> Option<&'a str> {
        self.node_config()?.get(IMAGE_ID)?.as_str()
    }

    pub fn key_name(&self) -> Option<&'a str> {
        self.node_config()?.get(KEY_NAME)?.as_str()
    }

    /// Volume size of the first block device mapping, in GiB.
    pub fn volume_size(&self) -> Option<u64> {
        self.node_config()?
            .get(BLOCK_DEVICE_MAPPINGS)?
            .as_sequence()?
            .first()?
            .get(EBS)?
            .get(VOLUME_SIZE)?
            .as_u64()
    }

    pub fn min_workers(&self) -> Option<u64> {
        self.entry.get(MIN_WORKERS)?.as_u64()
    }

    pub fn max_workers(&self) -> Option<u64> {
        self.entry.get(MAX_WORKERS)?.as_u64()
    }
}

/// Mutable view of one entry under `available_node_types`.
#[derive(Debug)]
pub struct NodeTypeEntryMut<'a> {
    name: String,
    entry: &'a mut Mapping,
}

impl NodeTypeEntryMut<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn node_config_mut(&mut self) -> ConfigResult<&mut Mapping> {
        walk_mut(self.entry, &[NODE_CONFIG], &[AVAILABLE_NODE_TYPES, &self.name])
    }

    fn set_node_config(&mut self, key: &str, value: Value) -> ConfigResult<()> {
        self.node_config_mut()?.insert(Value::from(key), value);
        Ok(())
    }

    pub fn set_instance_type(&mut self, instance_type: &str) -> ConfigResult<()> {
        self.set_node_config(INSTANCE_TYPE, Value::from(instance_type))
    }

    pub fn set_image_id(&mut self, image_id: &str) -> ConfigResult<()> {
        self.set_node_config(IMAGE_ID, Value::from(image_id))
    }

    pub fn set_key_name(&mut self, key_name: &str) -> ConfigResult<()> {
        self.set_node_config(KEY_NAME, Value::from(key_name))
    }

    /// Set the first block device's EBS volume size, adding a root device
    /// mapping when the node has none.
    pub fn set_volume_size(&mut self, size_gib: u64) -> ConfigResult<()> {
        let name = self.name.clone();
        let node_config = self.node_config_mut()?;
        let mappings = node_config
            .entry(Value::from(BLOCK_DEVICE_MAPPINGS))
            .or_insert_with(|| Value::Sequence(Vec::new()));
        if mappings.is_null() {
            *mappings = Value::Sequence(Vec::new());
        }
        let mappings = mappings.as_sequence_mut().ok_or_else(|| {
            ConfigError::type_mismatch(
                &[AVAILABLE_NODE_TYPES, &name, NODE_CONFIG, BLOCK_DEVICE_MAPPINGS],
                "sequence",
            )
        })?;
        if mappings.is_empty() {
            let mut device = Mapping::new();
            device.insert(Value::from(DEVICE_NAME), Value::from(DEFAULT_ROOT_DEVICE));
            mappings.push(Value::Mapping(device));
        }
        let first = mappings[0].as_mapping_mut().ok_or_else(|| {
            ConfigError::type_mismatch(
                &[AVAILABLE_NODE_TYPES, &name, NODE_CONFIG, BLOCK_DEVICE_MAPPINGS, "0"],
                "mapping",
            )
        })?;
        let ebs = walk_mut(
            first,
            &[EBS],
            &[AVAILABLE_NODE_TYPES, &name, NODE_CONFIG, BLOCK_DEVICE_MAPPINGS, "0"],
        )?;
        ebs.insert(Value::from(VOLUME_SIZE), Value::from(size_gib));
        Ok(())
    }

    pub fn set_min_workers(&mut self, count: u64) {
        self.entry.insert(Value::from(MIN_WORKERS), Value::from(count));
    }

    pub fn set_max_workers(&mut self, count: u64) {
        self.entry.insert(Value::from(MAX_WORKERS), Value::from(count));
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn expect_mapping<'v>(value: Option<&'v Value>, path: &[&str]) -> ConfigResult<&'v Mapping> {
    value
        .and_then(Value::as_mapping)
        .ok_or_else(|| ConfigError::type_mismatch(path, "mapping"))
}

fn expect_count(value: Option<&Value>, path: &[&str]) -> ConfigResult<u64> {
    value
        .and_then(Value::as_u64)
        .ok_or_else(|| ConfigError::type_mismatch(path, "non-negative integer"))
}

fn fill_mapping(target: &mut Mapping, defaults: &Mapping) {
    for (key, default) in defaults {
        match target.get_mut(key) {
            Some(Value::Mapping(existing)) => {
                if let Value::Mapping(nested) = default {
                    fill_mapping(existing, nested);
                }
            }
            Some(Value::Null) | None => {
                debug!(key = ?key, "filling key from template");
                target.insert(key.clone(), default.clone());
            }
            Some(_) => {}
        }
    }
}

/// Walk `path` below `root`, creating missing or null mappings. `prefix`
/// is only used to report where a type mismatch happened.
fn walk_mut<'m>(
    root: &'m mut Mapping,
    path: &[&str],
    prefix: &[&str],
) -> ConfigResult<&'m mut Mapping> {
    let mut current = root;
    for (i, key) in path.iter().enumerate() {
        let child = current
            .entry(Value::from(*key))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if child.is_null() {
            *child = Value::Mapping(Mapping::new());
        }
        current = child.as_mapping_mut().ok_or_else(|| {
            let full: Vec<&str> = prefix.iter().chain(&path[..=i]).copied().collect();
            ConfigError::type_mismatch(&full, "mapping")
        })?;
    }
    Ok(current)
}

fn merge_mapping(base: &mut Mapping, overrides: Mapping) {
    for (key, value) in overrides {
        match value {
            Value::Mapping(incoming) => match base.get_mut(&key) {
                Some(Value::Mapping(existing)) => merge_mapping(existing, incoming),
                _ => {
                    base.insert(key, Value::Mapping(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> ClusterConfig {
        ClusterConfig::from_yaml_str(yaml).unwrap()
    }

    fn mapping(yaml: &str) -> Mapping {
        doc(yaml).into_mapping()
    }

    fn mismatch_path(err: ConfigError) -> String {
        match err {
            ConfigError::TypeMismatch { path, .. } => path,
            other => panic!("expected a type mismatch, got {other}"),
        }
    }

    #[test]
    fn deep_merge_keeps_unspecified_nested_keys() {
        let mut config = doc("provider:\n  type: aws\n  region: us-east-1\n");
        config.deep_merge(mapping("provider:\n  region: eu-west-1\n"));

        assert_eq!(config.get_path(&[PROVIDER, REGION]), Some(&Value::from("eu-west-1")));
        assert_eq!(config.get_path(&[PROVIDER, PROVIDER_TYPE]), Some(&Value::from("aws")));
    }

    #[test]
    fn deep_merge_replaces_sequences() {
        let mut config = doc("setup_commands: [a, b]\n");
        config.deep_merge(mapping("setup_commands: [c]\n"));
        assert_eq!(
            config.get(SETUP_COMMANDS),
            Some(&Value::Sequence(vec![Value::from("c")]))
        );
    }

    #[test]
    fn merge_top_level_replaces_whole_sections() {
        let mut config = doc("provider:\n  type: aws\n  region: us-east-1\n");
        config.merge_top_level(mapping("provider:\n  region: eu-west-1\n"));
        assert!(config.get_path(&[PROVIDER, PROVIDER_TYPE]).is_none());
    }

    #[test]
    fn mapping_at_mut_creates_intermediates() {
        let mut config = ClusterConfig::new();
        config
            .mapping_at_mut(&[DOCKER])
            .unwrap()
            .insert(Value::from(IMAGE), Value::from("img"));
        assert_eq!(config.get_path(&[DOCKER, IMAGE]), Some(&Value::from("img")));
    }

    #[test]
    fn mapping_at_mut_rejects_scalar_intermediate() {
        let mut config = doc("auth: not-a-mapping\n");
        let err = config.mapping_at_mut(&[AUTH]).unwrap_err();
        assert_eq!(mismatch_path(err), "auth");
    }

    #[test]
    fn non_mapping_document_is_type_mismatch() {
        let err = ClusterConfig::from_yaml_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }));
    }

    #[test]
    fn empty_document_is_empty_mapping() {
        let config = ClusterConfig::from_yaml_str("").unwrap();
        assert!(config.as_mapping().is_empty());
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = ClusterConfig::from_yaml_str("key: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    const COMPLETE: &str = "\
max_workers: 1
provider:
  type: aws
auth: {}
docker:
  image: ray
  container_name: ray_container
available_node_types:
  worker:
    min_workers: 1
    max_workers: 1
";

    #[test]
    fn fill_defaults_restores_nested_keys() {
        let defaults = doc(COMPLETE);
        let mut config = doc(
            "available_node_types:\n  worker:\n    node_config: {}\ndocker:\n  image: custom\n",
        );
        assert!(!config.missing_sections().is_empty());

        config.fill_defaults(&defaults);
        assert!(config.missing_sections().is_empty());
        let worker = config.node_type(WORKER).unwrap();
        assert_eq!(worker.min_workers(), Some(1));
        assert!(worker.node_config().is_some());
        assert_eq!(config.get_path(&[DOCKER, IMAGE]), Some(&Value::from("custom")));
        assert_eq!(
            config.get_path(&[DOCKER, CONTAINER_NAME]),
            Some(&Value::from("ray_container"))
        );
    }

    #[test]
    fn filled_document_is_stable_under_deep_merge() {
        let defaults = doc(COMPLETE);
        let mut config = doc("docker:\n  image: custom\nprovider: {}\n");
        config.fill_defaults(&defaults);

        let mut reloaded = defaults.clone();
        reloaded.deep_merge(config.clone().into_mapping());
        assert_eq!(reloaded, config);
    }

    #[test]
    fn fill_defaults_keeps_scalars_over_template_mappings() {
        let mut config = doc("provider: 5\n");
        config.fill_defaults(&doc(COMPLETE));
        assert_eq!(config.get(PROVIDER).and_then(Value::as_u64), Some(5));
    }

    #[test]
    fn validate_accepts_complete_document() {
        doc(COMPLETE).validate().unwrap();
    }

    #[test]
    fn validate_rejects_scalar_section() {
        let mut config = doc(COMPLETE);
        config.insert(PROVIDER, 5);
        assert_eq!(mismatch_path(config.validate().unwrap_err()), "provider");
    }

    #[test]
    fn validate_rejects_non_integer_max_workers() {
        let mut config = doc(COMPLETE);
        config.insert(MAX_WORKERS, "lots");
        assert_eq!(mismatch_path(config.validate().unwrap_err()), "max_workers");
    }

    #[test]
    fn validate_rejects_non_integer_worker_bound() {
        let mut config = doc(COMPLETE);
        let worker = config.node_type_mut(WORKER).unwrap();
        worker.entry.insert(Value::from(MIN_WORKERS), Value::from("one"));
        assert_eq!(
            mismatch_path(config.validate().unwrap_err()),
            "available_node_types.worker.min_workers"
        );
    }

    #[test]
    fn validate_rejects_sequence_node_type() {
        let mut config = doc(COMPLETE);
        config.deep_merge(mapping("available_node_types:\n  gpu: [a]\n"));
        assert_eq!(
            mismatch_path(config.validate().unwrap_err()),
            "available_node_types.gpu"
        );
    }

    #[test]
    fn set_volume_size_adds_root_device() {
        let mut config = ClusterConfig::new();
        config.node_type_mut(WORKER).unwrap().set_volume_size(64).unwrap();

        let worker = config.node_type(WORKER).unwrap();
        assert_eq!(worker.volume_size(), Some(64));
        let device = config
            .get_path(&[AVAILABLE_NODE_TYPES, WORKER, NODE_CONFIG, BLOCK_DEVICE_MAPPINGS])
            .and_then(Value::as_sequence)
            .and_then(|s| s.first())
            .and_then(|d| d.get(DEVICE_NAME));
        assert_eq!(device, Some(&Value::from(DEFAULT_ROOT_DEVICE)));
    }

    #[test]
    fn set_volume_size_rejects_non_sequence_mappings() {
        let mut config = doc(
            "available_node_types:\n  worker:\n    node_config:\n      BlockDeviceMappings: nope\n",
        );
        let err = config
            .node_type_mut(WORKER)
            .unwrap()
            .set_volume_size(10)
            .unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "sequence", .. }));
    }

    #[test]
    fn yaml_round_trip_keeps_key_order() {
        let yaml = "zeta: 1\nalpha:\n  b: 2\n  a: 3\n";
        let config = doc(yaml);
        assert_eq!(config.to_yaml_string().unwrap(), yaml);
    }
}
