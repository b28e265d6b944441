//! Cluster config generators.
//!
//! A generator owns one [`ClusterConfig`], built from a packaged default
//! template with optional user overrides merged on top, and routes named
//! updates ([`ClusterUpdate`]) to the nested fields the autoscaler reads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::ami::AmiResolver;
use crate::document::{ClusterConfig, NodeTypeEntryMut};
use crate::error::{ConfigError, ConfigResult};
use crate::keys::*;
use crate::template;

/// Region used when a caller has no preference.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where override content comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// An in-memory mapping.
    Mapping(Mapping),
    /// A YAML file on disk.
    File(PathBuf),
}

impl ConfigSource {
    /// Resolve the source into a mapping, reading the file if needed.
    pub fn load(self) -> ConfigResult<Mapping> {
        match self {
            ConfigSource::Mapping(mapping) => Ok(mapping),
            ConfigSource::File(path) => Ok(ClusterConfig::from_file(&path)?.into_mapping()),
        }
    }
}

impl From<Mapping> for ConfigSource {
    fn from(mapping: Mapping) -> Self {
        ConfigSource::Mapping(mapping)
    }
}

impl From<ClusterConfig> for ConfigSource {
    fn from(config: ClusterConfig) -> Self {
        ConfigSource::Mapping(config.into_mapping())
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::File(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::File(path.to_path_buf())
    }
}

/// Named field updates. Unset fields leave the document untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterUpdate {
    pub instance_type: Option<String>,
    /// Fixed worker pool size; autoscaling bounds are pinned to it.
    pub instance_count: Option<u32>,
    /// Root volume size in GiB.
    pub volumes_size: Option<u64>,
    pub ami: Option<String>,
    /// Cluster-wide container image.
    pub custom_image_uri: Option<String>,
    pub ssh_key_path: Option<PathBuf>,
    /// Shell commands run once per node at boot.
    pub initialization_commands: Option<Vec<String>>,
}

impl ClusterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn instance_count(mut self, count: u32) -> Self {
        self.instance_count = Some(count);
        self
    }

    pub fn volumes_size(mut self, size_gib: u64) -> Self {
        self.volumes_size = Some(size_gib);
        self
    }

    pub fn ami(mut self, ami: impl Into<String>) -> Self {
        self.ami = Some(ami.into());
        self
    }

    pub fn custom_image_uri(mut self, uri: impl Into<String>) -> Self {
        self.custom_image_uri = Some(uri.into());
        self
    }

    pub fn ssh_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssh_key_path = Some(path.into());
        self
    }

    pub fn initialization_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initialization_commands = Some(commands.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Common behaviour of all cluster config generators.
pub trait ClusterConfigGenerator {
    fn config(&self) -> &ClusterConfig;

    fn config_mut(&mut self) -> &mut ClusterConfig;

    fn into_config(self) -> ClusterConfig
    where
        Self: Sized;

    /// The packaged template this generator starts from.
    fn default_config(&self) -> ConfigResult<ClusterConfig>;

    /// Route each set field of `update` to its place in the document.
    fn apply_update(&mut self, update: &ClusterUpdate) -> ConfigResult<()>;

    /// Merge a mapping or YAML file into the top level of the document.
    /// Matching keys are replaced wholesale, then keys the template defines
    /// under them are filled back in, so a saved document reloads unchanged.
    ///
    /// On error the document is left as it was.
    fn update_config(&mut self, source: impl Into<ConfigSource>) -> ConfigResult<()>
    where
        Self: Sized,
    {
        let overrides = source.into().load()?;
        let defaults = self.default_config()?;

        let mut staged = self.config().clone();
        staged.merge_top_level(overrides);
        staged.fill_defaults(&defaults);
        staged.validate()?;

        *self.config_mut() = staged;
        Ok(())
    }

    /// Write the document as YAML to `path`, overwriting existing content.
    fn save_config(&self, path: &Path) -> ConfigResult<()> {
        self.config().save(path)?;
        info!(?path, "cluster config saved");
        Ok(())
    }
}

/// Generator for Ray clusters on AWS.
#[derive(Debug, Clone)]
pub struct RayAwsClusterConfigGenerator {
    config: ClusterConfig,
    use_latest_ami: bool,
}

impl RayAwsClusterConfigGenerator {
    /// Build from the default template, merging `source` on top if given.
    ///
    /// `region` is only injected when no source is given; a user-supplied
    /// config carries its own provider section.
    pub fn new(source: Option<ConfigSource>, region: &str) -> ConfigResult<Self> {
        Self::build(source, region, None)
    }

    /// Like [`new`](Self::new), but when no source is given every node type
    /// boots the latest base image reported by `resolver`.
    pub fn with_latest_ami(
        source: Option<ConfigSource>,
        region: &str,
        resolver: &dyn AmiResolver,
    ) -> ConfigResult<Self> {
        Self::build(source, region, Some(resolver))
    }

    fn build(
        source: Option<ConfigSource>,
        region: &str,
        resolver: Option<&dyn AmiResolver>,
    ) -> ConfigResult<Self> {
        let defaults = template::default_config()?;
        let mut generator = Self {
            config: defaults.clone(),
            use_latest_ami: resolver.is_some(),
        };

        let overridden = source.is_some();
        if let Some(source) = source {
            generator.config.deep_merge(source.load()?);
            generator.config.fill_defaults(&defaults);
            generator.config.validate()?;
        } else {
            generator
                .config
                .mapping_at_mut(&[PROVIDER])?
                .insert(Value::from(REGION), Value::from(region));
            if let Some(resolver) = resolver {
                let ami = resolver.latest_ami(region)?;
                debug!(%ami, region, "resolved latest base image");
                generator.for_each_node_type(|node| node.set_image_id(&ami))?;
            }
        }

        info!(region, overridden, "ray aws cluster config generated");
        Ok(generator)
    }

    /// Whether the latest base image was resolved at construction.
    pub fn uses_latest_ami(&self) -> bool {
        self.use_latest_ami
    }

    fn for_each_node_type<F>(&mut self, mut f: F) -> ConfigResult<()>
    where
        F: FnMut(&mut NodeTypeEntryMut<'_>) -> ConfigResult<()>,
    {
        let names: Vec<String> = self
            .config
            .node_type_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in &names {
            let mut node = self.config.node_type_mut(name)?;
            f(&mut node)?;
        }
        Ok(())
    }

    fn apply_fields(&mut self, update: &ClusterUpdate) -> ConfigResult<()> {
        if let Some(instance_type) = &update.instance_type {
            self.update_instance_type(instance_type)?;
        }
        if let Some(count) = update.instance_count {
            self.update_instance_count(count)?;
        }
        if let Some(size) = update.volumes_size {
            self.update_volumes_size(size)?;
        }
        if let Some(ami) = &update.ami {
            self.update_ami(ami)?;
        }
        if let Some(uri) = &update.custom_image_uri {
            self.update_custom_image(uri)?;
        }
        if let Some(path) = &update.ssh_key_path {
            self.update_ssh_key(path)?;
        }
        if let Some(commands) = &update.initialization_commands {
            self.update_initialization_commands(commands);
        }
        Ok(())
    }

    fn update_instance_type(&mut self, instance_type: &str) -> ConfigResult<()> {
        debug!(instance_type, "updating instance type");
        self.for_each_node_type(|node| node.set_instance_type(instance_type))
    }

    fn update_instance_count(&mut self, count: u32) -> ConfigResult<()> {
        debug!(count, "pinning worker pool size");
        let count = u64::from(count);
        self.config.insert(MAX_WORKERS, count);
        let mut worker = self.config.node_type_mut(WORKER)?;
        worker.set_min_workers(count);
        worker.set_max_workers(count);
        Ok(())
    }

    fn update_volumes_size(&mut self, size_gib: u64) -> ConfigResult<()> {
        debug!(size_gib, "updating root volume size");
        self.for_each_node_type(|node| node.set_volume_size(size_gib))
    }

    fn update_ami(&mut self, ami: &str) -> ConfigResult<()> {
        debug!(ami, "updating node image");
        self.for_each_node_type(|node| node.set_image_id(ami))
    }

    fn update_custom_image(&mut self, uri: &str) -> ConfigResult<()> {
        debug!(uri, "updating docker image");
        self.config
            .mapping_at_mut(&[DOCKER])?
            .insert(Value::from(IMAGE), Value::from(uri));
        Ok(())
    }

    fn update_ssh_key(&mut self, path: &Path) -> ConfigResult<()> {
        let (key_path, key_name) = resolve_ssh_key(path)?;
        debug!(%key_path, %key_name, "updating ssh key");
        self.config
            .mapping_at_mut(&[AUTH])?
            .insert(Value::from(SSH_PRIVATE_KEY), Value::from(key_path));
        self.for_each_node_type(|node| node.set_key_name(&key_name))
    }

    fn update_initialization_commands(&mut self, commands: &[String]) {
        debug!(count = commands.len(), "replacing initialization commands");
        self.config
            .insert(INITIALIZATION_COMMANDS, Value::from(commands.to_vec()));
    }
}

impl ClusterConfigGenerator for RayAwsClusterConfigGenerator {
    fn config(&self) -> &ClusterConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ClusterConfig {
        &mut self.config
    }

    fn into_config(self) -> ClusterConfig {
        self.config
    }

    fn default_config(&self) -> ConfigResult<ClusterConfig> {
        template::default_config()
    }

    /// Applies every set field or none: a failing field restores the
    /// document to its state before the call.
    fn apply_update(&mut self, update: &ClusterUpdate) -> ConfigResult<()> {
        let snapshot = self.config.clone();
        let result = self.apply_fields(update);
        if let Err(e) = &result {
            debug!(error = %e, "update failed, restoring previous config");
            self.config = snapshot;
        }
        result
    }
}

/// Absolute key path plus the EC2 key pair name (file name up to its
/// first `.`).
fn resolve_ssh_key(path: &Path) -> ConfigResult<(String, String)> {
    let absolute = std::path::absolute(path).map_err(|e| ConfigError::io(path, e))?;
    let key_path = absolute
        .to_str()
        .ok_or_else(|| ConfigError::InvalidPath(absolute.display().to_string()))?
        .to_string();
    let key_name = absolute
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ConfigError::InvalidPath(format!("no key name in {key_path}")))?
        .to_string();
    Ok((key_path, key_name))
}
