//! skyrig-core — cluster config generation for a Ray-style autoscaler.
//!
//! A generator starts from a packaged YAML template, deep-merges user
//! overrides (an in-memory mapping or a YAML file) on top, and then routes
//! named updates to the nested fields the autoscaler reads:
//!
//! ```text
//! instance_type           → available_node_types.*.node_config.InstanceType
//! instance_count          → max_workers, available_node_types.worker.{min,max}_workers
//! volumes_size            → available_node_types.*.node_config
//!                             .BlockDeviceMappings[0].Ebs.VolumeSize
//! ami                     → available_node_types.*.node_config.ImageId
//! custom_image_uri        → docker.image
//! ssh_key_path            → auth.ssh_private_key (absolute), node_config.KeyName
//! initialization_commands → initialization_commands
//! ```
//!
//! Saved configs load back into an equal document.

pub mod ami;
pub mod document;
pub mod error;
pub mod generator;
pub mod keys;
pub mod template;

pub use ami::{AmiResolver, StaticAmiResolver};
pub use document::{ClusterConfig, NodeTypeEntry, NodeTypeEntryMut};
pub use error::{ConfigError, ConfigResult};
pub use generator::{
    ClusterConfigGenerator, ClusterUpdate, ConfigSource, RayAwsClusterConfigGenerator,
    DEFAULT_REGION,
};
pub use template::{default_config, default_template};
