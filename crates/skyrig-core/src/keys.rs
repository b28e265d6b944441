//! Key names of the Ray autoscaler cluster YAML schema.

pub const CLUSTER_NAME: &str = "cluster_name";
pub const MAX_WORKERS: &str = "max_workers";
pub const MIN_WORKERS: &str = "min_workers";
pub const INITIALIZATION_COMMANDS: &str = "initialization_commands";
pub const SETUP_COMMANDS: &str = "setup_commands";

pub const PROVIDER: &str = "provider";
pub const PROVIDER_TYPE: &str = "type";
pub const REGION: &str = "region";

pub const AUTH: &str = "auth";
pub const SSH_USER: &str = "ssh_user";
pub const SSH_PRIVATE_KEY: &str = "ssh_private_key";

pub const DOCKER: &str = "docker";
pub const IMAGE: &str = "image";
pub const CONTAINER_NAME: &str = "container_name";

pub const AVAILABLE_NODE_TYPES: &str = "available_node_types";
pub const HEAD_NODE_TYPE: &str = "head_node_type";
pub const NODE_CONFIG: &str = "node_config";

// AWS node_config keys use the EC2 API casing.
pub const INSTANCE_TYPE: &str = "InstanceType";
pub const IMAGE_ID: &str = "ImageId";
pub const KEY_NAME: &str = "KeyName";
pub const BLOCK_DEVICE_MAPPINGS: &str = "BlockDeviceMappings";
pub const DEVICE_NAME: &str = "DeviceName";
pub const EBS: &str = "Ebs";
pub const VOLUME_SIZE: &str = "VolumeSize";

/// Node type names used by the packaged templates.
pub const HEAD: &str = "head";
pub const WORKER: &str = "worker";

/// Root device used when a node type has no block device mappings yet.
pub const DEFAULT_ROOT_DEVICE: &str = "/dev/xvda";

/// Top-level sections every generated config must carry.
pub const REQUIRED_SECTIONS: [&str; 5] =
    [PROVIDER, AUTH, DOCKER, AVAILABLE_NODE_TYPES, MAX_WORKERS];
