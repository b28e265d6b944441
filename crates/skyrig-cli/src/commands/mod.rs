pub mod generate;
pub mod show;
pub mod update;

use std::path::PathBuf;

use skyrig_core::ClusterUpdate;

use crate::UpdateArgs;

impl UpdateArgs {
    /// Convert CLI flags into a library update. Without `--init-command` or
    /// `--clear-init-commands` the existing commands are left alone.
    pub fn to_update(&self) -> ClusterUpdate {
        let replace_commands = self.clear_init_commands || !self.init_commands.is_empty();
        ClusterUpdate {
            instance_type: self.instance_type.clone(),
            instance_count: self.instance_count,
            volumes_size: self.volumes_size,
            ami: self.ami.clone(),
            custom_image_uri: self.custom_image_uri.clone(),
            ssh_key_path: self.ssh_key_path.as_ref().map(PathBuf::from),
            initialization_commands: replace_commands.then(|| self.init_commands.clone()),
        }
    }
}
