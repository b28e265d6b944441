use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "skyrig",
    about = "SkyRig — autoscaler cluster config generator",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a cluster config from the default template or an override file
    Generate {
        /// YAML file deep-merged onto the default template
        #[arg(short, long)]
        config: Option<String>,
        /// Provider region (only applied when no --config is given)
        #[arg(short, long, default_value = skyrig_core::DEFAULT_REGION)]
        region: String,
        /// Boot every node type from this AMI, treated as the region's latest image
        #[arg(long)]
        latest_ami: Option<String>,
        /// Where to write the generated YAML
        #[arg(short, long, default_value = "cluster.yaml")]
        output: String,
        #[command(flatten)]
        update: UpdateArgs,
    },
    /// Edit an existing cluster config in place
    Update {
        /// Cluster config to edit
        #[arg(short, long)]
        config: String,
        /// YAML file whose top-level keys replace those in the config
        #[arg(short, long)]
        merge: Option<String>,
        /// Write to this file instead of overwriting --config
        #[arg(short, long)]
        output: Option<String>,
        #[command(flatten)]
        update: UpdateArgs,
    },
    /// Print the resolved cluster config
    Show {
        /// Cluster config to show (default: the packaged template)
        #[arg(short, long)]
        config: Option<String>,
        /// Output format: yaml or json
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },
}

/// Named field updates shared by `generate` and `update`.
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// EC2 instance type for every node type
    #[arg(long)]
    pub instance_type: Option<String>,
    /// Fixed number of workers
    #[arg(long)]
    pub instance_count: Option<u32>,
    /// Root volume size in GiB
    #[arg(long)]
    pub volumes_size: Option<u64>,
    /// AMI id for every node type
    #[arg(long)]
    pub ami: Option<String>,
    /// Container image used cluster-wide
    #[arg(long)]
    pub custom_image_uri: Option<String>,
    /// Private key used to reach the nodes
    #[arg(long)]
    pub ssh_key_path: Option<String>,
    /// Command run once per node at boot (repeatable, replaces the list)
    #[arg(long = "init-command", conflicts_with = "clear_init_commands")]
    pub init_commands: Vec<String>,
    /// Replace the initialization commands with an empty list
    #[arg(long)]
    pub clear_init_commands: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skyrig=info".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { config, region, latest_ami, output, update } => {
            commands::generate::generate(
                config.as_deref(),
                &region,
                latest_ami.as_deref(),
                &output,
                &update,
            )
        }
        Commands::Update { config, merge, output, update } => {
            commands::update::update(&config, merge.as_deref(), output.as_deref(), &update)
        }
        Commands::Show { config, format } => {
            commands::show::show(config.as_deref(), &format)
        }
    }
}
