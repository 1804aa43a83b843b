// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand, ValueEnum};
use dapp_cli::commands::{nodes, records, reward};
use dapp_kernel::record::Category;
use dapp_node::config::{ContractEnv, Settings, DEFAULT_CONFIG_PATH};
use dapp_persistence::{RecordStore, StorePaths};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dapp")]
#[command(about = "Operator tool for the dapp relay's node table and side-effect stores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Activity,
    AdminGrant,
    All,
}

impl CategoryArg {
    fn categories(self) -> Vec<Category> {
        match self {
            CategoryArg::Activity => vec![Category::Activity],
            CategoryArg::AdminGrant => vec![Category::AdminGrant],
            CategoryArg::All => Category::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node table from a relay config file
    Nodes {
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Print the contents of the side-effect stores
    Records {
        /// Store directory. Without it the relay's config and environment decide.
        #[arg(long, short)]
        dir: Option<PathBuf>,

        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        #[arg(long, value_enum, default_value = "all")]
        category: CategoryArg,
    },
    /// Look up the reward points recorded for an activity
    Reward {
        activity_id: String,

        #[arg(long, short)]
        dir: Option<PathBuf>,

        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn open_store(dir: Option<PathBuf>, config: &PathBuf) -> anyhow::Result<RecordStore> {
    let paths = match dir {
        Some(dir) => StorePaths::under(dir),
        None => {
            let settings = Settings::load(config)?.with_env(ContractEnv::from_env()?);
            settings.store_paths()
        }
    };
    Ok(RecordStore::new(paths))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Nodes { config } => nodes::run(&config),
        Commands::Records {
            dir,
            config,
            category,
        } => records::run(&open_store(dir, &config)?, &category.categories()),
        Commands::Reward {
            activity_id,
            dir,
            config,
        } => reward::run(&open_store(dir, &config)?, &activity_id).map(|_| ()),
    }
}
