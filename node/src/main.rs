// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Context;
use clap::Parser;
use dapp_node::config::{load_env_file, ContractEnv, Settings, DEFAULT_CONFIG_PATH, DEFAULT_ENV_FILE};
use dapp_node::server::{build_router, AppState};
use dapp_node::telemetry::init_telemetry;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(name = "dapp-node", about = "Relay between dapp clients, ledger nodes and contract modules")]
struct Args {
    /// Node table and service settings
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Env file seeding contract hashes and store paths
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Overrides `server.bind`
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();
    let args = Args::parse();

    if load_env_file(&args.env_file)? {
        tracing::info!("Loaded environment from {:?}", args.env_file);
    }
    let settings = Settings::load(&args.config)?.with_env(ContractEnv::from_env()?);
    let bind = args.bind.unwrap_or(settings.server.bind);

    let state = Arc::new(AppState::new(settings).context("failed to initialize relay state")?);
    let app = build_router(state);

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("Listening on {}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}
