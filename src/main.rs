use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ossuary_engine::{CycleRunner, EngineConfig, StaticDiscovery, UnitContext};
use ossuary_server::ServerConfig;
use ossuary_store::Database;

#[derive(Parser)]
#[command(name = "ossuary", about = "Intelligence-ledger orchestration server")]
struct Args {
    /// Port to serve the dashboard API on.
    #[arg(long, default_value_t = 9417)]
    port: u16,

    /// Path to the ledger database. Defaults to ~/.ossuary/ossuary.db.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let db_path = args
        .db
        .unwrap_or_else(|| dirs_home().join(".ossuary").join("ossuary.db"));
    let db = Database::open(&db_path).expect("failed to open database");
    tracing::info!(path = %db_path.display(), "ledger database opened");

    let ctx = UnitContext::new(
        db,
        EngineConfig::default(),
        Arc::new(StaticDiscovery::empty()),
    )
    .expect("invalid engine config");
    let runner = Arc::new(CycleRunner::new(ctx));

    let config = ServerConfig { port: args.port };
    let handle = ossuary_server::start(config, runner)
        .await
        .expect("failed to start server");
    tracing::info!(port = handle.port, "ossuary ready");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
