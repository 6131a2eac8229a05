//! Postforge service binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use postforge::config::ServiceConfig;
use postforge::history::HistoryLog;
use postforge::identity::{DynIdentityProvider, StaticTokenIdentity};
use postforge::ledger::CreditLedger;
use postforge::orchestrator::Orchestrator;
use postforge::provider::HttpProvider;
use postforge::service::{self, AppState};
use postforge::storage::{DynCreditStore, DynHistoryStore, FsStore, MemoryStore};

#[derive(Parser, Debug)]
#[command(name = "postforge", about = "Credit-metered AI content generation service")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address override (e.g. 0.0.0.0:8080).
    #[arg(long)]
    bind: Option<String>,

    /// Data directory for durable storage; omit to keep state in memory.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("postforge=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::from_env()?,
    };
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = Some(data_dir);
    }

    let (credit_store, history_store): (DynCreditStore, DynHistoryStore) = match &config.data_dir {
        Some(dir) => {
            let store = Arc::new(FsStore::new(dir)?);
            info!(data_dir = %dir.display(), "using filesystem store");
            (store.clone(), store)
        }
        None => {
            let store = Arc::new(MemoryStore::new());
            info!("using in-memory store; state is lost on restart");
            (store.clone(), store)
        }
    };

    let provider = Arc::new(HttpProvider::new(
        &config.provider_endpoint,
        &config.provider_model,
        config.provider_timeout(),
    )?);

    let orchestrator = Arc::new(Orchestrator::new(
        CreditLedger::new(credit_store, config.initial_balance),
        HistoryLog::new(history_store),
        provider,
        config.generation_cost,
    ));

    let identity: DynIdentityProvider = Arc::new(StaticTokenIdentity::from_env());
    let app = service::router(AppState {
        orchestrator,
        identity,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(
        address = %config.bind_address,
        provider = %config.provider_endpoint,
        cost = config.generation_cost,
        "postforge listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
