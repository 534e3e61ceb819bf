use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use form_core::FormController;
use graph_client::GraphWorkbook;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::build_router;
use app_state::AppState;
use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Literacy data-entry form backed by a Graph workbook")]
struct Args {
    /// TOML settings file; defaults to ./literacy_entry.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.server_bind = bind;
    }

    let graph = settings
        .graph_settings()
        .context("workbook settings are incomplete")?;
    info!(
        workbook = ?graph.workbook,
        read_strategy = ?graph.read_strategy,
        log_table = %graph.log_table,
        "workbook configured"
    );
    let workbook = GraphWorkbook::new(graph)?;
    let state = AppState::new(FormController::new(Arc::new(workbook)))?;
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "entry form listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
