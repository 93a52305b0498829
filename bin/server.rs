// 🌐 Expense Classifier - Web Server
// Upload a bank CSV in the browser and explore where the money went.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use expense_classifier::config::AppConfig;
use expense_classifier::logging::init_tracing;
use expense_classifier::server::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "expense-server", version, about = "Web dashboard for classifying bank transactions")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides [server].addr
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }

    let classifier = config.build_classifier()?;
    info!(keywords = classifier.table().keyword_count(), "keyword table loaded");

    let addr = config.server.addr.clone();
    let app = router(AppState::new(config, classifier));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/health", addr);
    println!("   Press Ctrl+C to stop");

    axum::serve(listener, app).await.context("server stopped unexpectedly")?;
    Ok(())
}
