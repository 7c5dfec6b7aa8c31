//! Smart Explain terminal host
//!
//! Reads a markdown note, explains the selected text and streams the
//! answer to stdout. Ctrl-C dismisses the running explanation.

mod args;
mod presenter;

use anyhow::Context;
use args::Args;
use clap::Parser;
use presenter::TerminalPresenter;
use smart_explain_common::{
    config::AppConfig, metrics, DocumentSnapshot, Explainer, SessionState,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config);
    metrics::register_metrics();

    info!("Starting Smart Explain v{}", smart_explain_common::VERSION);

    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let Some(selection) = args.selection(&text) else {
        eprintln!("Text not found in {}", args.file.display());
        return Ok(ExitCode::FAILURE);
    };

    let snapshot = DocumentSnapshot {
        text,
        selection,
        cursor_line: args.cursor_line,
        title: args.note_title(),
    };

    let explainer = Arc::new(Explainer::new(&config));
    let presenter = Arc::new(TerminalPresenter::new(snapshot.selected_text()));

    tokio::spawn(dismiss_on_ctrl_c(explainer.clone()));

    match explainer.explain(&snapshot, presenter).await {
        Ok(report) => {
            info!(
                session_id = %report.id,
                state = %report.state,
                chunks = report.chunks,
                "Explanation finished"
            );
            Ok(match report.state {
                SessionState::Done | SessionState::Cancelled => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            })
        }
        Err(e) => {
            // Trigger refused, no session ran
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn dismiss_on_ctrl_c(explainer: Arc<Explainer>) {
    if signal::ctrl_c().await.is_err() {
        tracing::warn!("Failed to install Ctrl+C handler");
        return;
    }
    info!("Received Ctrl+C, dismissing explanation");
    if !explainer.dismiss().await {
        std::process::exit(130);
    }
}
