//! Spoilage Sense - gas-sensor food spoilage classifier service
//!
//! Trains a random forest on the configured dataset at startup and serves
//! classification and retraining over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Serve on the default address with the default dataset
//! cargo run --release
//!
//! # Custom dataset stem (tries <stem>.xlsx, then <stem>.csv)
//! ./spoilage-sense --dataset data/run42
//!
//! # Train once and print the evaluation report
//! ./spoilage-sense evaluate
//! ```
//!
//! # Environment Variables
//!
//! - `SPOILAGE_CONFIG`: Path to a TOML config file
//! - `SPOILAGE_SERVER_ADDR`: HTTP bind address (default: 0.0.0.0:5000)
//! - `SPOILAGE_CORS_ORIGINS`: Comma-separated allowed CORS origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use spoilage_sense::api::{create_app, ServiceState};
use spoilage_sense::config::ServiceConfig;
use spoilage_sense::ml_engine::{ModelRegistry, Trainer};
use spoilage_sense::types::EvaluationReport;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "spoilage-sense")]
#[command(about = "Gas-sensor food spoilage classification service")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:5000")
    #[arg(short, long, value_name = "HOST:PORT", env = "SPOILAGE_SERVER_ADDR")]
    addr: Option<String>,

    /// Dataset path without extension; <stem>.xlsx is tried before <stem>.csv
    #[arg(long, value_name = "STEM")]
    dataset: Option<String>,

    /// Path to a TOML config file (overrides SPOILAGE_CONFIG)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Start serving without training; the model stays not-ready until
    /// POST /api/v1/retrain succeeds
    #[arg(long)]
    skip_initial_train: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Train once on the configured dataset and print the evaluation report
    Evaluate,
}

fn load_config(args: &CliArgs) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::load(),
    };

    if let Some(stem) = &args.dataset {
        config.dataset.path = stem.clone();
    }
    if let Some(addr) = &args.addr {
        config.server.addr = addr.clone();
    }
    Ok(config)
}

// ============================================================================
// Evaluate
// ============================================================================

fn print_report(report: &EvaluationReport) {
    println!("=== Random Forest Scores ===");
    println!("Test score:     {:.4}", report.test_score);
    println!("Training score: {:.4}", report.train_score);
    println!();
    println!("{:>12} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support");
    for m in &report.per_class {
        println!(
            "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            m.class, m.precision, m.recall, m.f1, m.support
        );
    }
    println!();
    for (name, avg) in [("macro avg", &report.macro_avg), ("weighted avg", &report.weighted_avg)] {
        println!(
            "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            name, avg.precision, avg.recall, avg.f1, avg.support
        );
    }
    println!();
    println!("Confusion matrix (rows: true, columns: predicted; {:?}):", report.classes);
    for row in &report.confusion_matrix {
        println!("  {row:?}");
    }
    println!();
    println!(
        "Noisy score (N(0, {})): {:.2} ({:.0}%)",
        report.noise_std_dev,
        report.noisy_score,
        report.noisy_score * 100.0
    );
    println!(
        "Samples: {} total, {} train, {} test, {} dropped",
        report.samples.total, report.samples.train, report.samples.test, report.samples.dropped
    );
}

fn run_evaluate(config: &ServiceConfig) -> Result<()> {
    let model = Trainer::new(config)
        .train_from_source()
        .context("Training failed")?;
    print_report(&model.report);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    if let Some(SubCommand::Evaluate) = &args.command {
        return run_evaluate(&config);
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Spoilage Sense - Food Spoilage Detection");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    info!(
        "Dataset: {} | Target: {} | Trees: {} (depth {})",
        config.dataset.path,
        config.dataset.target_column,
        config.forest.n_estimators,
        config.forest.max_depth
    );

    let registry = Arc::new(ModelRegistry::new());
    let trainer = Arc::new(Trainer::new(&config));

    if args.skip_initial_train {
        info!("Initial training skipped; model not ready until retrain");
    } else {
        let (registry, trainer) = (registry.clone(), trainer.clone());
        let outcome = tokio::task::spawn_blocking(move || registry.retrain(&trainer))
            .await
            .context("Initial training task failed")?;
        match outcome {
            Ok(model) => info!(
                generation = model.generation,
                test_score = model.report.test_score,
                "Initial model ready"
            ),
            // Serve anyway: health reports not-ready and retrain can recover
            Err(e) => warn!(error = %e, "Initial training failed, serving without a model"),
        }
    }

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(config.server.addr.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!("🌐 Listening on http://{}", config.server.addr);

    let app = create_app(ServiceState::new(registry, trainer));
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await;

    if let Err(e) = result {
        error!("[HttpServer] Server error: {}", e);
        return Err(anyhow::anyhow!("HTTP server error: {}", e));
    }

    info!("✓ Spoilage Sense shutdown complete");
    Ok(())
}
