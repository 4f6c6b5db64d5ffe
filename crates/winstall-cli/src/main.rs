use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use winstall_core::cleanup::FsCleaner;
use winstall_core::config::WinstallConfig;
use winstall_core::execution::{ProcessExecutor, TokioProcessExecutor};
use winstall_core::installer::ProcessInstaller;
use winstall_core::inventory::{DatabaseInventoryCollector, ProcessPackageDatabase};
use winstall_core::models::{CoreError, CoreErrorKind, CoreResult};
use winstall_core::reconcile::{ProductReconciler, ReconciliationCycle};
use winstall_core::transfer::HttpTransfer;

const EXIT_CYCLE_FAILURE: u8 = 1;
const EXIT_PRODUCT_FAILURE: u8 = 2;

/// Converges installed Windows products towards a desired set.
#[derive(Parser, Debug)]
#[command(name = "winstall", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one reconciliation cycle and print the cycle report
    Apply {
        /// Desired-set file (JSON)
        #[arg(long, short = 'c')]
        config: PathBuf,
    },
    /// Print the action each product would take, without changing anything
    Plan {
        #[arg(long, short = 'c')]
        config: PathBuf,
    },
    /// Print the observed inventory
    Inventory {
        /// Optional desired-set file; only its provider exclusions are used
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(error = %error, "failed to start tokio runtime");
            return ExitCode::from(EXIT_CYCLE_FAILURE);
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(
                identity = ?error.identity,
                action = ?error.action,
                kind = ?error.kind,
                message = %error.message,
                "winstall failed"
            );
            ExitCode::from(EXIT_CYCLE_FAILURE)
        }
    }
}

async fn run(command: Command) -> CoreResult<ExitCode> {
    match command {
        Command::Apply { config } => {
            let config = WinstallConfig::load(&config)?;
            let report = build_cycle(&config)?.run(config.desired_products()).await?;
            print_json(&report)?;
            if report.has_failures() {
                Ok(ExitCode::from(EXIT_PRODUCT_FAILURE))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Plan { config } => {
            let config = WinstallConfig::load(&config)?;
            let planned = build_cycle(&config)?
                .plan_only(&config.desired_products())
                .await?;
            print_json(&planned)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Inventory { config } => {
            let config = match config {
                Some(path) => WinstallConfig::load(&path)?,
                None => WinstallConfig::default(),
            };
            let inventory = build_cycle(&config)?.collect().await?;
            print_json(&inventory)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_cycle(config: &WinstallConfig) -> CoreResult<ReconciliationCycle> {
    let executor: Arc<dyn ProcessExecutor> = Arc::new(TokioProcessExecutor);

    let filter = config.provider_filter()?;
    tracing::debug!(
        excluded_providers = ?filter.patterns().collect::<Vec<_>>(),
        "provider exclusions"
    );
    let collector =
        DatabaseInventoryCollector::with_filter(ProcessPackageDatabase::new(executor.clone()), filter);
    let reconciler = ProductReconciler::new(
        Arc::new(HttpTransfer::default()),
        Arc::new(ProcessInstaller::new(executor)),
        Arc::new(FsCleaner),
    )
    .staging_dir(config.staging_dir());

    tracing::debug!(
        staging_dir = %reconciler.staging_dir_path().display(),
        max_parallel = config.max_parallel(),
        products = config.products.len(),
        "configured reconciliation cycle"
    );

    Ok(ReconciliationCycle::new(Arc::new(collector), Arc::new(reconciler))
        .max_parallel(config.max_parallel()))
}

fn print_json(value: &impl Serialize) -> CoreResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|error| {
        CoreError::new(
            CoreErrorKind::Internal,
            format!("failed to render output: {error}"),
        )
    })?;
    println!("{rendered}");
    Ok(())
}
