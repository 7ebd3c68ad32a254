//! Ledgerlens command-line front end.
//!
//! Builds reconciled statements for a period and prints them as JSON on
//! stdout. Logs go to stderr.

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ledgerlens_core::sources::ProviderSet;
use ledgerlens_core::{Clock, Period, Statement, StatementService, SystemClock};
use ledgerlens_shared::{AppConfig, AppError};

use args::Cli;

/// What the binary prints.
#[derive(Serialize)]
struct Report<'a> {
    company: &'a str,
    period: Period,
    statements: Vec<Statement>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<AppError>()
                .map_or(1, AppError::exit_code);
            error!(error = %err, code, "Statement build failed");
            eprintln!("ledgerlens: {err:#}");
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ledgerlens=info,ledgerlens_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = AppConfig::load().map_err(AppError::from)?;
    let period = cli.period.resolve(config.company.fiscal_year_start_month)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // Live connectors register here; none ship with the binary.
    let providers = ProviderSet::select(
        config.use_demo_data,
        ProviderSet::new(),
        config.company.currency,
        Arc::clone(&clock),
    );
    if providers.is_empty() {
        warn!("No providers configured; set use_demo_data = true to use demo data");
    }

    let service =
        StatementService::from_config(&config, providers, clock).map_err(AppError::from)?;
    info!(
        company = %config.company.name,
        %period,
        demo = config.use_demo_data,
        "Building statements"
    );

    let mut statements = Vec::with_capacity(cli.statement.kinds().len());
    for &kind in cli.statement.kinds() {
        let statement = service.build(&period, kind).await.map_err(AppError::from)?;
        statements.push(statement);
    }

    let report = Report {
        company: &config.company.name,
        period,
        statements,
    };
    let json = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");

    Ok(())
}
