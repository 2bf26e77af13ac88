//! vodstat - Reconstruct viewer visits from streaming-server access logs

use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vodstat::{
    aggregation::Aggregator,
    cli::{Cli, Command, parse_day_range},
    data_loader::{DataLoader, load_ignore_list},
};
use vodstat_bitrate::{BitrateTable, ByteAccounting};
use vodstat_core::timezone::TimezoneConfig;
use vodstat_core::types::{DaySelector, MonthSelector};
use vodstat_core::Result;
use vodstat_terminal::get_formatter;

/// Byte accounting implied by the flags
async fn create_accounting(cli: &Cli) -> Result<ByteAccounting> {
    match &cli.bitrates {
        Some(path) => {
            let table = BitrateTable::load(path).await?;
            info!("Estimating traffic from {} bitrates", table.len());
            Ok(ByteAccounting::Estimated(Arc::new(table)))
        }
        None => Ok(ByteAccounting::Direct),
    }
}

/// Cancel `token` on Ctrl-C so running rollups stop between days
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --verbose flag should override RUST_LOG.
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("vodstat=info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vodstat=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let tz_config = TimezoneConfig::from_cli(cli.timezone.as_deref(), cli.utc)?;
    info!("Using timezone: {}", tz_config.display_name());

    let config = cli.aggregation_config();
    info!(
        "Reading {} logs, session gap {}s",
        config.format, config.session_gap_seconds
    );

    let accounting = create_accounting(&cli).await?;
    let show_progress = !cli.json && is_terminal::is_terminal(std::io::stdout());

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let tz = tz_config.tz;
    let mut aggregator = Aggregator::new(config, tz_config, accounting)?
        .with_progress(show_progress)
        .with_cancellation(cancel);

    let show_ignored = cli.ignore.is_some();
    if let Some(path) = &cli.ignore {
        let ignore = load_ignore_list(path).await?;
        aggregator = aggregator.with_ignore_set(Arc::new(ignore));
    }

    let loader = DataLoader::new(&cli.log_dir)?;
    let formatter = get_formatter(cli.json, show_ignored, tz);

    match cli.command {
        Command::Day { year, month, day } => {
            info!("Running day report");
            let day = DaySelector::new(year, month, day)?;
            let stats = aggregator.with_detail(true).load_day(day, &loader).await?;
            println!("{}", formatter.format_day(&stats));
        }
        Command::Month {
            year,
            month,
            since_day,
            until_day,
            detailed,
        } => {
            info!("Running month report");
            let month = MonthSelector::new(year, month)?;
            let range = parse_day_range(since_day, until_day)?;
            let aggregator = aggregator.with_detail(detailed);
            let stats = aggregator.load_month(month, &range, &loader).await?;

            if detailed && !cli.json {
                for day in &stats.days {
                    println!("{}", formatter.format_day(day));
                }
            }
            println!("{}", formatter.format_month(&stats));
        }
        Command::Year { year } => {
            info!("Running year report");
            let stats = aggregator.aggregate_year(year, &loader).await?;
            println!("{}", formatter.format_year(&stats));
        }
    }

    Ok(())
}
