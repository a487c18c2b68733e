//! `sentio` - run predictions and health checks against the prediction store

mod output;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sentio_connection::{ConnectionDescriptor, ConnectionPool};
use sentio_driver_postgres::PostgresConnector;
use sentio_service::logging::{self, LoggingConfig};
use sentio_service::{HealthService, LexiconPredictor, PredictionService};

use crate::settings::{Cli, Command, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging_config = if cfg!(debug_assertions) {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };
    let _logging = logging::init(
        logging_config
            .with_format(cli.log_format.into())
            .with_log_dir(cli.log_dir.clone()),
    )
    .context("failed to initialize logging")?;

    let descriptor = cli.descriptor()?;
    let pool = connect(&descriptor).await?;

    let outcome = run(&cli, &pool).await;
    pool.shutdown().await;
    outcome
}

async fn connect(descriptor: &ConnectionDescriptor) -> Result<ConnectionPool> {
    let connector = PostgresConnector::new(descriptor.endpoint.clone())
        .context("invalid database endpoint")?;
    let pool = ConnectionPool::connect(descriptor, connector)
        .await
        .context("invalid pool configuration")?;

    tracing::info!(
        host = %descriptor.endpoint.host,
        database = %descriptor.endpoint.database,
        status = %pool.status(),
        "connection pool started"
    );
    Ok(pool)
}

async fn run(cli: &Cli, pool: &ConnectionPool) -> Result<()> {
    match &cli.command {
        Command::Predict { text } => predict(cli.output, pool, &text.join(" ")).await,
        Command::Health => health(cli.output, pool).await,
        Command::Watch { interval } => {
            watch(cli.output, pool, Duration::from_secs((*interval).max(1))).await
        }
        Command::Recent { limit } => recent(cli.output, pool, *limit).await,
    }
}

async fn predict(format: OutputFormat, pool: &ConnectionPool, text: &str) -> Result<()> {
    let service = PredictionService::new(Arc::new(LexiconPredictor::seeded()), pool.clone());
    let response = service.predict(text).await.context("prediction failed")?;
    println!("{}", output::prediction(format, &response)?);
    Ok(())
}

async fn health(format: OutputFormat, pool: &ConnectionPool) -> Result<()> {
    let service = HealthService::new(pool.clone());
    let health = service.health().await;
    let ready = service.ready().await;
    println!("{}", output::health(format, &health, &ready)?);
    Ok(())
}

async fn watch(format: OutputFormat, pool: &ConnectionPool, interval: Duration) -> Result<()> {
    let service = HealthService::new(pool.clone());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                return Ok(());
            }
            _ = ticker.tick() => {
                let ready = service.ready().await;
                println!("{}", output::readiness_line(format, &ready)?);
            }
        }
    }
}

async fn recent(format: OutputFormat, pool: &ConnectionPool, limit: usize) -> Result<()> {
    let service = PredictionService::new(Arc::new(LexiconPredictor::seeded()), pool.clone());
    let records = service
        .recent(limit)
        .await
        .context("failed to read recent predictions")?;
    println!("{}", output::recent(format, &records)?);
    Ok(())
}
