//! Terminal rendering for command results

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use sentio_service::{HealthPayload, PredictionRecord, PredictionResponse, ReadyPayload};
use serde::Serialize;

use crate::settings::OutputFormat;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn prediction(format: OutputFormat, response: &PredictionResponse) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return json(response);
    }
    let mut table = table(vec!["ID", "Sentiment", "Confidence", "Logged"]);
    table.add_row(vec![
        response.id.to_string(),
        response.sentiment.to_string(),
        format!("{:.3}", response.confidence),
        if response.logged { "yes" } else { "no" }.to_string(),
    ]);
    Ok(table.to_string())
}

pub fn health(
    format: OutputFormat,
    health: &HealthPayload,
    ready: &ReadyPayload,
) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return json(&serde_json::json!({ "health": health, "ready": ready }));
    }
    let mut table = table(vec!["Check", "Value"]);
    table
        .add_row(vec!["liveness".to_string(), health.status.clone()])
        .add_row(vec!["uptime (s)".to_string(), health.uptime_secs.to_string()]);
    add_readiness_rows(&mut table, ready);
    Ok(table.to_string())
}

/// One line per check, for `watch`
pub fn readiness_line(format: OutputFormat, ready: &ReadyPayload) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string(ready)?);
    }
    let mut line = format!(
        "{} {:<8} pool={} idle={} checked_out={}/{} latency_ms={}",
        chrono::Local::now().format("%H:%M:%S"),
        ready.status,
        ready.pool_status,
        ready.idle,
        ready.checked_out,
        ready.max_size,
        or_dash(ready.latency_ms),
    );
    if let Some(ms) = ready.next_retry_in_ms {
        line.push_str(&format!(" retry_in_ms={ms} attempts={}", ready.retry_attempts));
    }
    if let Some(error) = &ready.error {
        line.push_str(&format!(" error=\"{error}\""));
    }
    Ok(line)
}

pub fn recent(format: OutputFormat, records: &[PredictionRecord]) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return json(&records);
    }
    let mut table = table(vec!["Created", "Sentiment", "Confidence", "Input"]);
    for record in records {
        table.add_row(vec![
            record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.sentiment.to_string(),
            format!("{:.3}", record.confidence),
            record.input.clone(),
        ]);
    }
    Ok(table.to_string())
}

fn add_readiness_rows(table: &mut Table, ready: &ReadyPayload) {
    table
        .add_row(vec!["readiness".to_string(), ready.status.clone()])
        .add_row(vec!["pool".to_string(), ready.pool_status.clone()])
        .add_row(vec!["latency (ms)".to_string(), or_dash(ready.latency_ms)])
        .add_row(vec![
            "connections".to_string(),
            format!(
                "{} idle, {} checked out, max {}",
                ready.idle, ready.checked_out, ready.max_size
            ),
        ])
        .add_row(vec![
            "retry".to_string(),
            match ready.next_retry_in_ms {
                Some(ms) => format!("attempt {} in {ms} ms", ready.retry_attempts + 1),
                None => "-".to_string(),
            },
        ])
        .add_row(vec!["error".to_string(), or_dash(ready.error.as_ref())]);
}
