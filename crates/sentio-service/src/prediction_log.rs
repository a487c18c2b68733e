//! Persistent log of served predictions

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use sentio_connection::{ConnectionPool, PoolResult};
use sentio_core::{Row, SentioError, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::predictor::{Prediction, Sentiment};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS predictions (
    id UUID PRIMARY KEY,
    input TEXT NOT NULL,
    label TEXT NOT NULL,
    confidence DOUBLE PRECISION NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)";

const INSERT: &str =
    "INSERT INTO predictions (id, input, label, confidence, created_at) VALUES ($1, $2, $3, $4, $5)";

const SELECT_RECENT: &str = "SELECT id, input, label, confidence, created_at \
     FROM predictions ORDER BY created_at DESC LIMIT $1";

/// One logged prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub input: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(input: impl Into<String>, prediction: Prediction) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: input.into(),
            sentiment: prediction.sentiment,
            confidence: prediction.confidence,
            created_at: Utc::now(),
        }
    }

    fn params(&self) -> Vec<Value> {
        vec![
            Value::Uuid(self.id),
            Value::String(self.input.clone()),
            Value::String(self.sentiment.as_str().to_string()),
            Value::Float64(self.confidence),
            Value::DateTimeUtc(self.created_at),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, SentioError> {
        let column = |name: &str| {
            row.get_by_name(name)
                .ok_or_else(|| SentioError::Query(format!("missing column '{name}'")))
        };
        let malformed = |name: &str| SentioError::Query(format!("malformed column '{name}'"));

        let label = column("label")?.as_str().ok_or_else(|| malformed("label"))?;
        Ok(Self {
            id: column("id")?.as_uuid().ok_or_else(|| malformed("id"))?,
            input: column("input")?
                .as_str()
                .ok_or_else(|| malformed("input"))?
                .to_string(),
            sentiment: Sentiment::parse(label)
                .ok_or_else(|| SentioError::Query(format!("unknown label '{label}'")))?,
            confidence: column("confidence")?
                .as_f64()
                .ok_or_else(|| malformed("confidence"))?,
            created_at: column("created_at")?
                .as_datetime()
                .ok_or_else(|| malformed("created_at"))?,
        })
    }
}

/// Reads and writes the `predictions` table through the pool
pub struct PredictionLog {
    pool: ConnectionPool,
    schema_ready: AtomicBool,
}

impl PredictionLog {
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            schema_ready: AtomicBool::new(false),
        }
    }

    /// Create the table if this process has not done so yet
    pub async fn ensure_schema(&self) -> PoolResult<()> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.pool
            .with_connection(|conn| {
                Box::pin(async move {
                    conn.execute(CREATE_TABLE, &[]).await?;
                    Ok::<_, SentioError>(())
                })
            })
            .await?;
        self.schema_ready.store(true, Ordering::Release);
        tracing::debug!("prediction log schema ready");
        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub async fn insert(&self, record: &PredictionRecord) -> PoolResult<()> {
        self.ensure_schema().await?;
        let params = record.params();
        let affected = self
            .pool
            .with_connection(move |conn| {
                Box::pin(async move {
                    let result = conn.execute(INSERT, &params).await?;
                    Ok::<_, SentioError>(result.affected_rows)
                })
            })
            .await?;
        tracing::trace!(affected, "prediction logged");
        Ok(())
    }

    /// Most recent predictions, newest first
    pub async fn recent(&self, limit: u32) -> PoolResult<Vec<PredictionRecord>> {
        self.ensure_schema().await?;
        let limit = i64::from(limit);
        self.pool
            .with_connection(move |conn| {
                Box::pin(async move {
                    let result = conn.query(SELECT_RECENT, &[Value::Int64(limit)]).await?;
                    result
                        .rows
                        .iter()
                        .map(PredictionRecord::from_row)
                        .collect::<Result<Vec<_>, SentioError>>()
                })
            })
            .await
    }
}
