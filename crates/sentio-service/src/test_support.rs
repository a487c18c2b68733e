//! In-memory `predictions` table behind a connection factory

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sentio_connection::{
    BackoffStrategy, ConnectionDescriptor, ConnectionPool, PoolConfig, RetryPolicy,
};
use sentio_core::{
    Connection, ConnectionFactory, Endpoint, QueryResult, Result, Row, SentioError,
    StatementResult, Value,
};

const COLUMNS: [&str; 5] = ["id", "input", "label", "confidence", "created_at"];

pub(crate) struct MemoryStore {
    rows: Mutex<Vec<Vec<Value>>>,
    schema_creations: AtomicUsize,
    reachable: AtomicBool,
    failing: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            schema_creations: AtomicUsize::new(0),
            reachable: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        })
    }

    /// Refuse new connections
    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Fail every statement on open connections with a transport error
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    pub(crate) fn schema_creations(&self) -> usize {
        self.schema_creations.load(Ordering::SeqCst)
    }

    pub(crate) fn factory(self: &Arc<Self>) -> MemoryFactory {
        MemoryFactory {
            store: Arc::clone(self),
        }
    }
}

pub(crate) struct MemoryFactory {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ConnectionFactory for MemoryFactory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        if !self.store.reachable.load(Ordering::SeqCst) {
            return Err(SentioError::Connection("connection refused".into()));
        }
        Ok(Box::new(MemoryConnection {
            store: Arc::clone(&self.store),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MemoryConnection {
    store: Arc<MemoryStore>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn check(&self) -> Result<()> {
        if self.store.failing.load(Ordering::SeqCst) {
            return Err(SentioError::Connection("server closed the connection".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn driver_name(&self) -> &str {
        "memory"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        self.check()?;
        if sql.starts_with("CREATE TABLE") {
            self.store.schema_creations.fetch_add(1, Ordering::SeqCst);
            return Ok(StatementResult::default());
        }
        if sql.starts_with("INSERT INTO predictions") {
            self.store.rows.lock().push(params.to_vec());
            return Ok(StatementResult { affected_rows: 1 });
        }
        Err(SentioError::NotSupported(sql.to_string()))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.check()?;
        if sql == "SELECT 1" {
            return Ok(QueryResult::empty());
        }
        if !sql.starts_with("SELECT id, input, label") {
            return Err(SentioError::NotSupported(sql.to_string()));
        }

        let limit = params
            .first()
            .and_then(Value::as_i64)
            .unwrap_or(i64::MAX) as usize;
        let mut rows = self.store.rows.lock().clone();
        rows.sort_by_key(|values| std::cmp::Reverse(values[4].as_datetime()));

        let mut result = QueryResult::empty();
        result.rows = rows
            .into_iter()
            .take(limit)
            .map(|values| Row::new(COLUMNS.iter().map(|c| c.to_string()).collect(), values))
            .collect();
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) fn descriptor() -> ConnectionDescriptor {
    ConnectionDescriptor::new(Endpoint::new("memory", 5432, "sentio"))
        .with_pool(
            PoolConfig::new(1, 2)
                .with_connect_timeout_ms(1_000)
                .with_acquire_timeout_ms(500)
                .with_ping_timeout_ms(200),
        )
        .with_retry(RetryPolicy::new(BackoffStrategy::new(100, 1_600), 5))
}

pub(crate) async fn connected_pool(store: &Arc<MemoryStore>) -> ConnectionPool {
    ConnectionPool::connect(&descriptor(), store.factory())
        .await
        .expect("memory descriptor is valid")
}
