//! In-memory stand-ins for a database, shared by the unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sentio_core::{
    Connection, ConnectionFactory, Endpoint, QueryResult, Result, SentioError, StatementResult,
    Value,
};

use crate::descriptor::ConnectionDescriptor;
use crate::pool::PoolConfig;
use crate::supervisor::{BackoffStrategy, RetryPolicy};

/// Server side of one mock connection; lets a test kill it from outside
pub(crate) struct MockSession {
    closed: AtomicBool,
    killed: AtomicBool,
}

impl MockSession {
    pub(crate) fn kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockConnection {
    session: Arc<MockSession>,
    store: Arc<MockStore>,
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.round_trip().await?;
        Ok(StatementResult { affected_rows: 1 })
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.store.statements.lock().push(sql.to_string());
        self.round_trip().await?;
        Ok(QueryResult::empty())
    }

    async fn close(&self) -> Result<()> {
        self.session.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.session.is_closed() || self.session.killed.load(Ordering::SeqCst)
    }
}

impl MockConnection {
    async fn round_trip(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SentioError::Connection("connection reset by peer".into()));
        }
        let delay = *self.store.query_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.store.fail_queries.load(Ordering::SeqCst) {
            return Err(SentioError::Connection("server closed the connection".into()));
        }
        Ok(())
    }
}

/// A fake database server the tests can take down and bring back
pub(crate) struct MockStore {
    reachable: AtomicBool,
    fail_queries: AtomicBool,
    attempts: AtomicUsize,
    connect_delay: Mutex<Duration>,
    query_delay: Mutex<Duration>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
    statements: Mutex<Vec<String>>,
}

impl MockStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(true),
            fail_queries: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            connect_delay: Mutex::new(Duration::ZERO),
            query_delay: Mutex::new(Duration::ZERO),
            sessions: Mutex::new(Vec::new()),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn unreachable() -> Arc<Self> {
        let store = Self::new();
        store.set_reachable(false);
        store
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }

    pub(crate) fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock() = delay;
    }

    /// Connection attempts, successful or not
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Connections successfully opened
    pub(crate) fn opened(&self) -> usize {
        self.sessions.lock().len()
    }

    pub(crate) fn session(&self, index: usize) -> Arc<MockSession> {
        Arc::clone(&self.sessions.lock()[index])
    }

    /// Sessions not closed by the client
    pub(crate) fn live_sessions(&self) -> usize {
        self.sessions.lock().iter().filter(|s| !s.is_closed()).count()
    }

    /// SQL received by `query`, oldest first
    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub(crate) fn factory(self: &Arc<Self>) -> MockFactory {
        MockFactory {
            store: Arc::clone(self),
        }
    }
}

pub(crate) struct MockFactory {
    store: Arc<MockStore>,
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        self.store.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.store.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.store.reachable.load(Ordering::SeqCst) {
            return Err(SentioError::Connection("connection refused".into()));
        }

        let session = Arc::new(MockSession {
            closed: AtomicBool::new(false),
            killed: AtomicBool::new(false),
        });
        self.store.sessions.lock().push(Arc::clone(&session));
        Ok(Box::new(MockConnection {
            session,
            store: Arc::clone(&self.store),
        }))
    }
}

pub(crate) const BASE_BACKOFF_MS: u64 = 100;

/// Descriptor with short, deterministic timeouts and no jitter
pub(crate) fn descriptor(min_size: usize, max_size: usize) -> ConnectionDescriptor {
    ConnectionDescriptor::new(Endpoint::new("mock", 5432, "sentio"))
        .with_pool(
            PoolConfig::new(min_size, max_size)
                .with_connect_timeout_ms(1_000)
                .with_acquire_timeout_ms(500)
                .with_ping_timeout_ms(200),
        )
        .with_retry(RetryPolicy::new(
            BackoffStrategy::new(BASE_BACKOFF_MS, 1_600),
            5,
        ))
}
