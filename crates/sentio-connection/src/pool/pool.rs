//! Connection pool implementation

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use sentio_core::{Connection, ConnectionFactory};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::PoolConfig;
use super::guard::{Disposition, PooledConnection, ReleaseOutcome};
use super::stats::PoolStats;
use super::status::PoolStatus;
use crate::descriptor::ConnectionDescriptor;
use crate::error::{PoolError, PoolResult};
use crate::health::{PingError, ping_with_timeout};
use crate::supervisor::{self, RetryPolicy, RetryState};

/// Pool-local identity of a physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct IdleConnection {
    id: ConnectionId,
    connection: Box<dyn Connection>,
    created_at: Instant,
}

/// Everything mutable about the pool, guarded by one mutex
struct PoolState {
    status: PoolStatus,
    idle: VecDeque<IdleConnection>,
    checked_out: HashSet<ConnectionId>,
    /// Slots reserved for handshakes in progress
    opening: usize,
    waiting: usize,
    last_error: Option<String>,
    retry: RetryState,
    /// Completed initialization passes
    generation: u64,
    shut_down: bool,
    next_id: u64,
}

impl PoolState {
    fn new() -> Self {
        Self {
            status: PoolStatus::Uninitialized,
            idle: VecDeque::new(),
            checked_out: HashSet::new(),
            opening: 0,
            waiting: 0,
            last_error: None,
            retry: RetryState::default(),
            generation: 0,
            shut_down: false,
            next_id: 0,
        }
    }

    /// Idle + checked out + opening; never exceeds `max_size`
    fn total(&self) -> usize {
        self.idle.len() + self.checked_out.len() + self.opening
    }

    fn transition(&mut self, next: PoolStatus) {
        if self.status == next {
            return;
        }
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal pool status transition {} -> {}",
            self.status,
            next
        );
        tracing::info!(from = %self.status, to = %next, "connection pool status changed");
        self.status = next;
    }

    fn allocate_id(&mut self) -> ConnectionId {
        self.next_id += 1;
        ConnectionId(self.next_id)
    }
}

/// Capacity reserved for handshakes in progress
///
/// Slots not consumed by a commit are handed back on drop, so a cancelled
/// or timed-out handshake never leaks capacity.
struct OpenSlots {
    pool: Arc<PoolInner>,
    slots: usize,
}

impl OpenSlots {
    fn take_one(&mut self, state: &mut PoolState) {
        debug_assert!(self.slots > 0);
        self.slots -= 1;
        state.opening -= 1;
    }

    fn take_all(&mut self, state: &mut PoolState) {
        state.opening -= self.slots;
        self.slots = 0;
    }
}

impl Drop for OpenSlots {
    fn drop(&mut self) {
        if self.slots == 0 {
            return;
        }
        {
            let mut state = self.pool.state.lock();
            state.opening -= self.slots;
        }
        self.slots = 0;
        self.pool.available.notify_one();
    }
}

enum Reservation {
    Idle(IdleConnection),
    Open(OpenSlots),
    Full,
    ShutDown,
}

/// Marks an initialization pass in flight.
///
/// A pass dropped before completing (its caller was cancelled mid-handshake)
/// leaves the pool `Degraded` and hands recovery to the supervisor.
struct InitPass<'a> {
    pool: &'a PoolInner,
    completed: bool,
}

impl InitPass<'_> {
    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for InitPass<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        {
            let mut state = self.pool.state.lock();
            if state.shut_down {
                return;
            }
            if state.status == PoolStatus::Initializing {
                state.transition(PoolStatus::Degraded);
            }
            state.last_error = Some("initialization pass cancelled".to_string());
            state.retry.record_failure();
        }
        tracing::warn!("initialization pass cancelled, retrying in background");
        self.pool.available.notify_waiters();
        self.pool.supervisor_wake.notify_one();
    }
}

/// Counts a caller in `waiting` for as long as it is alive
struct WaitingGuard<'a> {
    pool: &'a PoolInner,
}

impl<'a> WaitingGuard<'a> {
    fn register(pool: &'a PoolInner) -> Self {
        pool.state.lock().waiting += 1;
        Self { pool }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.pool.state.lock().waiting -= 1;
    }
}

pub(crate) struct PoolInner {
    config: PoolConfig,
    retry_policy: RetryPolicy,
    factory: Arc<dyn ConnectionFactory>,
    state: Mutex<PoolState>,
    /// Signalled when a connection or a slot frees up
    available: Notify,
    /// Serializes initialization passes from callers and the supervisor
    init_gate: tokio::sync::Mutex<()>,
    supervisor_wake: Arc<Notify>,
    supervisor_started: AtomicBool,
    cancel: CancellationToken,
}

impl PoolInner {
    async fn open_connection(&self) -> PoolResult<Box<dyn Connection>> {
        let timeout = self.config.connect_timeout();
        match tokio::time::timeout(timeout, self.factory.connect()).await {
            Ok(Ok(connection)) => Ok(connection),
            Ok(Err(e)) => Err(PoolError::ConnectFailed(e.to_string())),
            Err(_) => Err(PoolError::ConnectFailed(format!(
                "connection attempt timed out after {timeout:?}"
            ))),
        }
    }

    fn reserve(self: &Arc<Self>) -> Reservation {
        let mut state = self.state.lock();
        if state.shut_down {
            return Reservation::ShutDown;
        }
        if let Some(idle) = state.idle.pop_front() {
            state.checked_out.insert(idle.id);
            return Reservation::Idle(idle);
        }
        if state.total() < self.config.max_size() {
            state.opening += 1;
            return Reservation::Open(OpenSlots {
                pool: Arc::clone(self),
                slots: 1,
            });
        }
        Reservation::Full
    }

    fn commit_checkout(
        self: &Arc<Self>,
        slots: &mut OpenSlots,
        connection: Box<dyn Connection>,
    ) -> PoolResult<PooledConnection> {
        let id = {
            let mut state = self.state.lock();
            slots.take_one(&mut state);
            if state.shut_down {
                None
            } else {
                let id = state.allocate_id();
                state.checked_out.insert(id);
                Some(id)
            }
        };

        match id {
            Some(id) => {
                tracing::debug!(connection_id = %id, "opened connection on demand");
                Ok(PooledConnection::new(
                    Arc::clone(self),
                    id,
                    connection,
                    Instant::now(),
                ))
            }
            None => {
                self.close_in_background(connection);
                Err(PoolError::ShutDown)
            }
        }
    }

    /// Check out a connection without waiting.
    ///
    /// Returns `None` when the pool is at `max_size` with nothing idle.
    async fn checkout_now(self: &Arc<Self>) -> Option<PoolResult<PooledConnection>> {
        loop {
            match self.reserve() {
                Reservation::ShutDown => return Some(Err(PoolError::ShutDown)),
                Reservation::Full => return None,
                Reservation::Idle(idle) => {
                    if idle.connection.is_usable() {
                        tracing::debug!(connection_id = %idle.id, "reusing idle connection");
                        return Some(Ok(PooledConnection::new(
                            Arc::clone(self),
                            idle.id,
                            idle.connection,
                            idle.created_at,
                        )));
                    }
                    tracing::warn!(connection_id = %idle.id, "idle connection failed validation");
                    self.return_connection(
                        idle.id,
                        idle.connection,
                        idle.created_at,
                        Disposition::Discard,
                    );
                }
                Reservation::Open(mut slots) => {
                    let result = match self.open_connection().await {
                        Ok(connection) => self.commit_checkout(&mut slots, connection),
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to open connection on demand");
                            self.state.lock().last_error = Some(err.to_string());
                            Err(PoolError::PoolUnavailable(err.to_string()))
                        }
                    };
                    return Some(result);
                }
            }
        }
    }

    /// Run one initialization pass.
    ///
    /// With `observed_generation` set, the pass is skipped if another pass
    /// completed since the caller looked at the pool.
    pub(crate) async fn initialize(self: &Arc<Self>, observed_generation: Option<u64>) -> PoolStatus {
        self.ensure_supervisor();
        let _gate = self.init_gate.lock().await;

        let mut slots = {
            let mut state = self.state.lock();
            if state.shut_down {
                return state.status;
            }
            if let Some(seen) = observed_generation {
                if state.generation != seen {
                    return state.status;
                }
            }

            let missing = self.config.min_size().saturating_sub(state.total());
            let headroom = self.config.max_size().saturating_sub(state.total());
            let needed = missing.min(headroom);
            if needed == 0 && state.status.is_ready() {
                return state.status;
            }
            if !state.status.is_ready() {
                state.transition(PoolStatus::Initializing);
            }
            state.opening += needed;
            OpenSlots {
                pool: Arc::clone(self),
                slots: needed,
            }
        };

        let pass = InitPass {
            pool: self,
            completed: false,
        };

        let needed = slots.slots;
        tracing::info!(
            connections = needed,
            factory = self.factory.name(),
            "opening pool connections"
        );

        let results = join_all((0..needed).map(|_| self.open_connection())).await;

        let mut opened = Vec::with_capacity(needed);
        let mut failure: Option<PoolError> = None;
        for result in results {
            match result {
                Ok(connection) => opened.push(connection),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        let opened_count = opened.len();

        let (status, leftovers) = {
            let mut state = self.state.lock();
            slots.take_all(&mut state);
            state.generation += 1;

            let mut leftovers = Vec::new();
            let now = Instant::now();
            for connection in opened {
                if state.shut_down {
                    leftovers.push(connection);
                } else {
                    let id = state.allocate_id();
                    state.idle.push_back(IdleConnection {
                        id,
                        connection,
                        created_at: now,
                    });
                }
            }

            match &failure {
                None => {
                    if state.status == PoolStatus::Initializing {
                        state.transition(PoolStatus::Ready);
                    }
                    state.retry.reset();
                    state.last_error = None;
                }
                Some(err) => {
                    state.last_error = Some(err.to_string());
                    state.retry.record_failure();
                    state.transition(PoolStatus::Degraded);
                }
            }
            (state.status, leftovers)
        };
        pass.complete();

        self.available.notify_waiters();
        for connection in leftovers {
            let _ = connection.close().await;
        }

        match failure {
            None => tracing::info!(opened = opened_count, "connection pool is ready"),
            Some(err) => {
                tracing::warn!(
                    error = %err,
                    opened = opened_count,
                    failed = needed - opened_count,
                    "connection pool initialization failed, retrying in background"
                );
                self.supervisor_wake.notify_one();
            }
        }
        status
    }

    fn ensure_supervisor(self: &Arc<Self>) {
        if self.supervisor_started.swap(true, Ordering::SeqCst) || self.cancel.is_cancelled() {
            return;
        }
        supervisor::spawn(
            Arc::downgrade(self),
            Arc::clone(&self.supervisor_wake),
            self.retry_policy.clone(),
            self.cancel.clone(),
        );
    }

    /// Consecutive failures if the pool still needs (re)initialization
    pub(crate) fn pending_retry(&self) -> Option<u32> {
        let state = self.state.lock();
        if state.shut_down {
            return None;
        }
        let below_min = state.total() < self.config.min_size();
        if state.status.is_ready() && !below_min {
            return None;
        }
        Some(state.retry.attempts)
    }

    pub(crate) fn schedule_retry(&self, at: Instant) {
        self.state.lock().retry.next_retry_at = Some(at);
    }

    /// Take a connection back from a guard. Never blocks.
    pub(crate) fn return_connection(
        &self,
        id: ConnectionId,
        connection: Box<dyn Connection>,
        created_at: Instant,
        disposition: Disposition,
    ) -> ReleaseOutcome {
        let reusable = disposition == Disposition::Recycle && connection.is_usable();

        let mut state = self.state.lock();
        if !state.checked_out.remove(&id) {
            drop(state);
            tracing::warn!(connection_id = %id, "ignoring release of a connection that is not checked out");
            self.close_in_background(connection);
            return ReleaseOutcome::Ignored;
        }

        if state.shut_down {
            drop(state);
            tracing::debug!(connection_id = %id, "closing connection released after shutdown");
            self.close_in_background(connection);
            return ReleaseOutcome::Closed;
        }

        if reusable {
            state.idle.push_back(IdleConnection {
                id,
                connection,
                created_at,
            });
            drop(state);
            tracing::debug!(connection_id = %id, "connection returned to pool");
            self.available.notify_one();
            return ReleaseOutcome::Recycled;
        }

        let below_min = state.total() < self.config.min_size();
        drop(state);
        tracing::warn!(connection_id = %id, below_min, "discarding unusable connection");
        self.close_in_background(connection);
        self.available.notify_one();
        if below_min {
            self.supervisor_wake.notify_one();
        }
        ReleaseOutcome::Discarded
    }

    fn close_in_background(&self, connection: Box<dyn Connection>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = connection.close().await {
                        tracing::debug!(error = %e, "error closing discarded connection");
                    }
                });
            }
            Err(_) => drop(connection),
        }
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A bounded pool of connections to the backing store
///
/// Cheap to clone; every clone shares the same connections. The retry
/// supervisor starts with the first initialization pass and stops on
/// `shutdown` or when the last handle is dropped.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create a pool without opening any connection.
    ///
    /// Fails only if the descriptor is invalid.
    pub fn new<F: ConnectionFactory>(
        descriptor: &ConnectionDescriptor,
        factory: F,
    ) -> PoolResult<Self> {
        descriptor.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                config: descriptor.pool.clone(),
                retry_policy: descriptor.retry.clone(),
                factory: Arc::new(factory),
                state: Mutex::new(PoolState::new()),
                available: Notify::new(),
                init_gate: tokio::sync::Mutex::new(()),
                supervisor_wake: Arc::new(Notify::new()),
                supervisor_started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Create a pool and run the first initialization pass.
    ///
    /// An unreachable store does not fail this call; the pool comes back
    /// `Degraded` and keeps retrying in the background.
    pub async fn connect<F: ConnectionFactory>(
        descriptor: &ConnectionDescriptor,
        factory: F,
    ) -> PoolResult<Self> {
        let pool = Self::new(descriptor, factory)?;
        pool.initialize().await;
        Ok(pool)
    }

    /// Open `min_size` connections and report the resulting status.
    ///
    /// Never fails: errors are recorded in the pool and retried by the
    /// supervisor.
    pub async fn initialize(&self) -> PoolStatus {
        self.inner.initialize(None).await
    }

    /// Check out a connection.
    ///
    /// A pool that is not `Ready` first runs one initialization pass. When
    /// every connection is checked out the call waits up to the acquire
    /// timeout.
    pub async fn acquire(&self) -> PoolResult<PooledConnection> {
        let inner = &self.inner;

        let (status, generation) = {
            let state = inner.state.lock();
            if state.shut_down {
                return Err(PoolError::ShutDown);
            }
            (state.status, state.generation)
        };

        if !status.is_ready() {
            inner.initialize(Some(generation)).await;
            let state = inner.state.lock();
            if state.shut_down {
                return Err(PoolError::ShutDown);
            }
            if !state.status.is_ready() && state.idle.is_empty() {
                let reason = state
                    .last_error
                    .clone()
                    .unwrap_or_else(|| format!("pool is {}", state.status));
                return Err(PoolError::PoolUnavailable(reason));
            }
        }

        let timeout = inner.config.acquire_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            let notified = inner.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = inner.checkout_now().await {
                return result;
            }

            let _waiting = WaitingGuard::register(inner);
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                tracing::warn!(waited = ?timeout, "timed out waiting for a pooled connection");
                return Err(PoolError::PoolExhausted { waited: timeout });
            }
        }
    }

    /// Return a connection explicitly.
    ///
    /// Dropping the guard does the same; this variant reports a connection
    /// that had to be discarded as `PoolError::ConnectionInvalid`.
    pub fn release(&self, connection: PooledConnection) -> PoolResult<()> {
        match connection.release() {
            ReleaseOutcome::Discarded => Err(PoolError::ConnectionInvalid),
            ReleaseOutcome::Recycled | ReleaseOutcome::Closed | ReleaseOutcome::Ignored => Ok(()),
        }
    }

    /// Round trip on one pooled connection.
    ///
    /// Returns `Ok(None)` when every connection is checked out and no slot
    /// is free: a saturated `Ready` pool is serving traffic, so it is not
    /// disturbed. A failed probe discards the connection it used.
    pub async fn ping(&self) -> Result<Option<Duration>, PingError> {
        let status = {
            let state = self.inner.state.lock();
            if state.shut_down {
                return Err(PingError::ShutDown);
            }
            state.status
        };
        if !status.is_ready() {
            return Err(PingError::NotReady(status));
        }

        let mut connection = match self.inner.checkout_now().await {
            None => {
                tracing::debug!("pool saturated, skipping readiness round trip");
                return Ok(None);
            }
            Some(Err(PoolError::ShutDown)) => return Err(PingError::ShutDown),
            Some(Err(e)) => return Err(PingError::Unavailable(e.to_string())),
            Some(Ok(connection)) => connection,
        };

        match ping_with_timeout(&*connection, self.inner.config.ping_timeout()).await {
            Ok(latency) => Ok(Some(latency)),
            Err(err) => {
                tracing::warn!(connection_id = %connection.id(), error = %err, "readiness ping failed");
                connection.mark_broken();
                Err(err)
            }
        }
    }

    /// `Ready` and a trivial round trip succeeds within the ping timeout
    pub async fn is_ready(&self) -> bool {
        self.ping().await.is_ok()
    }

    /// Stop accepting acquisitions, stop the supervisor and close idle
    /// connections. Checked-out connections are closed as they come back.
    pub async fn shutdown(&self) {
        let drained: Vec<IdleConnection> = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.retry.next_retry_at = None;
            state.idle.drain(..).collect()
        };

        self.inner.cancel.cancel();
        self.inner.available.notify_waiters();

        let closed = drained.len();
        for idle in drained {
            if let Err(e) = idle.connection.close().await {
                tracing::warn!(connection_id = %idle.id, error = %e, "error closing connection during shutdown");
            }
        }

        let checked_out = self.inner.state.lock().checked_out.len();
        tracing::info!(closed, checked_out, "connection pool shut down");
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        let next_retry_in_ms = state
            .retry
            .next_retry_at
            .map(|at| at.saturating_duration_since(Instant::now()).as_millis() as u64);
        PoolStats::new(
            state.status,
            state.idle.len(),
            state.checked_out.len(),
            state.opening,
            state.waiting,
            self.inner.config.min_size(),
            self.inner.config.max_size(),
            state.retry.attempts,
            next_retry_in_ms,
            state.last_error.clone(),
            state.shut_down,
        )
    }

    pub fn status(&self) -> PoolStatus {
        self.inner.state.lock().status
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().shut_down
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    /// Name of the connection factory backing this pool
    pub fn factory_name(&self) -> &str {
        self.inner.factory.name()
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<PoolInner> {
        &self.inner
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConnectionPool")
            .field("factory", &self.inner.factory.name())
            .field("status", &state.status)
            .field("idle", &state.idle.len())
            .field("checked_out", &state.checked_out.len())
            .field("opening", &state.opening)
            .finish()
    }
}
