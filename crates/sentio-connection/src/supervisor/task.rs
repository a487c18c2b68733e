use std::sync::{Arc, Weak};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::RetryPolicy;
use crate::pool::{PoolInner, PoolStatus};

/// Start the retry supervisor for a pool.
///
/// The task only holds a weak reference, so it never keeps a dropped pool
/// alive; it also exits when `cancel` fires.
pub(crate) fn spawn(
    pool: Weak<PoolInner>,
    wake: Arc<Notify>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(pool, wake, policy, cancel))
}

async fn run(
    pool: Weak<PoolInner>,
    wake: Arc<Notify>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) {
    tracing::debug!("retry supervisor started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = wake.notified() => {}
        }
        if !retry_until_healthy(&pool, &policy, &cancel).await {
            break;
        }
    }
    tracing::debug!("retry supervisor stopped");
}

/// Retry until the pool needs nothing more. Returns false when the
/// supervisor should exit.
async fn retry_until_healthy(
    pool: &Weak<PoolInner>,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> bool {
    let mut ceiling_logged = false;
    loop {
        let Some(inner) = pool.upgrade() else {
            return false;
        };
        let Some(failures) = inner.pending_retry() else {
            return true;
        };

        let delay = policy.delay_for(failures);
        if failures > policy.max_attempts && !ceiling_logged {
            tracing::warn!(
                attempts = failures,
                delay_ms = delay.as_millis() as u64,
                "retry ceiling reached, continuing at capped interval"
            );
            ceiling_logged = true;
        }
        inner.schedule_retry(Instant::now() + delay);
        drop(inner);

        tracing::debug!(
            attempt = failures + 1,
            delay_ms = delay.as_millis() as u64,
            "scheduling pool re-initialization"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(delay) => {}
        }

        let Some(inner) = pool.upgrade() else {
            return false;
        };
        let status = inner.initialize(None).await;
        if status == PoolStatus::Ready {
            tracing::debug!("re-initialization attempt succeeded");
        }
    }
}
