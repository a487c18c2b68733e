//! Background re-initialization with exponential backoff
//!
//! The supervisor is a task owned by the pool. It sleeps until the pool
//! reports a failed initialization or lost capacity, then retries on the
//! `RetryPolicy` schedule until the pool is `Ready` and back at `min_size`.
//!
//! ```ignore
//! use sentio_connection::{BackoffStrategy, RetryPolicy};
//!
//! let retry = RetryPolicy::new(BackoffStrategy::new(250, 30_000).with_jitter(true), 10);
//! let descriptor = ConnectionDescriptor::new(endpoint).with_retry(retry);
//! ```

mod backoff;
mod policy;
mod task;

#[cfg(test)]
mod tests;

pub use backoff::BackoffStrategy;
pub use policy::RetryPolicy;
pub(crate) use policy::RetryState;
pub(crate) use task::spawn;
