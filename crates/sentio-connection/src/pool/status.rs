use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a connection pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    /// Constructed, no initialization attempted yet
    Uninitialized,
    /// An initialization pass is opening connections
    Initializing,
    /// At least `min_size` connections were opened
    Ready,
    /// The last initialization or top-up failed; the supervisor is retrying
    Degraded,
}

impl PoolStatus {
    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: PoolStatus) -> bool {
        use PoolStatus::*;
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, Ready)
                | (Initializing, Degraded)
                | (Degraded, Initializing)
                | (Ready, Degraded)
        )
    }

    pub fn is_ready(self) -> bool {
        self == PoolStatus::Ready
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolStatus::Uninitialized => "uninitialized",
            PoolStatus::Initializing => "initializing",
            PoolStatus::Ready => "ready",
            PoolStatus::Degraded => "degraded",
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
