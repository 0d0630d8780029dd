//! Cooperative cancellation via a shared atomic flag
//!
//! Per-chain rather than process-global so independent extractions do not
//! interfere; callers wire signal handlers to a clone of the token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation handle. Once cancelled, the stream stops issuing
/// HTTP calls and ends with [`crate::ExtractError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
