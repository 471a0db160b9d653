//! Cooperative cancellation for engine operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EngineError;

/// Cancellation signal accepted by every public engine operation.
///
/// Operations check the token immediately before commit: a cancelled token
/// aborts the transaction with no partial effect. Cancellation between
/// commit and event emission may skip the emission, which is acceptable for
/// this non-critical notification (at-most-once, possibly-zero).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Clones observe the signal.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`EngineError::Cancelled`] if the signal has fired.
    pub fn ensure_active(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_active_and_clones_share_the_signal() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.ensure_active().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.ensure_active(),
            Err(EngineError::Cancelled)
        ));
    }
}
