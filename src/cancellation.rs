//! A checkpoint primitive for long-running operations (C13), centralising
//! the scattered cancellation-flag checks the teacher's consolidation and
//! dream-replay phases each reimplemented, per SPEC_FULL.md §9.

use crate::atoms::error::{GraphError, GraphResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Polled at batch/phase/flush boundaries; raises `OperationCancelled` once
/// the token has been tripped.
pub fn check_cancellation(token: &CancellationToken, op_name: &str) -> GraphResult<()> {
    if token.is_cancelled() {
        return Err(GraphError::OperationCancelled {
            op_name: op_name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_trips_check() {
        let token = CancellationToken::new();
        assert!(check_cancellation(&token, "flush").is_ok());
        token.cancel();
        assert!(matches!(
            check_cancellation(&token, "flush"),
            Err(GraphError::OperationCancelled { .. })
        ));
    }
}
