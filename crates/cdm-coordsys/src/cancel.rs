//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CoordSysError, CoordSysResult};

/// Polled between passes and between variables within a pass.
pub trait CancelTask: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// A task that is never cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelTask for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl CancelTask for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<F> CancelTask for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Return `Err(Cancelled)` if the task has been cancelled.
pub(crate) fn check(cancel: &dyn CancelTask) -> CoordSysResult<()> {
    if cancel.is_cancelled() {
        Err(CoordSysError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_never_cancel() {
        assert!(check(&NeverCancel).is_ok());
    }

    #[test]
    fn test_atomic_flag() {
        let flag = AtomicBool::new(false);
        assert!(check(&flag).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(check(&flag), Err(CoordSysError::Cancelled)));
    }

    #[test]
    fn test_closure_counts_polls() {
        let polls = AtomicUsize::new(0);
        let cancel = || polls.fetch_add(1, Ordering::Relaxed) >= 2;
        assert!(check(&cancel).is_ok());
        assert!(check(&cancel).is_ok());
        assert!(check(&cancel).is_err());
    }
}
