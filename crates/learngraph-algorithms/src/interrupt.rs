//! Cooperative cancellation for long-running traversals

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Returned when a traversal was cancelled or ran past its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupted {
    pub reason: &'static str,
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "traversal interrupted: {}", self.reason)
    }
}

impl std::error::Error for Interrupted {}

/// Cancellation flag plus optional deadline, checked on every frontier pop.
///
/// Clones share the flag, so a caller can keep one clone and call
/// [`Interrupt::cancel`] while another thread is traversing.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Interrupt {
    /// An interrupt that never fires unless cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// An interrupt that fires once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails if the traversal should stop.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted { reason: "cancelled" });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Interrupted { reason: "deadline exceeded" });
            }
        }
        Ok(())
    }
}
