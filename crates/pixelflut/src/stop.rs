//! Broadcast cancellation shared by every worker of an operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Level-triggered stop flag.
///
/// Clones observe the same flag. Once [`stop`](Self::stop) is called the signal stays
/// raised for good; calling it again has no further effect.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Returns `true` if this call was the one that raised it.
    pub fn stop(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_shared_and_sticky() {
        let stop = StopSignal::new();
        let observer = stop.clone();
        assert!(!observer.is_stopped());

        assert!(stop.stop());
        assert!(!stop.stop());
        assert!(observer.is_stopped());
        assert!(stop.is_stopped());
    }
}
