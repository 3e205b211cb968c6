//! Reversible observer subscriptions.

use tracing::debug;

/// An owned cancellation handle for one observer registration.
///
/// The registration is released exactly once: on the first `release()`
/// call, or on drop if `release()` was never called. Releasing again is a
/// no-op.
pub struct ObserverHandle {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl ObserverHandle {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// A handle with nothing to release, for sources that do not support
    /// observation.
    pub fn noop() -> Self {
        Self { unsubscribe: None }
    }

    /// Release the registration. Idempotent.
    pub fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    pub fn is_released(&self) -> bool {
        self.unsubscribe.is_none()
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        if self.unsubscribe.is_some() {
            debug!("Observer handle dropped without explicit release");
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_release_fires_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut handle = ObserverHandle::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        handle.release();
        handle.release();
        drop(handle);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        {
            let _handle = ObserverHandle::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_noop_handle() {
        let mut handle = ObserverHandle::noop();
        assert!(handle.is_released());
        handle.release();
    }
}
