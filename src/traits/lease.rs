//! Exclusive, self-expiring lease
//!
//! Backends hand out leases for advisory locks (precreation, token writing).
//! Dropping a lease releases it early; otherwise the backend lets it expire.

use std::fmt;

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Held advisory lock; released on drop
pub struct Lease {
    name: String,
    release: Option<Release>,
}

impl Lease {
    pub fn new(name: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            release: Some(Box::new(release)),
        }
    }

    /// Lease whose only release mechanism is expiry
    pub fn expiring(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release now instead of at end of scope
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_drop_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        {
            let _lease = Lease::new("pool", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_release_does_not_run_twice() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let lease = Lease::new("pool", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(lease.name(), "pool");
        lease.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
