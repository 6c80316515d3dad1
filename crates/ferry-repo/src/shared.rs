//! Reference-counted views over one storage backend.
//!
//! A repository and every component version opened from it hold their own
//! [`View`] of the same storage. Views are closed independently; the storage
//! itself is released exactly once, when the last open view closes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ferry_core::{CoreError, Result};
use tracing::{debug, warn};

use crate::storage::Storage;

struct State<S> {
    storage: Option<S>,
    views: usize,
}

struct Shared<S> {
    state: Mutex<State<S>>,
}

impl<S> Shared<S> {
    fn lock(&self) -> std::sync::MutexGuard<'_, State<S>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One counted handle on shared storage.
pub struct View<S: Storage> {
    shared: Arc<Shared<S>>,
    closed: AtomicBool,
}

impl<S: Storage> View<S> {
    /// Take ownership of `storage` and return its first view.
    pub fn open(storage: S) -> Self {
        View {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    storage: Some(storage),
                    views: 1,
                }),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Open another view on the same storage.
    pub fn dup(&self) -> Result<View<S>> {
        self.ensure_open()?;
        let mut state = self.shared.lock();
        if state.storage.is_none() {
            return Err(closed());
        }
        state.views += 1;
        Ok(View {
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        })
    }

    /// Close this view. The last close releases the storage.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(closed());
        }
        let mut state = self.shared.lock();
        state.views = state.views.saturating_sub(1);
        if state.views > 0 {
            return Ok(());
        }
        match state.storage.take() {
            Some(mut storage) => {
                debug!(storage = %storage.description(), "releasing storage");
                storage.release()
            }
            None => Ok(()),
        }
    }

    /// Run `f` against the storage.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> Result<R>) -> Result<R> {
        self.ensure_open()?;
        let mut state = self.shared.lock();
        match state.storage.as_mut() {
            Some(storage) => f(storage),
            None => Err(closed()),
        }
    }

    /// Number of views still open on the storage.
    pub fn open_views(&self) -> usize {
        self.shared.lock().views
    }

    /// Whether this view has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(closed())
        } else {
            Ok(())
        }
    }
}

impl<S: Storage> Drop for View<S> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.close() {
            warn!(error = %e, "closing storage view failed");
        }
    }
}

fn closed() -> CoreError {
    CoreError::Closed {
        what: "storage view".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use ferry_core::{ComponentDescriptor, Digest, NameVersion};

    struct Counting {
        releases: Arc<AtomicUsize>,
    }

    impl Storage for Counting {
        fn description(&self) -> String {
            "counting".into()
        }
        fn read_descriptor(&self, _: &NameVersion) -> Result<Option<ComponentDescriptor>> {
            Ok(None)
        }
        fn write_descriptor(&mut self, _: &ComponentDescriptor) -> Result<()> {
            Ok(())
        }
        fn list(&self) -> Result<Vec<NameVersion>> {
            Ok(Vec::new())
        }
        fn read_blob(&self, _: &Digest) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
        fn write_blob(&mut self, _: &Digest, _: &[u8]) -> Result<()> {
            Ok(())
        }
        fn release(&mut self) -> Result<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting() -> (View<Counting>, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        let view = View::open(Counting {
            releases: Arc::clone(&releases),
        });
        (view, releases)
    }

    #[test]
    fn released_once_when_last_view_closes() {
        let (first, releases) = counting();
        let second = first.dup().unwrap();
        let third = second.dup().unwrap();
        assert_eq!(first.open_views(), 3);

        first.close().unwrap();
        third.close().unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        assert!(second.with(|_| Ok(())).is_ok());

        second.close().unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_close_fails_without_second_release() {
        let (view, releases) = counting();
        view.close().unwrap();
        let err = view.close().unwrap_err();
        assert!(err.to_string().contains("already closed"));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_view_rejects_use() {
        let (first, _) = counting();
        let second = first.dup().unwrap();
        second.close().unwrap();
        assert!(second.with(|_| Ok(())).is_err());
        assert!(second.dup().is_err());
        assert!(first.with(|_| Ok(())).is_ok());
    }

    #[test]
    fn dropped_views_release() {
        let (first, releases) = counting();
        {
            let _second = first.dup().unwrap();
        }
        assert_eq!(first.open_views(), 1);
        drop(first);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
