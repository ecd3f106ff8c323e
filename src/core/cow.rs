//! Copy-on-write publication cell
//!
//! A [`CowCell`] holds an immutable, shared snapshot of a value. Writers
//! serialize on a dedicated update lock, clone the current snapshot, apply
//! their change to the private copy and then publish the finished copy with
//! a single atomic pointer swap. Readers never touch the update lock and
//! never wait on a writer; they observe either the previous or the next
//! snapshot in full.
//!
//! The published pointer is an [`ArcSwap`], so loads are lock-free. The old
//! snapshot is freed by whichever side drops the last reference.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct CowCell<T> {
    /// Serializes writers against each other; readers never take it.
    update: Mutex<()>,
    current: ArcSwap<T>,
}

impl<T> CowCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            update: Mutex::new(()),
            current: ArcSwap::from_pointee(value),
        }
    }

    /// Current published snapshot
    #[inline]
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Run `f` against the current snapshot without cloning the `Arc`
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.current.load())
    }

    /// Replace the snapshot wholesale
    pub fn store(&self, value: T) {
        let _writer = self.update.lock();
        self.current.store(Arc::new(value));
    }
}

impl<T: Clone> CowCell<T> {
    /// Copy the current snapshot, apply `f` to the copy, publish it.
    ///
    /// Concurrent updates are applied one after another; none is lost.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _writer = self.update.lock();
        let mut next = T::clone(&self.load());
        let result = f(&mut next);
        self.current.store(Arc::new(next));
        result
    }
}

impl<T: Default> Default for CowCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
