//! Observable state cells.
//!
//! A [`Writable`] holds a single value and notifies its observers synchronously,
//! in registration order, every time the value is set. A new observer is called
//! once with the current value as soon as it subscribes, so it never has to
//! read the cell separately to initialize itself.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

const LOG_TARGET: &str = "lyricsync::store";

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Cell<T> {
    value: T,
    observers: Vec<(u64, Observer<T>)>,
    next_id: u64,
    /// Values set while a notification round is running, delivered in order after it
    pending: VecDeque<T>,
    notifying: bool,
}

/// Resets the notifying state if an observer unwinds mid-round
struct RoundGuard<'a, T> {
    cell: &'a Mutex<Cell<T>>,
    armed: bool,
}

impl<T> Drop for RoundGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            let mut cell = self.cell.lock();
            cell.notifying = false;
            cell.pending.clear();
        }
    }
}

/// Read access and observer registration shared by [`Writable`] and [`Readable`].
pub trait Observable<T> {
    /// Clone of the current value
    fn get(&self) -> T;

    /// Register an observer.
    ///
    /// The observer is called immediately with the current value, then once per
    /// subsequent change. It stays registered until the returned [`Subscription`]
    /// is dropped or unsubscribed.
    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static;
}

/// A shared, observable value.
///
/// Cloning a `Writable` yields another handle to the same cell.
pub struct Writable<T> {
    cell: Arc<Mutex<Cell<T>>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.cell.lock();
        f.debug_struct("Writable")
            .field("value", &cell.value)
            .field("observers", &cell.observers.len())
            .finish()
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Writable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + 'static> Writable<T> {
    /// Create a cell holding `value`
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Cell {
                value,
                observers: Vec::new(),
                next_id: 0,
                pending: VecDeque::new(),
                notifying: false,
            })),
        }
    }

    /// Replace the value and notify every observer with it.
    ///
    /// There is no equality check: setting the same value twice notifies twice.
    /// Observers run after the cell is unlocked, so they may read or set any cell,
    /// including this one. A set made on this cell while its observers are being
    /// notified stores the value at once but is delivered only after the current
    /// round finishes, so every observer sees values in the order they were set.
    pub fn set(&self, value: T) {
        let first = {
            let mut cell = self.cell.lock();
            cell.value = value;
            let current = cell.value.clone();
            if cell.notifying {
                cell.pending.push_back(current);
                return;
            }
            cell.notifying = true;
            current
        };

        let mut guard = RoundGuard {
            cell: &self.cell,
            armed: true,
        };
        let mut next = Some(first);
        while let Some(value) = next {
            let observers: Vec<Observer<T>> = {
                let cell = self.cell.lock();
                cell.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
            };

            trace!(target: LOG_TARGET, "Notifying {} observer(s)", observers.len());
            for observer in &observers {
                observer(&value);
            }

            let mut cell = self.cell.lock();
            next = cell.pending.pop_front();
            if next.is_none() {
                cell.notifying = false;
            }
        }
        guard.armed = false;
    }

    /// Set the value to `f(current)`.
    ///
    /// `f` runs on a clone of the current value with the cell unlocked.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.cell.lock().value.clone();
        self.set(f(&current));
    }

    /// Borrow the current value without cloning it.
    ///
    /// The cell is locked while `f` runs; `f` must not access this cell.
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.cell.lock().value)
    }

    /// Number of registered observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.cell.lock().observers.len()
    }

    /// A read-only handle to this cell
    #[must_use]
    pub fn readable(&self) -> Readable<T> {
        Readable {
            inner: self.clone(),
        }
    }

    fn remove_observer(cell: &Weak<Mutex<Cell<T>>>, id: u64) {
        if let Some(cell) = cell.upgrade() {
            cell.lock().observers.retain(|(observer_id, _)| *observer_id != id);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> for Writable<T> {
    fn get(&self) -> T {
        self.cell.lock().value.clone()
    }

    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer: Observer<T> = Arc::new(observer);

        let (id, current) = {
            let mut cell = self.cell.lock();
            let id = cell.next_id;
            cell.next_id += 1;
            cell.observers.push((id, Arc::clone(&observer)));
            (id, cell.value.clone())
        };

        observer(&current);

        let cell = Arc::downgrade(&self.cell);
        Subscription::new(move || Self::remove_observer(&cell, id))
    }
}

/// A read-only view of a [`Writable`].
///
/// Handed out by bindings so that only the binding itself can write the cell.
pub struct Readable<T> {
    inner: Writable<T>,
}

impl<T> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Readable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Readable").field(&self.inner).finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Readable<T> {
    /// Borrow the current value without cloning it.
    ///
    /// The cell is locked while `f` runs; `f` must not access this cell.
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.with(f)
    }

    /// Number of registered observers
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observer_count()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> for Readable<T> {
    fn get(&self) -> T {
        self.inner.get()
    }

    fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.subscribe(observer)
    }
}

/// Handle to a registered observer. Dropping it deregisters the observer.
#[must_use = "dropping a Subscription immediately deregisters its observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Deregister the observer now
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keep the observer registered for as long as the cell lives
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}
