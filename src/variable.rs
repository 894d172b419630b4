//! Reactive value cells.
//!
//! A [`Variable`] holds one value and synchronously notifies its observers
//! whenever [`set`](Variable::set) stores a value that differs from the
//! current one.  Every piece of live shell state (bar layout, edit mode,
//! window visibility, …) is a `Variable` owned by
//! [`ShellState`](crate::state::ShellState).
//!
//! # Dispatch semantics
//!
//! * The observer list is **snapshotted** at the start of each `set`
//!   dispatch.  Observers registered during the dispatch are not called for
//!   that `set`; they already received the current value on subscribe.
//! * An observer removed during the dispatch that has not been called yet is
//!   skipped.
//! * If an observer stores a new value, the outer dispatch stops.  The nested
//!   dispatch has already delivered the newer value to every observer, so
//!   the last value each observer saw is always the stored one.
//! * No borrow is held while an observer runs, so observers may freely call
//!   `get`, `set`, `subscribe` or `unsubscribe` on the same variable.
//!
//! Variables are `Rc`-based and therefore confined to the UI thread.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Observer<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: RefCell<T>,
    observers: RefCell<Vec<(u64, Observer<T>)>>,
    next_id: Cell<u64>,
    /// Bumped on every stored change.
    generation: Cell<u64>,
}

impl<T> Inner<T> {
    fn is_registered(&self, id: u64) -> bool {
        self.observers.borrow().iter().any(|(oid, _)| *oid == id)
    }

    fn remove(&self, id: u64) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }
}

/// A shared, observable value.
///
/// Cloning a `Variable` returns another handle to the **same** cell.
pub struct Variable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("value", &*self.inner.value.borrow())
            .field("observers", &self.inner.observers.borrow().len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Variable<T> {
    /// Create a variable seeded with `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(initial),
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                generation: Cell::new(0),
            }),
        }
    }

    /// Return a copy of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value for the duration of `f` without cloning it.
    ///
    /// `f` must not call [`set`](Self::set) on this variable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` and notify observers, unless it equals the current
    /// value.  Returns `true` when the value changed.
    pub fn set(&self, value: T) -> bool {
        if *self.inner.value.borrow() == value {
            return false;
        }
        *self.inner.value.borrow_mut() = value.clone();
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        let snapshot: Vec<(u64, Observer<T>)> = self.inner.observers.borrow().clone();
        for (id, observer) in snapshot {
            if self.inner.generation.get() != generation {
                break;
            }
            if self.inner.is_registered(id) {
                observer(&value);
            }
        }
        true
    }

    /// Apply `f` to a copy of the current value and [`set`](Self::set) the
    /// result.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut value = self.get();
        f(&mut value);
        self.set(value)
    }

    /// Register `observer` and immediately call it with the current value.
    ///
    /// The returned [`Subscription`] removes the observer again.  Dropping
    /// it does **not** unsubscribe.
    #[must_use = "dropping the Subscription leaves the observer registered forever"]
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let observer: Observer<T> = Rc::new(observer);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::clone(&observer)));

        let current = self.get();
        observer(&current);

        let weak: Weak<Inner<T>> = Rc::downgrade(&self.inner);
        Subscription {
            remove: RefCell::new(Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.remove(id);
                }
            }))),
        }
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Variable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Capability returned by [`Variable::subscribe`].
///
/// Holds only a weak reference to the variable, so an outstanding
/// subscription never keeps the variable alive.
pub struct Subscription {
    remove: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    /// Remove the observer.  Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not been called yet.
    pub fn is_active(&self) -> bool {
        self.remove.borrow().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
