//! Ordered, synchronous observer lists.

use std::fmt;

/// Stable identity of a registered observer, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

/// An ordered list of callbacks notified synchronously, in registration order.
///
/// The list cannot change while it is being notified: callbacks only receive
/// a shared reference to the notified value.
pub struct Observable<T: ?Sized> {
    next_handle: u64,
    observers: Vec<(ObserverHandle, Box<dyn FnMut(&T)>)>,
}

impl<T: ?Sized> Observable<T> {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            observers: Vec::new(),
        }
    }

    /// Registers a callback and returns the handle that removes it.
    pub fn add(&mut self, callback: impl FnMut(&T) + 'static) -> ObserverHandle {
        let handle = ObserverHandle(self.next_handle);
        self.next_handle += 1;
        self.observers.push((handle, Box::new(callback)));
        handle
    }

    /// Removes a callback. Returns false if the handle was not registered.
    pub fn remove(&mut self, handle: ObserverHandle) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(h, _)| *h != handle);
        self.observers.len() != before
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Calls every callback with `value`, in registration order.
    pub fn notify(&mut self, value: &T) {
        for (_, callback) in self.observers.iter_mut() {
            callback(value);
        }
    }
}

impl<T: ?Sized> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.observers.len())
            .finish()
    }
}
