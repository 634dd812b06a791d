//! "Directory changed" notifications.

use std::fmt;
use std::path::PathBuf;

/// Emitted whenever the tree's current directory changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryChangeEvent {
    /// Directory that was current before the change.
    pub previous: Option<PathBuf>,
    /// Directory that is current now.
    pub current: Option<PathBuf>,
}

/// Handle returned by `Listeners::add`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registry of callbacks for events of type `E`, notified synchronously in
/// registration order.
pub struct Listeners<E> {
    next_id: u64,
    listeners: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
}

/// Listeners for directory changes.
pub type ChangeListeners = Listeners<DirectoryChangeEvent>;

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns false if the id was unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn notify(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
