use std::fmt;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Ordered list of listeners for one event type.
pub struct EventBus<E> {
    next_key: u64,
    listeners: Vec<(ListenerKey, Listener<E>)>,
}

impl<E> EventBus<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_key: 0,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl Fn(&E) + Send + Sync + 'static) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        self.listeners.push((key, Box::new(listener)));
        key
    }

    /// Returns `false` if `key` was not registered.
    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(k, _)| *k != key);
        self.listeners.len() != before
    }

    /// Calls every listener in subscription order.
    pub fn emit(&self, event: &E) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
