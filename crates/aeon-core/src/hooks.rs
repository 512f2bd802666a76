//! Synchronous notification hooks.
//!
//! Listeners are invoked in subscription order, every time an event is
//! emitted. They observe events only and cannot mutate the emitter.

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle returned by [`HookBus::subscribe`], used to unsubscribe.
    pub struct HookId;
}

/// A passive listener: receives a reference to each event.
pub type Listener<E> = Box<dyn FnMut(&E)>;

/// A predicate deciding whether a listener sees an event.
pub type HookFilter<E> = Box<dyn Fn(&E) -> bool>;

struct HookEntry<E> {
    listener: Listener<E>,
    filter: Option<HookFilter<E>>,
}

impl<E> std::fmt::Debug for HookEntry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookEntry")
            .field("listener", &"<fn>")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

/// Ordered set of listeners for one event type.
pub struct HookBus<E> {
    hooks: SlotMap<HookId, HookEntry<E>>,
    order: Vec<HookId>,
    delivered: u64,
}

impl<E> std::fmt::Debug for HookBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookBus")
            .field("listeners", &self.order.len())
            .field("delivered", &self.delivered)
            .finish()
    }
}

impl<E> Default for HookBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> HookBus<E> {
    pub fn new() -> Self {
        Self {
            hooks: SlotMap::with_key(),
            order: Vec::new(),
            delivered: 0,
        }
    }

    /// Register a listener that sees every event.
    pub fn subscribe(&mut self, listener: Listener<E>) -> HookId {
        self.insert(HookEntry {
            listener,
            filter: None,
        })
    }

    /// Register a listener that only sees events passing `filter`.
    pub fn subscribe_filtered(&mut self, filter: HookFilter<E>, listener: Listener<E>) -> HookId {
        self.insert(HookEntry {
            listener,
            filter: Some(filter),
        })
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: HookId) -> bool {
        if self.hooks.remove(id).is_none() {
            return false;
        }
        self.order.retain(|&h| h != id);
        true
    }

    /// Deliver `event` to each interested listener. Returns how many ran.
    pub fn emit(&mut self, event: &E) -> usize {
        let mut invoked = 0;
        for id in &self.order {
            let Some(entry) = self.hooks.get_mut(*id) else {
                continue;
            };
            if let Some(filter) = &entry.filter {
                if !filter(event) {
                    continue;
                }
            }
            (entry.listener)(event);
            invoked += 1;
        }
        self.delivered += invoked as u64;
        invoked
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total listener invocations since creation.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    fn insert(&mut self, entry: HookEntry<E>) -> HookId {
        let id = self.hooks.insert(entry);
        self.order.push(id);
        id
    }
}
