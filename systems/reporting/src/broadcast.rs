//! Owned observer list that tolerates failing listeners.

use std::fmt;

use tracing::{debug, error};

/// Receiver of broadcast payloads.
pub trait Listener<T> {
    /// Handles a payload. Errors are logged by the broadcaster and do not
    /// stop delivery to other listeners.
    ///
    /// Panics are not caught: they unwind through [`Broadcaster::broadcast`]
    /// and listeners subscribed later miss the payload.
    fn notify(&mut self, payload: &T) -> anyhow::Result<()>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T, F> Listener<T> for F
where
    F: FnMut(&T) -> anyhow::Result<()>,
{
    fn notify(&mut self, payload: &T) -> anyhow::Result<()> {
        self(payload)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Identifier returned when subscribing, used to unsubscribe later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32);

impl ListenerId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Outcome of a single broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Listeners that handled the payload.
    pub delivered: usize,
    /// Listeners that returned an error.
    pub failed: usize,
}

/// Notifies every subscribed listener of each payload, in subscription order.
pub struct Broadcaster<T> {
    listeners: Vec<(ListenerId, Box<dyn Listener<T>>)>,
    next_id: u32,
}

impl<T> Broadcaster<T> {
    /// Creates a broadcaster without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a listener and returns its identifier.
    pub fn subscribe<L>(&mut self, listener: L) -> ListenerId
    where
        L: Listener<T> + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Number of subscribed listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Reports whether no listener is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers the payload to every listener.
    pub fn broadcast(&mut self, payload: &T) -> Delivery {
        if self.listeners.is_empty() {
            debug!("broadcast without listeners");
            return Delivery::default();
        }

        let mut delivery = Delivery::default();
        for (id, listener) in &mut self.listeners {
            match listener.notify(payload) {
                Ok(()) => delivery.delivered += 1,
                Err(err) => {
                    delivery.failed += 1;
                    error!(
                        listener = listener.name(),
                        id = id.get(),
                        error = %err,
                        "listener failed to handle broadcast"
                    );
                }
            }
        }
        delivery
    }
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
