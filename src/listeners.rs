//! Listener registry for received events.
//!
//! The client only queues events; the owner decides on which thread and when
//! callbacks run by calling `Listeners::tick` (or `dispatch`) from its own
//! loop, typically once per frame.

use crate::client::Client;
use crate::models::is_root_namespace;
use crate::state::DomainEvent;
use crate::transport::Connector;
use std::collections::HashMap;
use tracing::warn;

type Callback = Box<dyn FnMut(&str) + Send>;

/// Callbacks keyed by namespace and event name.
#[derive(derive_more::Debug, Default)]
pub struct Listeners {
    #[debug(skip)]
    callbacks: HashMap<String, HashMap<String, Callback>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `event` on the root namespace.
    pub fn on<F>(&mut self, event: impl Into<String>, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_namespace("", event, callback);
    }

    /// Registers `callback` for `event` on `namespace`, replacing any
    /// callback already registered for the pair.
    pub fn on_namespace<F>(&mut self, namespace: &str, event: impl Into<String>, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.callbacks
            .entry(namespace_key(namespace).to_string())
            .or_default()
            .insert(event.into(), Box::new(callback));
    }

    /// Invokes the callback registered for each event with the event
    /// argument. Returns the number of callbacks invoked.
    pub fn dispatch(&mut self, events: impl IntoIterator<Item = DomainEvent>) -> usize {
        let mut invoked = 0;
        for event in events {
            let callback = self
                .callbacks
                .get_mut(namespace_key(&event.namespace))
                .and_then(|events| events.get_mut(&event.name));
            match callback {
                Some(callback) => {
                    callback(&event.arg);
                    invoked += 1;
                }
                None => warn!(
                    "Incoming event in {:?} with name {:?} not registered",
                    event.namespace, event.name
                ),
            }
        }
        invoked
    }

    /// Drains the client's event queue and dispatches it.
    pub fn tick<C: Connector>(&mut self, client: &Client<C>) -> usize {
        self.dispatch(client.drain_events())
    }
}

fn namespace_key(namespace: &str) -> &str {
    if is_root_namespace(namespace) {
        ""
    } else {
        namespace
    }
}
