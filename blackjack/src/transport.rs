use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Envelope, MessageTemplate, Performative};

/// An opaque agent address, as handed out by the [`Router`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
struct RouterInner {
    mailboxes: HashMap<Address, VecDeque<Envelope>>,
    services: HashMap<String, Vec<Address>>,
}

/// In-memory message transport and service directory.
///
/// Each agent gets an [`Endpoint`] with its own FIFO mailbox. Delivery is
/// immediate; within one conversation, messages are received in the order
/// they were sent.
#[derive(Clone, Debug, Default)]
pub struct Router {
    inner: Arc<Mutex<RouterInner>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mailbox for `name` and returns the handle to it.
    pub fn endpoint(&self, name: &str) -> Endpoint {
        let address = Address::new(name);
        self.lock().mailboxes.entry(address.clone()).or_default();
        Endpoint {
            address,
            router: self.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterInner> {
        self.inner.lock().expect("router lock poisoned")
    }
}

/// One agent's handle onto the [`Router`]: send, broadcast, non-blocking
/// matched receive, and directory lookup.
#[derive(Clone, Debug)]
pub struct Endpoint {
    address: Address,
    router: Router,
}

impl Endpoint {
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Delivers `envelope` to its receiver's mailbox. A message for an
    /// unknown address is dropped.
    pub fn send(&self, envelope: Envelope) {
        if let Ok(json) = serde_json::to_string(&envelope) {
            trace!(name: "Sending message", from = %self.address, envelope = %json);
        }
        let mut inner = self.router.lock();
        if let Some(mailbox) = inner.mailboxes.get_mut(&envelope.receiver) {
            mailbox.push_back(envelope);
        } else {
            trace!(name: "Dropping message for unknown address", receiver = %envelope.receiver);
        }
    }

    /// Sends one copy of the same message to every receiver.
    pub fn broadcast(
        &self,
        receivers: &[Address],
        performative: Performative,
        conversation_id: &str,
        reply_with: &str,
        content: &str,
    ) {
        for receiver in receivers {
            self.send(Envelope {
                performative,
                conversation_id: conversation_id.to_owned(),
                sender: self.address.clone(),
                receiver: receiver.clone(),
                content: content.to_owned(),
                reply_with: Some(reply_with.to_owned()),
            });
        }
    }

    /// Removes and returns the first queued message matching `template`.
    ///
    /// Returns `None` immediately when nothing matches; non-matching
    /// messages stay queued in order.
    pub fn try_recv(&self, template: &MessageTemplate) -> Option<Envelope> {
        let mut inner = self.router.lock();
        let mailbox = inner.mailboxes.get_mut(&self.address)?;
        let idx = mailbox.iter().position(|m| template.matches(m))?;
        let envelope = mailbox.remove(idx);
        if let Some(envelope) = &envelope {
            if let Ok(json) = serde_json::to_string(envelope) {
                trace!(name: "Received message", at = %self.address, envelope = %json);
            }
        }
        envelope
    }

    /// Advertises this agent under `service_type` in the directory.
    pub fn register(&self, service_type: &str) {
        self.router
            .lock()
            .services
            .entry(service_type.to_owned())
            .or_default()
            .push(self.address.clone());
    }

    /// All agents advertising `service_type`. An unknown service yields an
    /// empty list, which is a normal outcome.
    pub fn search(&self, service_type: &str) -> Vec<Address> {
        self.router
            .lock()
            .services
            .get(service_type)
            .cloned()
            .unwrap_or_default()
    }
}
