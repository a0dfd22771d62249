//! Connection state management module.
//!
//! This module defines the single mutable record kept per connection: its
//! lifecycle phase, the stored handshake, and the two FIFO queues the owner
//! drains on each tick (domain events and log records).

use crate::models::Handshake;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle phase of a connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Open,
    Closed,
}

/// Severity of a queued log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Log record queued for the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub message: String,
    pub severity: Severity,
}

/// Application-visible event received on a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvent {
    /// Namespace the event arrived on, `""` for the root namespace.
    pub namespace: String,
    pub name: String,
    pub arg: String,
}

impl DomainEvent {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        arg: impl Into<String>,
    ) -> Self {
        DomainEvent {
            namespace: namespace.into(),
            name: name.into(),
            arg: arg.into(),
        }
    }
}

/// Mutable record for one connection.
#[derive(Debug)]
pub struct ConnectionState {
    /// Identifier used in log output.
    pub id: Uuid,
    phase: Phase,
    handshake: Option<Handshake>,
    inbound_queue: VecDeque<DomainEvent>,
    pending_log: VecDeque<LogRecord>,
}

impl ConnectionState {
    pub fn new(id: Uuid) -> Self {
        ConnectionState {
            id,
            phase: Phase::Opening,
            handshake: None,
            inbound_queue: VecDeque::new(),
            pending_log: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Moves to `phase`. Nothing leaves `Closed`.
    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != Phase::Closed {
            self.phase = phase;
        }
    }

    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    pub(crate) fn store_handshake(&mut self, handshake: Handshake) {
        self.handshake = Some(handshake);
    }

    pub(crate) fn enqueue_event(&mut self, event: DomainEvent) {
        self.inbound_queue.push_back(event);
    }

    /// Removes and returns every queued domain event, oldest first.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        self.inbound_queue.drain(..).collect()
    }

    /// Removes and returns every queued log record, oldest first.
    pub fn drain_log(&mut self) -> Vec<LogRecord> {
        self.pending_log.drain(..).collect()
    }

    /// Queues a log record and emits it through `tracing`.
    pub(crate) fn log(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => info!("[{}] {}", self.id, message),
            Severity::Warning => warn!("[{}] {}", self.id, message),
            Severity::Error => error!("[{}] {}", self.id, message),
        }
        self.pending_log.push_back(LogRecord { message, severity });
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }
}

/// Connection state shared between the I/O tasks and the owner.
#[derive(Debug, Clone)]
pub struct SharedState(Arc<Mutex<ConnectionState>>);

impl SharedState {
    pub fn new(id: Uuid) -> Self {
        SharedState(Arc::new(Mutex::new(ConnectionState::new(id))))
    }

    /// Locks the state, recovering the data from a poisoned lock.
    pub fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
