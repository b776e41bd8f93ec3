//! Fleet events and the sinks that collect them.
//!
//! The rendered text of an event is for humans; nothing parses it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use fleet_domain::{DroneId, FlightPhase, HubId, OrderId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Something noteworthy that happened to the fleet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FleetEvent {
    OrderReceived {
        order: OrderId,
        hub: HubId,
        item: String,
    },
    OrderAssigned {
        drone: DroneId,
        label: String,
        order: OrderId,
        location: String,
        item: String,
    },
    RepositionOrdered {
        drone: DroneId,
        label: String,
        from: HubId,
        to: HubId,
        hub_name: String,
    },
    PhaseChanged {
        drone: DroneId,
        from: FlightPhase,
        to: FlightPhase,
    },
    OrderDelivered {
        drone: DroneId,
        order: OrderId,
        recipient: String,
    },
    HomeChanged {
        drone: DroneId,
        from: HubId,
        to: HubId,
    },
    /// A scheduler candidate referenced something that does not exist
    ReferenceSkipped { reason: String },
}

impl fmt::Display for FleetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderReceived { order, hub, item } => {
                write!(f, "New order {order} at {hub}: {item}")
            }
            Self::OrderAssigned {
                label,
                location,
                item,
                ..
            } => write!(f, "{label}: Auto-Dispatch to {location} ({item})"),
            Self::RepositionOrdered {
                label, hub_name, ..
            } => write!(f, "{label}: Redeploying to {hub_name} for demand coverage."),
            Self::PhaseChanged { drone, from, to } => write!(f, "{drone}: {from} -> {to}"),
            Self::OrderDelivered {
                drone,
                order,
                recipient,
            } => write!(f, "{drone}: Delivered {order} to {recipient}"),
            Self::HomeChanged { drone, from, to } => {
                write!(f, "{drone}: Home base moved {from} -> {to}")
            }
            Self::ReferenceSkipped { reason } => write!(f, "Skipped: {reason}"),
        }
    }
}

/// Destination for fleet events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &FleetEvent);

    fn emit_all(&self, events: &[FleetEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Writes events to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &FleetEvent) {
        match event {
            FleetEvent::PhaseChanged { .. } => tracing::debug!(event = %event, "fleet event"),
            FleetEvent::ReferenceSkipped { .. } => tracing::warn!(event = %event, "fleet event"),
            _ => tracing::info!(event = %event, "fleet event"),
        }
    }
}

/// Fans events out to live subscribers; dropped silently when nobody listens.
impl EventSink for broadcast::Sender<FleetEvent> {
    fn emit(&self, event: &FleetEvent) {
        let _ = self.send(event.clone());
    }
}

/// Timestamped log line kept by [`EventLog`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Bounded in-memory log, newest first.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl EventLog {
    pub const DEFAULT_CAPACITY: usize = 50;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Copy of the current entries, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    // Entries outlive a panic while the lock was held
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: &FleetEvent) {
        // Per-tick phase chatter would push real events out of the window
        if matches!(event, FleetEvent::PhaseChanged { .. }) || self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        entries.push_front(LogEntry {
            at: Utc::now(),
            text: event.to_string(),
        });
        entries.truncate(self.capacity);
    }
}

/// Sends every event to each of the wrapped sinks.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanOut {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanOut {
    fn emit(&self, event: &FleetEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, event: &FleetEvent) {
        (**self).emit(event);
    }
}
