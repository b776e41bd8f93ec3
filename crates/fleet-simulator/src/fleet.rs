//! # Fleet Store
//!
//! Owns every drone and order record. Tick advancement and dispatch both go
//! through `&mut FleetStore`, so a single writer lock around the store is all
//! the mutual exclusion the engine needs.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use fleet_domain::{
    DeliveryOrder, DomainError, Drone, DroneId, FlightPhase, HubId, HubRegistry, OrderId,
    OrderStatus,
};
use rand::Rng;
use serde::Serialize;

use crate::config::{DispatchPolicy, FlightProfile};
use crate::dispatch::{self, DispatchAction};
use crate::eta::{self, Eta};
use crate::events::FleetEvent;
use crate::flight::{self, TickContext};

/// Number of delivered orders kept for presentation
const RECENT_DELIVERIES: usize = 20;

/// Serializable read-only copy of the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub tick: u64,
    pub drones: Vec<Drone>,
    pub pending: Vec<DeliveryOrder>,
    pub delivered_count: u64,
    pub recent_deliveries: Vec<DeliveryOrder>,
}

impl FleetSnapshot {
    /// Drone count per flight phase, in phase order. Empty phases are kept.
    #[must_use]
    pub fn phase_counts(&self) -> Vec<(FlightPhase, usize)> {
        FlightPhase::ALL
            .iter()
            .map(|phase| {
                let count = self.drones.iter().filter(|d| d.status() == *phase).count();
                (*phase, count)
            })
            .collect()
    }
}

/// Shared fleet and order state
#[derive(Debug, Clone)]
pub struct FleetStore {
    hubs: HubRegistry,
    drones: Vec<Drone>,
    pending: Vec<DeliveryOrder>,
    delivered_count: u64,
    recent_deliveries: VecDeque<DeliveryOrder>,
    tick: u64,
    profile: FlightProfile,
    policy: DispatchPolicy,
}

impl FleetStore {
    #[must_use]
    pub fn new(
        hubs: HubRegistry,
        drones: Vec<Drone>,
        profile: FlightProfile,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            hubs,
            drones,
            pending: Vec::new(),
            delivered_count: 0,
            recent_deliveries: VecDeque::with_capacity(RECENT_DELIVERIES),
            tick: 0,
            profile,
            policy,
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    #[must_use]
    pub const fn hubs(&self) -> &HubRegistry {
        &self.hubs
    }

    #[must_use]
    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    #[must_use]
    pub fn drone(&self, id: &DroneId) -> Option<&Drone> {
        self.drones.iter().find(|d| &d.id == id)
    }

    /// Pending pool in insertion order
    #[must_use]
    pub fn pending(&self) -> &[DeliveryOrder] {
        &self.pending
    }

    #[must_use]
    pub const fn delivered_count(&self) -> u64 {
        self.delivered_count
    }

    /// Ticks advanced since the store was created
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub const fn profile(&self) -> &FlightProfile {
        &self.profile
    }

    #[must_use]
    pub const fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// ETA for a drone's current objective; `None` for unknown or idle drones.
    #[must_use]
    pub fn eta(&self, id: &DroneId) -> Option<Eta> {
        self.drone(id)
            .and_then(|drone| eta::eta(drone, &self.hubs, &self.profile))
    }

    #[must_use]
    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            tick: self.tick,
            drones: self.drones.clone(),
            pending: self.pending.clone(),
            delivered_count: self.delivered_count,
            recent_deliveries: self.recent_deliveries.iter().cloned().collect(),
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advance every drone one tick and swap the new fleet in.
    pub fn advance<R: Rng>(
        &mut self,
        tick_seconds: f64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<FleetEvent> {
        let ctx = TickContext {
            hubs: &self.hubs,
            profile: &self.profile,
            tick_seconds,
            now,
        };
        let next = flight::advance(&self.drones, &ctx, rng);

        self.drones = next.drones;
        self.tick += 1;
        for order in next.delivered {
            self.delivered_count += 1;
            self.recent_deliveries.push_front(order);
            self.recent_deliveries.truncate(RECENT_DELIVERIES);
        }

        tracing::trace!(tick = self.tick, events = next.events.len(), "fleet advanced");
        next.events
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Accept a freshly generated order into the pending pool.
    ///
    /// Orders naming an unknown hub are accepted; the scheduler never picks
    /// them up.
    pub fn submit_order(&mut self, order: DeliveryOrder) -> Result<FleetEvent, DomainError> {
        if !order.is_pending() {
            return Err(DomainError::OrderNotPending {
                order: order.id,
                status: order.status,
            });
        }
        if !order.destination.is_valid() {
            return Err(DomainError::InvalidCoordinates {
                lat: order.destination.latitude,
                lon: order.destination.longitude,
            });
        }
        if self.pending.iter().any(|o| o.id == order.id) || self.is_in_flight(order.id) {
            return Err(DomainError::DuplicateOrder(order.id));
        }
        if !self.hubs.contains(&order.hub_id) {
            tracing::warn!(order = %order.id, hub = %order.hub_id, "order stocked at unknown hub");
        }

        let event = FleetEvent::OrderReceived {
            order: order.id,
            hub: order.hub_id.clone(),
            item: order.item.clone(),
        };
        self.pending.push(order);
        Ok(event)
    }

    fn is_in_flight(&self, id: OrderId) -> bool {
        self.drones
            .iter()
            .filter_map(|d| d.active_order.as_ref())
            .any(|o| o.id == id)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Run one scheduler evaluation against the current state.
    #[must_use]
    pub fn evaluate(&self) -> Option<DispatchAction> {
        dispatch::evaluate(&self.drones, &self.hubs, &self.pending, &self.policy)
    }

    /// Apply a scheduler decision.
    pub fn apply(&mut self, action: &DispatchAction) -> Result<FleetEvent, DomainError> {
        match action {
            DispatchAction::Assign { drone, order } => self.assign(drone, *order),
            DispatchAction::Reposition { drone, hub } => self.reposition(drone, hub),
        }
    }

    /// One dispatch cycle: evaluate, then apply at most one action.
    ///
    /// A rejected action leaves the store untouched and yields `None`.
    pub fn dispatch(&mut self) -> Option<FleetEvent> {
        let action = self.evaluate()?;
        match self.apply(&action) {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::debug!(?action, error = %err, "dispatch action skipped");
                None
            }
        }
    }

    /// Repeat dispatch cycles until the scheduler has nothing left to do.
    ///
    /// Every successful cycle removes one eligible drone, so the loop is
    /// bounded by fleet size.
    pub fn settle(&mut self) -> Vec<FleetEvent> {
        let mut events = Vec::new();
        for _ in 0..=self.drones.len() {
            match self.dispatch() {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }

    /// Load a pending order onto an idle drone stationed at the order's hub.
    pub fn assign(&mut self, drone_id: &DroneId, order_id: OrderId) -> Result<FleetEvent, DomainError> {
        let drone_index = self.drone_index(drone_id)?;
        let order_index = self
            .pending
            .iter()
            .position(|o| o.id == order_id)
            .ok_or(DomainError::UnknownOrder(order_id))?;

        let order = &self.pending[order_index];
        let drone = &self.drones[drone_index];

        if !order.is_pending() {
            return Err(DomainError::OrderNotPending {
                order: order.id,
                status: order.status,
            });
        }
        Self::ensure_available(drone)?;
        self.hubs.require(&order.hub_id)?;
        if order.hub_id != drone.current_hub_id {
            return Err(DomainError::HubMismatch {
                order: order.id,
                order_hub: order.hub_id.clone(),
                drone_hub: drone.current_hub_id.clone(),
            });
        }

        let mut order = self.pending.remove(order_index);
        order.status = OrderStatus::InTransit;

        let drone = &mut self.drones[drone_index];
        let event = FleetEvent::OrderAssigned {
            drone: drone.id.clone(),
            label: drone.label.clone(),
            order: order.id,
            location: order.location_name.clone(),
            item: order.item.clone(),
        };
        drone.active_order = Some(order);
        drone.phase_ticks = 0;
        drone.telemetry.status = FlightPhase::TakingOff;

        tracing::info!(drone = %drone.id, order = %order_id, "order assigned");
        Ok(event)
    }

    /// Send an idle drone to another hub.
    pub fn reposition(&mut self, drone_id: &DroneId, hub_id: &HubId) -> Result<FleetEvent, DomainError> {
        let drone_index = self.drone_index(drone_id)?;
        let hub = self.hubs.require(hub_id)?;
        let drone = &mut self.drones[drone_index];

        Self::ensure_available(drone)?;
        if drone.current_hub_id == *hub_id {
            return Err(DomainError::AlreadyStationed {
                drone: drone.id.clone(),
                hub: hub_id.clone(),
            });
        }

        let event = FleetEvent::RepositionOrdered {
            drone: drone.id.clone(),
            label: drone.label.clone(),
            from: drone.current_hub_id.clone(),
            to: hub_id.clone(),
            hub_name: hub.name.clone(),
        };
        drone.target_hub_id = Some(hub_id.clone());
        drone.phase_ticks = 0;
        drone.telemetry.status = FlightPhase::Repositioning;

        tracing::info!(drone = %drone.id, hub = %hub_id, "reposition ordered");
        Ok(event)
    }

    fn drone_index(&self, id: &DroneId) -> Result<usize, DomainError> {
        self.drones
            .iter()
            .position(|d| &d.id == id)
            .ok_or_else(|| DomainError::UnknownDrone(id.clone()))
    }

    fn ensure_available(drone: &Drone) -> Result<(), DomainError> {
        if drone.is_idle() && drone.active_order.is_none() {
            Ok(())
        } else {
            Err(DomainError::DroneBusy {
                drone: drone.id.clone(),
                phase: drone.status(),
            })
        }
    }
}
