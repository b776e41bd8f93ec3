//! Dispatch scheduler.
//!
//! One evaluation yields at most one action. Local deliveries win over
//! rebalancing; fleet order and hub definition order break ties.

use fleet_domain::{DeliveryOrder, Drone, DroneId, HubId, HubRegistry, OrderId};
use serde::Serialize;

use crate::config::DispatchPolicy;

/// Decision taken by one scheduler evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchAction {
    /// Load a pending order onto an idle drone at the order's hub
    Assign { drone: DroneId, order: OrderId },
    /// Send an idle drone to another hub that has demand but no coverage
    Reposition { drone: DroneId, hub: HubId },
}

impl DispatchAction {
    #[must_use]
    pub const fn drone(&self) -> &DroneId {
        match self {
            Self::Assign { drone, .. } | Self::Reposition { drone, .. } => drone,
        }
    }
}

/// Idle, unladen and charged to the policy threshold.
#[must_use]
pub fn is_eligible(drone: &Drone, policy: &DispatchPolicy) -> bool {
    drone.is_idle()
        && drone.active_order.is_none()
        && drone.telemetry.battery_pct >= policy.required_battery_pct
}

/// Pick the next action, if any.
#[must_use]
pub fn evaluate(
    drones: &[Drone],
    hubs: &HubRegistry,
    pending: &[DeliveryOrder],
    policy: &DispatchPolicy,
) -> Option<DispatchAction> {
    let eligible: Vec<&Drone> = drones.iter().filter(|d| is_eligible(d, policy)).collect();
    if eligible.is_empty() {
        return None;
    }

    local_assignment(&eligible, hubs, pending, policy)
        .or_else(|| rebalance(drones, &eligible, hubs, pending))
}

fn local_assignment(
    eligible: &[&Drone],
    hubs: &HubRegistry,
    pending: &[DeliveryOrder],
    policy: &DispatchPolicy,
) -> Option<DispatchAction> {
    for drone in eligible {
        let Some(home) = hubs.get(&drone.current_hub_id) else {
            tracing::debug!(drone = %drone.id, hub = %drone.current_hub_id, "skipping drone with unknown home hub");
            continue;
        };

        let order = pending.iter().find(|o| {
            o.is_pending()
                && o.hub_id == drone.current_hub_id
                && home.coordinates.distance_to_km(&o.destination) <= policy.max_delivery_radius_km
        });

        if let Some(order) = order {
            return Some(DispatchAction::Assign {
                drone: drone.id.clone(),
                order: order.id,
            });
        }
    }

    None
}

/// Cover hubs that have demand but neither a ready drone nor one inbound.
///
/// Any pending order makes a hub needy, including orders beyond the local
/// delivery radius.
fn rebalance(
    drones: &[Drone],
    eligible: &[&Drone],
    hubs: &HubRegistry,
    pending: &[DeliveryOrder],
) -> Option<DispatchAction> {
    let needy = hubs.iter().find(|hub| {
        let has_orders = pending.iter().any(|o| o.is_pending() && o.hub_id == hub.id);
        let has_ready = eligible.iter().any(|d| d.current_hub_id == hub.id);
        let has_inbound = drones
            .iter()
            .any(|d| d.target_hub_id.as_ref() == Some(&hub.id));
        has_orders && !has_ready && !has_inbound
    })?;

    let candidate = eligible
        .iter()
        .find(|d| d.current_hub_id != needy.id && hubs.contains(&d.current_hub_id))?;

    Some(DispatchAction::Reposition {
        drone: candidate.id.clone(),
        hub: needy.id.clone(),
    })
}
