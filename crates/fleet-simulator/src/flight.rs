//! Flight-phase state machine for delivery drones.
//!
//! [`advance`] turns the previous fleet snapshot into the next one. Each
//! drone is computed from its own previous state only, so the batch can be
//! swapped into the store in one assignment and readers never see a
//! half-updated fleet.

use chrono::{DateTime, Utc};
use fleet_domain::{
    Coordinates, DeliveryOrder, Drone, FlightPhase, HistorySample, HubRegistry, OrderStatus,
};
use rand::Rng;

use crate::config::FlightProfile;
use crate::events::FleetEvent;
use crate::motion;

/// Inputs shared by every drone in one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub hubs: &'a HubRegistry,
    pub profile: &'a FlightProfile,
    pub tick_seconds: f64,
    /// Wall-clock stamp for history samples
    pub now: DateTime<Utc>,
}

/// Result of advancing one drone.
#[derive(Debug, Clone)]
pub struct DroneTick {
    pub drone: Drone,
    /// Order handed over this tick, already marked delivered
    pub delivered: Option<DeliveryOrder>,
    pub events: Vec<FleetEvent>,
}

/// Result of advancing the whole fleet.
#[derive(Debug, Clone, Default)]
pub struct FleetTick {
    pub drones: Vec<Drone>,
    pub delivered: Vec<DeliveryOrder>,
    pub events: Vec<FleetEvent>,
}

/// Advance every drone by one tick, producing a fresh snapshot.
pub fn advance<R: Rng>(drones: &[Drone], ctx: &TickContext<'_>, rng: &mut R) -> FleetTick {
    let mut tick = FleetTick {
        drones: Vec::with_capacity(drones.len()),
        ..FleetTick::default()
    };

    for drone in drones {
        let DroneTick {
            drone,
            delivered,
            mut events,
        } = advance_drone(drone, ctx, rng);
        tick.drones.push(drone);
        tick.delivered.extend(delivered);
        tick.events.append(&mut events);
    }

    tick
}

/// Advance a single drone by one tick.
pub fn advance_drone<R: Rng>(
    prev: &Drone,
    ctx: &TickContext<'_>,
    rng: &mut R,
) -> DroneTick {
    let profile = ctx.profile;
    let mut drone = prev.clone();
    let mut delivered = None;
    let mut events = Vec::new();

    drone.phase_ticks = drone.phase_ticks.saturating_add(1);
    let tick = drone.phase_ticks;
    let phase = drone.telemetry.status;

    let battery = &mut drone.telemetry.battery_pct;
    let delta = if phase == FlightPhase::IdleAtBase {
        profile.battery_recharge_per_tick
    } else {
        -profile.battery_drain_per_tick
    };
    // Clamp-only: an empty battery never grounds the drone
    *battery = (*battery + delta).clamp(0.0, 100.0);

    match phase {
        FlightPhase::IdleAtBase => {
            drone.telemetry.speed_kmh = 0.0;
            drone.telemetry.altitude_m = 0.0;
        }

        FlightPhase::TakingOff => {
            drone.telemetry.speed_kmh = 0.0;
            drone.telemetry.altitude_m += profile.climb_rate_m_per_tick;
            if drone.telemetry.altitude_m >= profile.cruise_altitude_m {
                drone.telemetry.altitude_m = profile.cruise_altitude_m;
                enter(&mut drone, FlightPhase::EnRouteToSite, &mut events);
            }
        }

        FlightPhase::EnRouteToSite => {
            drone.telemetry.speed_kmh = profile.cruise_speed_kmh;
            drone.telemetry.altitude_m =
                profile.cruise_wobble_m.mul_add((f64::from(tick) / 20.0).sin(), profile.cruise_altitude_m);

            match drone.active_order.as_ref().map(|o| o.destination) {
                Some(destination) => {
                    if fly_toward(&mut drone, destination, profile.cruise_speed_kmh, ctx) {
                        enter(&mut drone, FlightPhase::Delivering, &mut events);
                    }
                }
                None => {
                    tracing::warn!(drone = %drone.id, "en route without an order, heading home");
                    enter(&mut drone, FlightPhase::ReturningToBase, &mut events);
                }
            }
        }

        FlightPhase::Delivering => {
            drone.telemetry.speed_kmh = 0.0;
            drone.telemetry.altitude_m = delivery_altitude(drone.telemetry.altitude_m, tick, profile);

            if tick > profile.delivery_dwell_ticks {
                enter(&mut drone, FlightPhase::ReturningToBase, &mut events);
                if let Some(mut order) = drone.active_order.take() {
                    order.status = OrderStatus::Delivered;
                    events.push(FleetEvent::OrderDelivered {
                        drone: drone.id.clone(),
                        order: order.id,
                        recipient: order.recipient.clone(),
                    });
                    delivered = Some(order);
                }
            }
        }

        FlightPhase::ReturningToBase => {
            drone.telemetry.speed_kmh = profile.cruise_speed_kmh;
            drone.telemetry.altitude_m = profile.cruise_altitude_m + profile.return_altitude_offset_m;

            // Always the current home; a reposition may have moved it
            match ctx.hubs.get(&drone.current_hub_id) {
                Some(home) => {
                    if fly_toward(&mut drone, home.coordinates, profile.cruise_speed_kmh, ctx) {
                        enter(&mut drone, FlightPhase::Landing, &mut events);
                    }
                }
                None => {
                    tracing::debug!(drone = %drone.id, hub = %drone.current_hub_id, "home hub unknown, holding");
                }
            }
        }

        FlightPhase::Repositioning => {
            drone.telemetry.speed_kmh = profile.reposition_speed_kmh;
            drone.telemetry.altitude_m =
                profile.cruise_altitude_m + profile.reposition_altitude_offset_m;

            let target = drone
                .target_hub_id
                .as_ref()
                .and_then(|id| ctx.hubs.get(id))
                .map(|hub| hub.coordinates);

            match target {
                Some(coords) => {
                    if fly_toward(&mut drone, coords, profile.reposition_speed_kmh, ctx) {
                        enter(&mut drone, FlightPhase::Landing, &mut events);
                        if let Some(new_home) = drone.target_hub_id.take() {
                            let old_home = std::mem::replace(&mut drone.current_hub_id, new_home);
                            events.push(FleetEvent::HomeChanged {
                                drone: drone.id.clone(),
                                from: old_home,
                                to: drone.current_hub_id.clone(),
                            });
                        }
                    }
                }
                None => {
                    // Dangling target: drop it and fly back to the old home
                    events.push(FleetEvent::ReferenceSkipped {
                        reason: format!(
                            "{} repositioning toward unknown hub {:?}",
                            drone.id, drone.target_hub_id
                        ),
                    });
                    drone.target_hub_id = None;
                    enter(&mut drone, FlightPhase::ReturningToBase, &mut events);
                }
            }
        }

        FlightPhase::Landing => {
            drone.telemetry.speed_kmh = 0.0;
            drone.telemetry.altitude_m -= profile.landing_rate_m_per_tick;
            if drone.telemetry.altitude_m <= 0.0 {
                drone.telemetry.altitude_m = 0.0;
                drone.active_order = None;
                enter(&mut drone, FlightPhase::IdleAtBase, &mut events);
            }
        }
    }

    update_signal(&mut drone, ctx, rng);

    if tick % profile.history_every_ticks.max(1) == 0 {
        drone.history.push_back(HistorySample {
            recorded_at: ctx.now,
            altitude_m: drone.telemetry.altitude_m,
            speed_kmh: drone.telemetry.speed_kmh,
        });
        while drone.history.len() > profile.history_capacity {
            drone.history.pop_front();
        }
    }

    DroneTick {
        drone,
        delivered,
        events,
    }
}

/// Switch phase and restart the phase timer.
fn enter(drone: &mut Drone, next: FlightPhase, events: &mut Vec<FleetEvent>) {
    let from = drone.telemetry.status;
    drone.telemetry.status = next;
    drone.phase_ticks = 0;
    events.push(FleetEvent::PhaseChanged {
        drone: drone.id.clone(),
        from,
        to: next,
    });
}

/// Move one tick toward `target`; returns true on arrival.
fn fly_toward(drone: &mut Drone, target: Coordinates, speed_kmh: f64, ctx: &TickContext<'_>) -> bool {
    let step = motion::step(drone.position, target, speed_kmh, ctx.tick_seconds);
    drone.position = step.position;
    drone.telemetry.heading_deg = step.heading_deg;
    step.reached
}

/// Descend to hover, hold, then climb back toward cruise.
fn delivery_altitude(current: f64, tick: u32, profile: &FlightProfile) -> f64 {
    if tick < profile.delivery_descend_ticks {
        (current - profile.delivery_vertical_rate_m_per_tick).max(profile.hover_altitude_m)
    } else if tick < profile.delivery_hold_ticks {
        profile.hover_altitude_m
    } else {
        (current + profile.delivery_vertical_rate_m_per_tick).min(profile.cruise_altitude_m)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn update_signal<R: Rng>(drone: &mut Drone, ctx: &TickContext<'_>, rng: &mut R) {
    let Some(home) = ctx.hubs.get(&drone.current_hub_id) else {
        return;
    };
    let distance = drone.position.distance_to_km(&home.coordinates);
    let spread = ctx.profile.signal_noise_pct;
    let noise = if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    };
    let raw = ctx.profile.signal_loss_pct_per_km.mul_add(-distance, 100.0) + noise;
    drone.telemetry.signal_pct = raw.clamp(0.0, 100.0).floor() as u8;
}
