//! Remaining-time estimate for a drone's current objective.

use std::fmt;
use std::time::Duration;

use fleet_domain::{Coordinates, Drone, FlightPhase, HubRegistry};
use serde::Serialize;

use crate::config::FlightProfile;

/// Whole-second time remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Eta {
    total_seconds: u64,
}

impl Eta {
    #[must_use]
    pub const fn from_seconds(total_seconds: u64) -> Self {
        Self { total_seconds }
    }

    #[must_use]
    pub const fn minutes(&self) -> u64 {
        self.total_seconds / 60
    }

    #[must_use]
    pub const fn seconds(&self) -> u64 {
        self.total_seconds % 60
    }

    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        Duration::from_secs(self.total_seconds)
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {}s", self.minutes(), self.seconds())
    }
}

/// Estimate time to the drone's current objective.
///
/// Idle drones have no objective. Repositioning drones are measured to their
/// target hub at reposition speed, drones en route to their drop-off point
/// at cruise speed, and every other phase to the home hub at cruise speed.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn eta(drone: &Drone, hubs: &HubRegistry, profile: &FlightProfile) -> Option<Eta> {
    let (target, speed_kmh) = objective(drone, hubs, profile)?;
    if speed_kmh <= 0.0 {
        return None;
    }

    let hours = drone.position.distance_to_km(&target) / speed_kmh;
    let seconds = (hours * 3600.0).floor().max(0.0);
    Some(Eta::from_seconds(seconds as u64))
}

fn objective(
    drone: &Drone,
    hubs: &HubRegistry,
    profile: &FlightProfile,
) -> Option<(Coordinates, f64)> {
    let home = || hubs.get(&drone.current_hub_id).map(|h| h.coordinates);

    match drone.status() {
        FlightPhase::IdleAtBase => None,
        FlightPhase::Repositioning => drone
            .target_hub_id
            .as_ref()
            .and_then(|id| hubs.get(id))
            .map(|h| h.coordinates)
            .or_else(home)
            .map(|c| (c, profile.reposition_speed_kmh)),
        FlightPhase::EnRouteToSite => drone
            .active_order
            .as_ref()
            .map(|o| o.destination)
            .or_else(home)
            .map(|c| (c, profile.cruise_speed_kmh)),
        FlightPhase::TakingOff
        | FlightPhase::Delivering
        | FlightPhase::ReturningToBase
        | FlightPhase::Landing => home().map(|c| (c, profile.cruise_speed_kmh)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_domain::{
        DeliveryOrder, DroneId, Hub, HubId, LocationType, OrderId, OrderStatus, TradeCategory,
    };

    const HOME: Coordinates = Coordinates::new(53.372_381, -6.284_498);
    const OTHER: Coordinates = Coordinates::new(53.397_886, -6.248_739);

    fn registry() -> HubRegistry {
        HubRegistry::new(vec![
            Hub {
                id: HubId::new("HUB-A"),
                name: "Alpha".to_string(),
                coordinates: HOME,
                category: TradeCategory::General,
                color: "emerald".to_string(),
            },
            Hub {
                id: HubId::new("HUB-B"),
                name: "Bravo".to_string(),
                coordinates: OTHER,
                category: TradeCategory::Plumbing,
                color: "amber".to_string(),
            },
        ])
        .unwrap()
    }

    fn drone_at(position: Coordinates, phase: FlightPhase) -> Drone {
        let mut drone = Drone::new(
            DroneId::new("FP-G0-100"),
            "Unit G0-100",
            HubId::new("HUB-A"),
            position,
            100.0,
            14,
        );
        drone.telemetry.status = phase;
        drone
    }

    #[test]
    fn test_idle_has_no_eta() {
        let drone = drone_at(HOME.offset(0.01, 0.0), FlightPhase::IdleAtBase);
        assert_eq!(eta(&drone, &registry(), &FlightProfile::default()), None);
    }

    #[test]
    fn test_returning_eta_uses_cruise_speed() {
        // 1 degree of latitude / 100 is ~1.112 km; at 50 km/h that is 80 s
        let drone = drone_at(HOME.offset(0.01, 0.0), FlightPhase::ReturningToBase);
        let eta = eta(&drone, &registry(), &FlightProfile::default()).unwrap();
        assert_eq!(eta.as_duration().as_secs(), 80);
        assert_eq!(eta.to_string(), "1m 20s");
    }

    #[test]
    fn test_en_route_targets_destination() {
        let mut drone = drone_at(HOME, FlightPhase::EnRouteToSite);
        drone.active_order = Some(DeliveryOrder {
            id: OrderId::random(),
            hub_id: HubId::new("HUB-A"),
            recipient: "Sarah (Elec)".to_string(),
            location_name: "Mobhi Rd".to_string(),
            location_type: LocationType::DynamicSite,
            item: "Wood Screws (500pk)".to_string(),
            category: TradeCategory::General,
            weight_kg: 1.2,
            destination: HOME.offset(0.02, 0.0),
            status: OrderStatus::InTransit,
        });

        let eta = eta(&drone, &registry(), &FlightProfile::default()).unwrap();
        assert_eq!(eta.minutes(), 2);
        assert_eq!(eta.seconds(), 40);
    }

    #[test]
    fn test_repositioning_uses_target_and_faster_speed() {
        let mut drone = drone_at(HOME, FlightPhase::Repositioning);
        drone.target_hub_id = Some(HubId::new("HUB-B"));
        let profile = FlightProfile::default();

        let eta = eta(&drone, &registry(), &profile).unwrap();
        let expected = (HOME.distance_to_km(&OTHER) / profile.reposition_speed_kmh * 3600.0).floor();
        #[allow(clippy::cast_precision_loss)]
        let got = eta.as_duration().as_secs() as f64;
        assert!((got - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mid_maneuver_phases_measure_home() {
        let registry = registry();
        let profile = FlightProfile::default();
        for phase in [FlightPhase::TakingOff, FlightPhase::Delivering, FlightPhase::Landing] {
            let drone = drone_at(HOME, phase);
            assert_eq!(eta(&drone, &registry, &profile), Some(Eta::from_seconds(0)));
        }
    }

    #[test]
    fn test_unknown_home_has_no_eta() {
        let mut drone = drone_at(HOME.offset(0.01, 0.0), FlightPhase::ReturningToBase);
        drone.current_hub_id = HubId::new("HUB-GONE");
        assert_eq!(eta(&drone, &registry(), &FlightProfile::default()), None);
    }
}
