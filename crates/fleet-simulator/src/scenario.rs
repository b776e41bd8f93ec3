//! Reference scenario: three trade hubs in north Dublin and their fleet.

use fleet_domain::{Coordinates, DomainError, Drone, DroneId, Hub, HubId, HubRegistry, TradeCategory};
use rand::Rng;

/// Hub table used by the simulator binary.
pub fn dublin_hubs() -> Result<HubRegistry, DomainError> {
    HubRegistry::new(vec![
        Hub {
            id: HubId::new("HUB-GLASNEVIN"),
            name: "Woodie's Glasnevin".to_string(),
            coordinates: Coordinates::new(53.372_381, -6.284_498),
            category: TradeCategory::General,
            color: "emerald".to_string(),
        },
        Hub {
            id: HubId::new("HUB-SANTRY"),
            name: "Trade Electric Group".to_string(),
            coordinates: Coordinates::new(53.395_314_551_266_4, -6.245_147_892_039_364),
            category: TradeCategory::Electrical,
            color: "blue".to_string(),
        },
        Hub {
            id: HubId::new("HUB-INSTANTOR"),
            name: "Sanbra Fyffe Limited T/A Instantor".to_string(),
            coordinates: Coordinates::new(53.397_886_363_778_07, -6.248_739_017_187_713),
            category: TradeCategory::Plumbing,
            color: "amber".to_string(),
        },
    ])
}

/// Build the starting fleet: `per_hub` drones parked beside each hub pad.
///
/// Ids follow `FP-<category initial><hub index>-<100 + slot>`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn seed_fleet<R: Rng>(hubs: &HubRegistry, per_hub: usize, rng: &mut R) -> Vec<Drone> {
    let mut drones = Vec::with_capacity(hubs.len() * per_hub);

    for (hub_index, hub) in hubs.iter().enumerate() {
        for slot in 0..per_hub {
            let suffix = format!("{}{}-{}", hub.category.initial(), hub_index, 100 + slot);
            let offset = slot as f64 * 0.0001;
            let position = hub.coordinates.offset(-0.0002 - offset, -0.0002 + offset);

            drones.push(Drone::new(
                DroneId::new(format!("FP-{suffix}")),
                format!("Unit {suffix}"),
                hub.id.clone(),
                position,
                rng.gen_range(85.0..=100.0),
                14 + (slot % 3) as u8,
            ));
        }
    }

    drones
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_dublin_hubs() {
        let hubs = dublin_hubs().unwrap();
        assert_eq!(hubs.len(), 3);
        let categories: Vec<_> = hubs.iter().map(|h| h.category).collect();
        assert_eq!(categories, TradeCategory::ALL);
    }

    #[test]
    fn test_seed_fleet_layout() {
        let hubs = dublin_hubs().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let fleet = seed_fleet(&hubs, 2, &mut rng);

        assert_eq!(fleet.len(), 6);
        let ids: Vec<_> = fleet.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            ["FP-G0-100", "FP-G0-101", "FP-E1-100", "FP-E1-101", "FP-P2-100", "FP-P2-101"]
        );
        assert_eq!(fleet[3].label, "Unit E1-101");
        assert_eq!(fleet[3].current_hub_id.as_str(), "HUB-SANTRY");
        assert_eq!(fleet[1].telemetry.satellites, 15);

        for drone in &fleet {
            assert!(drone.is_idle());
            assert!((85.0..=100.0).contains(&drone.telemetry.battery_pct));
            let home = hubs.get(&drone.current_hub_id).unwrap();
            // Parked within a few tens of metres of the pad
            assert!(drone.position.distance_to_km(&home.coordinates) < 0.05);
        }
    }
}
