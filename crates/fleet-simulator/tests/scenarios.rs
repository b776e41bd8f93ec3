//! End-to-end dispatch and flight scenarios against the public API.

use chrono::Utc;
use fleet_domain::{
    Coordinates, DeliveryOrder, Drone, DroneId, FlightPhase, Hub, HubId, HubRegistry,
    LocationType, OrderId, OrderStatus, TradeCategory,
};
use fleet_simulator::flight::{TickContext, advance_drone};
use fleet_simulator::motion::step_distance_km;
use fleet_simulator::scenario::{dublin_hubs, seed_fleet};
use fleet_simulator::{
    DispatchAction, DispatchPolicy, FlightProfile, FleetStore, OrderGenerator,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

const HUB_A: Coordinates = Coordinates::new(53.372_381, -6.284_498);
const HUB_B: Coordinates = Coordinates::new(53.395_314, -6.245_147);

fn two_hubs() -> HubRegistry {
    HubRegistry::new(vec![
        Hub {
            id: HubId::new("HUB-A"),
            name: "Alpha".to_string(),
            coordinates: HUB_A,
            category: TradeCategory::General,
            color: "emerald".to_string(),
        },
        Hub {
            id: HubId::new("HUB-B"),
            name: "Bravo".to_string(),
            coordinates: HUB_B,
            category: TradeCategory::Plumbing,
            color: "amber".to_string(),
        },
    ])
    .unwrap()
}

fn charged(id: &str, hub: &str, position: Coordinates) -> Drone {
    Drone::new(DroneId::new(id), id, HubId::new(hub), position, 100.0, 15)
}

fn order(hub: &str, destination: Coordinates) -> DeliveryOrder {
    DeliveryOrder {
        id: OrderId::random(),
        hub_id: HubId::new(hub),
        recipient: "Brendan (Carpentry)".to_string(),
        location_name: "Ashtown Gate Lodge".to_string(),
        location_type: LocationType::KnownPad,
        item: "Expansion Vessel (5L)".to_string(),
        category: TradeCategory::Plumbing,
        weight_kg: 2.5,
        destination,
        status: OrderStatus::Pending,
    }
}

fn store_with(hubs: HubRegistry, drones: Vec<Drone>) -> FleetStore {
    FleetStore::new(hubs, drones, FlightProfile::default(), DispatchPolicy::default())
}

#[test]
fn test_one_assignment_per_cycle() {
    let drones = vec![
        charged("D1", "HUB-A", HUB_A),
        charged("D2", "HUB-A", HUB_A),
        charged("D3", "HUB-A", HUB_A),
    ];
    let mut store = store_with(two_hubs(), drones);
    for i in 1..=4 {
        store
            .submit_order(order("HUB-A", HUB_A.offset(0.002 * f64::from(i), 0.0)))
            .unwrap();
    }

    let mut assigned_drones = Vec::new();
    let mut assigned_orders = Vec::new();
    for _ in 0..3 {
        let action = store.evaluate().unwrap();
        let DispatchAction::Assign { drone, order } = action.clone() else {
            panic!("expected an assignment, got {action:?}");
        };
        store.apply(&action).unwrap();
        assert!(!assigned_drones.contains(&drone));
        assert!(!assigned_orders.contains(&order));
        assigned_drones.push(drone);
        assigned_orders.push(order);
    }

    assert_eq!(store.pending().len(), 1);
    assert_eq!(store.evaluate(), None);
}

#[test]
fn test_out_of_radius_order_left_pending() {
    let hubs = HubRegistry::new(vec![Hub {
        id: HubId::new("HUB-A"),
        name: "Alpha".to_string(),
        coordinates: HUB_A,
        category: TradeCategory::General,
        color: "emerald".to_string(),
    }])
    .unwrap();
    let mut store = store_with(hubs, vec![charged("D1", "HUB-A", HUB_A)]);

    // ~6 km east of the hub
    let far = order("HUB-A", HUB_A.offset(0.0, 0.0903));
    let km = HUB_A.distance_to_km(&far.destination);
    assert!((5.9..6.1).contains(&km), "{km}");
    store.submit_order(far).unwrap();

    assert_eq!(store.evaluate(), None);
    assert!(store.settle().is_empty());
    assert_eq!(store.pending().len(), 1);
}

#[test]
fn test_idle_drone_rebalances_to_hub_with_demand() {
    let mut store = store_with(two_hubs(), vec![charged("D1", "HUB-A", HUB_A)]);
    store.submit_order(order("HUB-B", HUB_B.offset(0.01, 0.0))).unwrap();

    assert_eq!(
        store.evaluate(),
        Some(DispatchAction::Reposition {
            drone: DroneId::new("D1"),
            hub: HubId::new("HUB-B"),
        })
    );

    // After the transfer lands the drone serves the order locally
    let mut rng = StdRng::seed_from_u64(21);
    store.settle();
    let mut ticks = 0;
    while store.pending().len() == 1 {
        store.advance(0.2, Utc::now(), &mut rng);
        store.settle();
        ticks += 1;
        assert!(ticks < 10_000, "order never picked up");
    }

    let drone = store.drone(&DroneId::new("D1")).unwrap();
    assert_eq!(drone.current_hub_id, HubId::new("HUB-B"));
    assert_eq!(drone.status(), FlightPhase::TakingOff);
    assert!(drone.invariants_hold());
}

#[test]
fn test_exact_arrival_is_delivering_next_tick() {
    let hubs = two_hubs();
    let profile = FlightProfile::default();
    let destination = HUB_A.offset(0.000_02, 0.0);

    let mut drone = charged("D1", "HUB-A", HUB_A);
    let mut carried = order("HUB-A", destination);
    carried.status = OrderStatus::InTransit;
    drone.active_order = Some(carried);
    drone.telemetry.status = FlightPhase::EnRouteToSite;

    // Choose the tick so one step covers exactly the remaining distance
    let remaining = HUB_A.distance_to_km(&destination);
    let mut tick_seconds = remaining / profile.cruise_speed_kmh * 3600.0;
    while step_distance_km(profile.cruise_speed_kmh, tick_seconds) < remaining {
        tick_seconds += tick_seconds * f64::EPSILON;
    }

    let ctx = TickContext {
        hubs: &hubs,
        profile: &profile,
        tick_seconds,
        now: Utc::now(),
    };
    let mut rng = StdRng::seed_from_u64(0);
    let next = advance_drone(&drone, &ctx, &mut rng).drone;

    assert_eq!(next.status(), FlightPhase::Delivering);
    assert_eq!(next.position, destination);
}

#[test]
fn test_long_run_keeps_invariants_and_accounts_for_orders() {
    let hubs = dublin_hubs().unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let drones = seed_fleet(&hubs, 2, &mut rng);
    let generator = OrderGenerator::new(DispatchPolicy::default().max_delivery_radius_km);
    let mut store = store_with(hubs, drones);

    let mut submitted = 0_u64;
    for tick in 0..20_000_u32 {
        if tick % 8 == 0 && store.pending().len() < 10 {
            let order = generator.generate(store.hubs(), &mut rng).unwrap();
            store.submit_order(order).unwrap();
            submitted += 1;
        }
        store.settle();
        store.advance(0.2, Utc::now(), &mut rng);

        for drone in store.drones() {
            assert!(drone.invariants_hold(), "tick {tick}: {drone:?}");
        }
    }

    let in_flight = store
        .drones()
        .iter()
        .filter(|d| d.active_order.is_some())
        .count() as u64;
    let pending = store.pending().len() as u64;

    assert!(store.delivered_count() > 0);
    assert_eq!(submitted, pending + in_flight + store.delivered_count());
    assert_eq!(store.tick(), 20_000);
}
