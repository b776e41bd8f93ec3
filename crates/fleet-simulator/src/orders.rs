//! Synthetic order source feeding the pending pool.

use fleet_domain::{
    Coordinates, DeliveryOrder, Hub, HubRegistry, LocationType, OrderId, OrderStatus,
    TradeCategory,
};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, UnitDisc};

/// Catalogue entry
#[derive(Debug, Clone, Copy)]
pub struct CatalogItem {
    pub name: &'static str,
    pub weight_kg: f64,
    pub category: TradeCategory,
}

/// Surveyed drop-off pad
#[derive(Debug, Clone, Copy)]
pub struct KnownSite {
    pub name: &'static str,
    pub coordinates: Coordinates,
}

const fn item(name: &'static str, weight_kg: f64, category: TradeCategory) -> CatalogItem {
    CatalogItem {
        name,
        weight_kg,
        category,
    }
}

const fn site(name: &'static str, lat: f64, lon: f64) -> KnownSite {
    KnownSite {
        name,
        coordinates: Coordinates::new(lat, lon),
    }
}

pub const CATALOG: &[CatalogItem] = &[
    item("Wago Connectors (100pk)", 0.4, TradeCategory::Electrical),
    item("Fuse Board Module (32A)", 0.2, TradeCategory::Electrical),
    item("Smoke Alarm Battery (9V)", 0.1, TradeCategory::Electrical),
    item("Cat6 Cable Reel (305m)", 12.0, TradeCategory::Electrical),
    item("LED Downlight Kit", 0.8, TradeCategory::Electrical),
    item("15mm Copper Elbows (20)", 0.8, TradeCategory::Plumbing),
    item("Plumber's Mate Putty", 0.5, TradeCategory::Plumbing),
    item("PVC Solvent Weld", 0.3, TradeCategory::Plumbing),
    item("Expansion Vessel (5L)", 2.5, TradeCategory::Plumbing),
    item("Radiator Valve Set", 0.6, TradeCategory::Plumbing),
    item("Silicone Sealant (Clear)", 0.3, TradeCategory::General),
    item("M12 Masonry Drill Bit", 0.1, TradeCategory::General),
    item("Angle Grinder Disc (Metal)", 0.2, TradeCategory::General),
    item("Teflon Tape (10 rolls)", 0.1, TradeCategory::General),
    item("Wood Screws (500pk)", 1.2, TradeCategory::General),
];

pub const RECIPIENTS: &[&str] = &[
    "Mick (Sparks)",
    "John (Plumbing)",
    "Pat (Site Foreman)",
    "Dermo (HVAC)",
    "Sarah (Elec)",
    "Brendan (Carpentry)",
    "Fix-It Felix",
    "Mario (Plumbing)",
];

pub const STREETS: &[&str] = &[
    "Willow Park Rd",
    "Sycamore Rd",
    "Griffith Ave",
    "Mobhi Rd",
    "Ballymun Rd",
    "Botanic Rd",
    "Finglas Rd",
    "Old Cabra Rd",
    "Navan Rd",
    "Oscar Traynor Rd",
    "Malahide Rd",
];

pub const KNOWN_SITES: &[KnownSite] = &[
    site("Ballymun Civic Ctr", 53.3950, -6.2600),
    site("DCU Campus Maint.", 53.3850, -6.2570),
    site("Whitehall Traffic Corps", 53.3820, -6.2350),
    site("Griffith Ave Works", 53.3750, -6.2400),
    site("Fairview Park Site", 53.3650, -6.2350),
    site("Croke Park Maint.", 53.3600, -6.2500),
    site("Tolka Park Lights", 53.3670, -6.2520),
    site("Mater Hospital Works", 53.3580, -6.2650),
    site("Phibsboro Shopping Ctr", 53.3590, -6.2750),
    site("Stoneybatter Reno", 53.3550, -6.2850),
    site("Glasnevin Cemetery", 53.3700, -6.2780),
    site("Botanic Gardens Reno", 53.3720, -6.2700),
    site("Ashtown Gate Lodge", 53.3700, -6.3100),
    site("Finglas Village Site", 53.3850, -6.3000),
    site("Johnstown Park", 53.3780, -6.2950),
    site("Beaumont Hospital", 53.3900, -6.2100),
    site("Santry Stadium", 53.4000, -6.2400),
];

/// Kilometres per degree of latitude on the haversine sphere
const KM_PER_DEG_LAT: f64 = 111.195;

/// Random order source.
///
/// Known pads are picked from a fixed list and may lie outside the delivery
/// radius; street addresses are drawn uniformly inside it.
#[derive(Debug, Clone)]
pub struct OrderGenerator {
    max_radius_km: f64,
    /// Safety margin kept inside the radius for street addresses
    margin_km: f64,
}

impl OrderGenerator {
    #[must_use]
    pub const fn new(max_radius_km: f64) -> Self {
        Self {
            max_radius_km,
            margin_km: 0.5,
        }
    }

    /// Produce one pending order, or `None` when there are no hubs.
    pub fn generate<R: Rng>(&self, hubs: &HubRegistry, rng: &mut R) -> Option<DeliveryOrder> {
        let item = CATALOG.choose(rng)?;
        let recipient = RECIPIENTS.choose(rng).copied().unwrap_or("Site Office");

        // Stocked by the hub trading in the item's category
        let hub = hubs
            .iter()
            .find(|h| h.category == item.category)
            .or_else(|| hubs.iter().next())?;

        let (location_name, location_type, destination) = if rng.gen_bool(0.5) {
            let site = KNOWN_SITES.choose(rng)?;
            (site.name.to_string(), LocationType::KnownPad, site.coordinates)
        } else {
            let street = STREETS.choose(rng)?;
            let number: u32 = rng.gen_range(1..=150);
            (
                format!("{number} {street}"),
                LocationType::DynamicSite,
                self.street_address_near(hub, rng),
            )
        };

        Some(DeliveryOrder {
            id: OrderId::random(),
            hub_id: hub.id.clone(),
            recipient: recipient.to_string(),
            location_name,
            location_type,
            item: item.name.to_string(),
            category: item.category,
            weight_kg: item.weight_kg,
            destination,
            status: OrderStatus::Pending,
        })
    }

    /// Uniform point inside the reduced delivery disc around `hub`.
    fn street_address_near<R: Rng>(&self, hub: &Hub, rng: &mut R) -> Coordinates {
        let radius_km = (self.max_radius_km - self.margin_km).max(0.0);
        let [x, y]: [f64; 2] = UnitDisc.sample(rng);

        let radius_deg_lat = radius_km / KM_PER_DEG_LAT;
        let lon_scale = 1.0 / hub.coordinates.latitude.to_radians().cos().max(1e-6);

        hub.coordinates
            .offset(radius_deg_lat * x, radius_deg_lat * y * lon_scale)
    }
}
