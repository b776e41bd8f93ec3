//! # Drone Delivery Fleet - Domain Model
//!
//! Core value objects, entities, and enums for a multi-hub delivery drone
//! fleet. These types are shared by the flight simulation, the dispatch
//! scheduler, and any presentation layer reading fleet snapshots.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod geodesy;

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self {
            latitude: lat,
            longitude: lon,
        }
    }

    /// Build coordinates, rejecting values outside the valid lat/lon ranges.
    pub fn try_new(lat: f64, lon: f64) -> Result<Self, DomainError> {
        let coords = Self::new(lat, lon);
        if coords.is_valid() {
            Ok(coords)
        } else {
            Err(DomainError::InvalidCoordinates { lat, lon })
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Calculate great-circle distance to another point
    #[must_use]
    pub fn distance_to_km(&self, other: &Self) -> f64 {
        geodesy::distance_km(*self, *other)
    }

    /// Initial bearing toward another point, in `[0, 360)`
    #[must_use]
    pub fn bearing_to_deg(&self, other: &Self) -> f64 {
        geodesy::bearing_degrees(*self, *other)
    }

    /// Shift by raw degree offsets (parking slots, generated addresses)
    #[must_use]
    pub fn offset(&self, delta_lat: f64, delta_lon: f64) -> Self {
        Self::new(self.latitude + delta_lat, self.longitude + delta_lon)
    }
}

/// Hub identifier, e.g. `HUB-GLASNEVIN`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HubId(String);

impl HubId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drone identifier, e.g. `FP-G0-100`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DroneId(String);

impl DroneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is plenty for log lines
        let simple = self.0.simple().to_string();
        write!(f, "ORD-{}", &simple[..8])
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Trade category a hub stocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeCategory {
    General,
    Electrical,
    Plumbing,
}

impl TradeCategory {
    pub const ALL: [Self; 3] = [Self::General, Self::Electrical, Self::Plumbing];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Electrical => "ELECTRICAL",
            Self::Plumbing => "PLUMBING",
        }
    }

    /// Single-letter code used in drone identifiers
    #[must_use]
    pub const fn initial(&self) -> char {
        match self {
            Self::General => 'G',
            Self::Electrical => 'E',
            Self::Plumbing => 'P',
        }
    }
}

/// Kind of drop-off location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    /// Surveyed landing pad
    KnownPad,
    /// Ad-hoc site (street address, work site)
    DynamicSite,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    InTransit,
    Delivered,
}

/// Drone flight phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightPhase {
    #[default]
    IdleAtBase,
    TakingOff,
    EnRouteToSite,
    Delivering,
    ReturningToBase,
    Repositioning,
    Landing,
}

impl FlightPhase {
    pub const ALL: [Self; 7] = [
        Self::IdleAtBase,
        Self::TakingOff,
        Self::EnRouteToSite,
        Self::Delivering,
        Self::ReturningToBase,
        Self::Repositioning,
        Self::Landing,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IdleAtBase => "IDLE_AT_BASE",
            Self::TakingOff => "TAKING_OFF",
            Self::EnRouteToSite => "EN_ROUTE_TO_SITE",
            Self::Delivering => "DELIVERING",
            Self::ReturningToBase => "RETURNING_TO_BASE",
            Self::Repositioning => "REPOSITIONING",
            Self::Landing => "LANDING",
        }
    }

    /// Phases during which a drone may hold an active order
    #[must_use]
    pub const fn carries_order(&self) -> bool {
        matches!(self, Self::TakingOff | Self::EnRouteToSite | Self::Delivering)
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Supply hub - static reference data, a drone's home base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub id: HubId,
    pub name: String,
    pub coordinates: Coordinates,
    pub category: TradeCategory,
    /// Display colour tag, no behavioural meaning
    pub color: String,
}

/// Delivery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub id: OrderId,
    /// Hub stocking the item; fixed at creation
    pub hub_id: HubId,
    pub recipient: String,
    pub location_name: String,
    pub location_type: LocationType,
    pub item: String,
    pub category: TradeCategory,
    pub weight_kg: f64,
    pub destination: Coordinates,
    pub status: OrderStatus,
}

impl DeliveryOrder {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// Live telemetry block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneTelemetry {
    pub altitude_m: f64,
    pub speed_kmh: f64,
    /// Percentage, always within `[0, 100]`
    pub battery_pct: f64,
    pub heading_deg: f64,
    pub signal_pct: u8,
    pub satellites: u8,
    pub status: FlightPhase,
}

/// Sparse altitude/speed history sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub recorded_at: DateTime<Utc>,
    pub altitude_m: f64,
    pub speed_kmh: f64,
}

/// Delivery drone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: DroneId,
    pub label: String,

    // Basing
    pub current_hub_id: HubId,
    pub target_hub_id: Option<HubId>,

    // Current state
    pub position: Coordinates,
    pub phase_ticks: u32,
    pub active_order: Option<DeliveryOrder>,
    pub telemetry: DroneTelemetry,
    pub history: VecDeque<HistorySample>,
}

impl Drone {
    /// Create a grounded, idle drone parked at `position`.
    pub fn new(
        id: DroneId,
        label: impl Into<String>,
        home: HubId,
        position: Coordinates,
        battery_pct: f64,
        satellites: u8,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            current_hub_id: home,
            target_hub_id: None,
            position,
            phase_ticks: 0,
            active_order: None,
            telemetry: DroneTelemetry {
                altitude_m: 0.0,
                speed_kmh: 0.0,
                battery_pct: battery_pct.clamp(0.0, 100.0),
                heading_deg: 0.0,
                signal_pct: 100,
                satellites,
                status: FlightPhase::IdleAtBase,
            },
            history: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> FlightPhase {
        self.telemetry.status
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.telemetry.status == FlightPhase::IdleAtBase
    }

    /// Check the structural invariants tying orders, targets and battery to
    /// the flight phase.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let battery_ok = (0.0..=100.0).contains(&self.telemetry.battery_pct);
        let order_ok = self.active_order.is_none() || self.telemetry.status.carries_order();
        let target_ok =
            self.target_hub_id.is_some() == (self.telemetry.status == FlightPhase::Repositioning);
        battery_ok && order_ok && target_ok
    }
}

// =============================================================================
// HUB REGISTRY
// =============================================================================

/// Read-only hub table in definition order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubRegistry {
    hubs: Vec<Hub>,
}

impl HubRegistry {
    /// Build a registry, rejecting duplicate hub ids.
    pub fn new(hubs: Vec<Hub>) -> Result<Self, DomainError> {
        for (i, hub) in hubs.iter().enumerate() {
            if hubs[..i].iter().any(|h| h.id == hub.id) {
                return Err(DomainError::DuplicateHub(hub.id.clone()));
            }
        }
        Ok(Self { hubs })
    }

    #[must_use]
    pub fn get(&self, id: &HubId) -> Option<&Hub> {
        self.hubs.iter().find(|h| &h.id == id)
    }

    /// Look up a hub, failing with [`DomainError::UnknownHub`].
    pub fn require(&self, id: &HubId) -> Result<&Hub, DomainError> {
        self.get(id).ok_or_else(|| DomainError::UnknownHub(id.clone()))
    }

    #[must_use]
    pub fn contains(&self, id: &HubId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hub> {
        self.hubs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Unknown hub: {0}")]
    UnknownHub(HubId),

    #[error("Unknown drone: {0}")]
    UnknownDrone(DroneId),

    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),

    #[error("Drone {drone} is busy ({phase})")]
    DroneBusy { drone: DroneId, phase: FlightPhase },

    #[error("Drone {drone} is already stationed at {hub}")]
    AlreadyStationed { drone: DroneId, hub: HubId },

    #[error("Order {order} is stocked at {order_hub}, drone is based at {drone_hub}")]
    HubMismatch {
        order: OrderId,
        order_hub: HubId,
        drone_hub: HubId,
    },

    #[error("Order {order} is not pending ({status:?})")]
    OrderNotPending { order: OrderId, status: OrderStatus },

    #[error("Duplicate order: {0}")]
    DuplicateOrder(OrderId),

    #[error("Duplicate hub: {0}")]
    DuplicateHub(HubId),

    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}
