//! # Simulation Configuration
//!
//! Flight profile, dispatch policy and driver settings. Defaults carry the
//! reference constants; `from_env` lets `FLEET_*` variables override them.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("hover altitude {hover_m}m must be below cruise altitude {cruise_m}m")]
    HoverAboveCruise { hover_m: f64, cruise_m: f64 },

    #[error("delivery timings must satisfy descend < hold <= dwell (got {descend}/{hold}/{dwell})")]
    DeliveryTimings { descend: u32, hold: u32, dwell: u32 },

    #[error("probability {field} must lie in [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },
}

/// Per-phase kinematic and power constants
#[derive(Debug, Clone, PartialEq)]
pub struct FlightProfile {
    pub cruise_speed_kmh: f64,
    /// Unladen hub-to-hub transfers fly faster than cruise
    pub reposition_speed_kmh: f64,
    pub cruise_altitude_m: f64,
    /// Extra altitude above cruise on the return leg
    pub return_altitude_offset_m: f64,
    /// Extra altitude above cruise while repositioning
    pub reposition_altitude_offset_m: f64,
    /// Amplitude of the cosmetic en-route altitude wobble
    pub cruise_wobble_m: f64,
    pub climb_rate_m_per_tick: f64,
    pub landing_rate_m_per_tick: f64,
    pub battery_drain_per_tick: f64,
    pub battery_recharge_per_tick: f64,
    pub hover_altitude_m: f64,
    pub delivery_vertical_rate_m_per_tick: f64,
    /// Descend while the phase timer is below this
    pub delivery_descend_ticks: u32,
    /// Hold hover while the phase timer is below this
    pub delivery_hold_ticks: u32,
    /// Order is handed over once the phase timer exceeds this
    pub delivery_dwell_ticks: u32,
    pub history_every_ticks: u32,
    pub history_capacity: usize,
    /// Half-width of the uniform signal noise band
    pub signal_noise_pct: f64,
    pub signal_loss_pct_per_km: f64,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            cruise_speed_kmh: 50.0,
            reposition_speed_kmh: 60.0,
            cruise_altitude_m: 60.0,
            return_altitude_offset_m: 10.0,
            reposition_altitude_offset_m: 20.0,
            cruise_wobble_m: 2.0,
            climb_rate_m_per_tick: 3.5,
            landing_rate_m_per_tick: 3.0,
            battery_drain_per_tick: 0.025,
            battery_recharge_per_tick: 0.5,
            hover_altitude_m: 5.0,
            delivery_vertical_rate_m_per_tick: 4.0,
            delivery_descend_ticks: 15,
            delivery_hold_ticks: 35,
            delivery_dwell_ticks: 50,
            history_every_ticks: 5,
            history_capacity: 20,
            signal_noise_pct: 3.0,
            signal_loss_pct_per_km: 2.0,
        }
    }
}

/// Scheduler policy
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPolicy {
    /// Maximum hub-to-destination distance for a local assignment
    pub max_delivery_radius_km: f64,
    /// Battery a drone needs before it may take any mission
    pub required_battery_pct: f64,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_delivery_radius_km: 5.1,
            required_battery_pct: 100.0,
        }
    }
}

/// Clock and order intake settings for the simulation driver
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub tick_ms: u64,
    pub order_interval_ms: u64,
    pub order_probability: f64,
    pub max_pending_orders: usize,
    pub drones_per_hub: usize,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Log a fleet summary every this many ticks (0 disables)
    pub report_every_ticks: u64,
    /// Stop after this many ticks (`None` runs until Ctrl+C)
    pub max_ticks: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            order_interval_ms: 1500,
            order_probability: 0.5,
            max_pending_orders: 10,
            drones_per_hub: 2,
            seed: None,
            report_every_ticks: 25,
            max_ticks: None,
        }
    }
}

impl DriverConfig {
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Simulated seconds covered by one tick
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tick_seconds(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }

    #[must_use]
    pub const fn order_period(&self) -> Duration {
        Duration::from_millis(self.order_interval_ms)
    }
}

/// Full simulator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub flight: FlightProfile,
    pub dispatch: DispatchPolicy,
    pub driver: DriverConfig,
    pub log_level: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            flight: FlightProfile::default(),
            dispatch: DispatchPolicy::default(),
            driver: DriverConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl SimConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from a `FLEET_*` key lookup. Missing or
    /// unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var_or = |key: &str, default| parse_or(lookup(key), default);
        let flight = FlightProfile::default();
        let dispatch = DispatchPolicy::default();
        let driver = DriverConfig::default();

        Self {
            flight: FlightProfile {
                cruise_speed_kmh: var_or("FLEET_CRUISE_SPEED_KMH", flight.cruise_speed_kmh),
                reposition_speed_kmh: var_or(
                    "FLEET_REPOSITION_SPEED_KMH",
                    flight.reposition_speed_kmh,
                ),
                cruise_altitude_m: var_or("FLEET_CRUISE_ALTITUDE_M", flight.cruise_altitude_m),
                battery_drain_per_tick: var_or(
                    "FLEET_BATTERY_DRAIN_PER_TICK",
                    flight.battery_drain_per_tick,
                ),
                battery_recharge_per_tick: var_or(
                    "FLEET_BATTERY_RECHARGE_PER_TICK",
                    flight.battery_recharge_per_tick,
                ),
                ..flight
            },

            dispatch: DispatchPolicy {
                max_delivery_radius_km: var_or(
                    "FLEET_MAX_DELIVERY_RADIUS_KM",
                    dispatch.max_delivery_radius_km,
                ),
                ..dispatch
            },

            driver: DriverConfig {
                tick_ms: parse_or(lookup("FLEET_TICK_MS"), driver.tick_ms),
                order_interval_ms: parse_or(
                    lookup("FLEET_ORDER_INTERVAL_MS"),
                    driver.order_interval_ms,
                ),
                order_probability: var_or("FLEET_ORDER_PROBABILITY", driver.order_probability),
                max_pending_orders: parse_or(
                    lookup("FLEET_MAX_PENDING_ORDERS"),
                    driver.max_pending_orders,
                ),
                drones_per_hub: parse_or(lookup("FLEET_DRONES_PER_HUB"), driver.drones_per_hub),
                seed: lookup("FLEET_SEED").and_then(|v| v.parse().ok()),
                ..driver
            },

            log_level: lookup("FLEET_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Reject settings the simulation cannot run with.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.flight;
        for (field, value) in [
            ("cruise_speed_kmh", f.cruise_speed_kmh),
            ("reposition_speed_kmh", f.reposition_speed_kmh),
            ("cruise_altitude_m", f.cruise_altitude_m),
            ("climb_rate_m_per_tick", f.climb_rate_m_per_tick),
            ("landing_rate_m_per_tick", f.landing_rate_m_per_tick),
            ("battery_drain_per_tick", f.battery_drain_per_tick),
            ("battery_recharge_per_tick", f.battery_recharge_per_tick),
            ("delivery_vertical_rate_m_per_tick", f.delivery_vertical_rate_m_per_tick),
            ("history_every_ticks", f64::from(f.history_every_ticks)),
            ("max_delivery_radius_km", self.dispatch.max_delivery_radius_km),
            ("tick_ms", self.driver.tick_ms as f64),
            ("order_interval_ms", self.driver.order_interval_ms as f64),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if f.hover_altitude_m >= f.cruise_altitude_m {
            return Err(ConfigError::HoverAboveCruise {
                hover_m: f.hover_altitude_m,
                cruise_m: f.cruise_altitude_m,
            });
        }

        if f.delivery_descend_ticks >= f.delivery_hold_ticks
            || f.delivery_hold_ticks > f.delivery_dwell_ticks
        {
            return Err(ConfigError::DeliveryTimings {
                descend: f.delivery_descend_ticks,
                hold: f.delivery_hold_ticks,
                dwell: f.delivery_dwell_ticks,
            });
        }

        if !(0.0..=1.0).contains(&self.driver.order_probability) {
            return Err(ConfigError::Probability {
                field: "order_probability",
                value: self.driver.order_probability,
            });
        }

        Ok(())
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
