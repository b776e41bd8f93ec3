//! # Fleet Simulator
//!
//! Dispatch scheduler and flight-state engine for a multi-hub delivery drone
//! fleet.
//!
//! ## Features
//!
//! - Great-circle motion with snap-to-target arrival
//! - Per-drone flight-phase state machine on a fixed tick
//! - Single-action dispatch cycles with hub rebalancing
//! - ETA estimates for any drone's current objective
//! - Tokio driver with order intake, event sinks and graceful shutdown

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod eta;
pub mod events;
pub mod fleet;
pub mod flight;
pub mod motion;
pub mod orders;
pub mod scenario;

pub use config::{ConfigError, DispatchPolicy, DriverConfig, FlightProfile, SimConfig};
pub use dispatch::DispatchAction;
pub use driver::{DriverError, SharedFleet, Simulation};
pub use eta::Eta;
pub use events::{EventLog, EventSink, FanOut, FleetEvent, TracingSink};
pub use fleet::{FleetSnapshot, FleetStore};
pub use orders::OrderGenerator;
