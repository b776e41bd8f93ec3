//! One-tick motion integration along a great-circle leg.

use fleet_domain::{geodesy, Coordinates};

/// Outcome of a single integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Position after the step
    pub position: Coordinates,
    /// Bearing toward the requested target, used as the tick's heading
    pub heading_deg: f64,
    /// Distance left to the target after the step
    pub remaining_km: f64,
    /// The target was reached this tick
    pub reached: bool,
}

/// Distance covered in one tick at `speed_kmh`.
#[must_use]
pub fn step_distance_km(speed_kmh: f64, tick_seconds: f64) -> f64 {
    speed_kmh / 3600.0 * tick_seconds
}

/// Advance `current` toward `target` by one tick.
///
/// When the remaining distance fits inside one tick the target is returned
/// exactly, so a drone never overshoots or oscillates around its goal.
/// Otherwise latitude and longitude are interpolated linearly, which is
/// accurate enough at per-tick distances of a few metres.
#[must_use]
pub fn step(current: Coordinates, target: Coordinates, speed_kmh: f64, tick_seconds: f64) -> Step {
    let remaining = geodesy::distance_km(current, target);
    let travel = step_distance_km(speed_kmh, tick_seconds);
    let heading_deg = geodesy::bearing_degrees(current, target);

    if remaining <= travel {
        return Step {
            position: target,
            heading_deg,
            remaining_km: 0.0,
            reached: true,
        };
    }

    let ratio = travel / remaining;
    let position = Coordinates::new(
        current.latitude + (target.latitude - current.latitude) * ratio,
        current.longitude + (target.longitude - current.longitude) * ratio,
    );

    Step {
        position,
        heading_deg,
        remaining_km: remaining - travel,
        reached: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUB: Coordinates = Coordinates::new(53.372_381, -6.284_498);

    #[test]
    fn test_step_distance() {
        // 50 km/h over 0.2 s is just under 2.78 m
        let d = step_distance_km(50.0, 0.2);
        assert!((d - 0.002_777_8).abs() < 1e-6);
    }

    #[test]
    fn test_step_snaps_to_target_when_close() {
        let target = HUB.offset(0.000_01, 0.0);
        let result = step(HUB, target, 50.0, 0.2);
        assert!(result.reached);
        assert_eq!(result.position, target);
        assert_eq!(result.remaining_km, 0.0);
    }

    #[test]
    fn test_step_at_target_is_reached() {
        let result = step(HUB, HUB, 50.0, 0.2);
        assert!(result.reached);
        assert_eq!(result.position, HUB);
    }

    #[test]
    fn test_step_moves_toward_target() {
        let target = HUB.offset(0.01, 0.0);
        let before = HUB.distance_to_km(&target);
        let result = step(HUB, target, 50.0, 0.2);

        assert!(!result.reached);
        let after = result.position.distance_to_km(&target);
        assert!((before - after - step_distance_km(50.0, 0.2)).abs() < 1e-6);
        assert!((result.remaining_km - after).abs() < 1e-6);
        assert!(result.heading_deg.abs() < 1e-6, "due north");
    }

    #[test]
    fn test_exactly_one_partial_step_before_arrival() {
        let travel = step_distance_km(50.0, 0.2);
        // Put the target 1.5 tick-lengths due east of the hub
        let sample = HUB.offset(0.0, 0.001);
        let deg_per_km = 0.001 / HUB.distance_to_km(&sample);
        let target = HUB.offset(0.0, 1.5 * travel * deg_per_km);

        let first = step(HUB, target, 50.0, 0.2);
        assert!(!first.reached);
        assert!(first.remaining_km <= travel);

        let second = step(first.position, target, 50.0, 0.2);
        assert!(second.reached);
        assert_eq!(second.position, target);
        assert!((second.heading_deg - 90.0).abs() < 0.1);
    }

    #[test]
    fn test_heading_reported_on_arrival() {
        let target = HUB.offset(-0.000_005, 0.0);
        let result = step(HUB, target, 50.0, 0.2);
        assert!(result.reached);
        assert!((result.heading_deg - 180.0).abs() < 1e-6);
    }
}
