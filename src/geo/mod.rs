use crate::models::position::Position;

/// Distance units per hour assumed for every vehicle.
pub const AVERAGE_SPEED: f64 = 55.0;

const MINUTES_PER_HOUR: f64 = 60.0;

pub fn euclidean(a: &Position, b: &Position) -> f64 {
    let dx = f64::from(b.x) - f64::from(a.x);
    let dy = f64::from(b.y) - f64::from(a.y);
    dx.hypot(dy)
}

/// Number of diagonal grid steps between two points.
pub fn chebyshev(a: &Position, b: &Position) -> u32 {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

pub fn eta_minutes(distance: f64, speed: f64) -> u32 {
    (distance.max(0.0) / speed * MINUTES_PER_HOUR).round() as u32
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
