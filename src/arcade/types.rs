//! Core shared types for `arcade` (engine-agnostic).
// arcade/types.rs
use nalgebra::Vector2;

pub type Vec2 = Vector2<f32>;

/// Lowest selectable gear. -1 is reverse, 0 is neutral.
pub const MIN_GEAR: i32 = -1;

/// Highest `max_gear` a model accepts.
pub const MAX_GEAR_LIMIT: i32 = 64;

// ----- heading helpers -----
// Headings are degrees, counter-clockwise, 0 = +Y ("up" on the track).
#[inline]
pub fn forward(heading: f32) -> Vec2 {
    let (s, c) = heading.to_radians().sin_cos();
    Vec2::new(-s, c)
}

#[inline]
pub fn right(heading: f32) -> Vec2 {
    let (s, c) = heading.to_radians().sin_cos();
    Vec2::new(c, s)
}

/// Wraps a heading into (-180, 180].
#[inline]
pub fn wrap_degrees(heading: f32) -> f32 {
    let h = heading.rem_euclid(360.0);
    if h > 180.0 { h - 360.0 } else { h }
}

/// Moves `current` toward `target` by at most `max_delta` without overshooting.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

/// Rescales `v` so its length does not exceed `max`.
#[inline]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    let m = v.norm();
    if m > max && m > 1e-6 { v * (max / m) } else { v }
}

#[inline]
fn axis(v: f32, min: f32) -> f32 {
    if v.is_finite() { v.clamp(min, 1.0) } else { 0.0 }
}

// ============================================
// ----- control frame (one per tick) ---------
// ============================================

/// Normalized control signals for a single simulation tick.
/// Gear shift fields are edges, not held states.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlFrame {
    pub throttle: f32,   // -1..1
    pub steer: f32,      // -1 (left) .. 1 (right)
    pub handbrake: bool,
    pub clutch: bool,
    pub brake: bool,     // dedicated brake/back key
    pub gear_up: bool,   // edge
    pub gear_down: bool, // edge
}

impl ControlFrame {
    /// Clamps axes into range; non-finite values become 0.
    pub fn normalized(mut self) -> Self {
        self.throttle = axis(self.throttle, -1.0);
        self.steer = axis(self.steer, -1.0);
        self
    }

    #[cfg(test)]
    pub fn with_throttle(mut self, throttle: f32) -> Self {
        self.throttle = throttle;
        self
    }

    #[cfg(test)]
    pub fn with_steer(mut self, steer: f32) -> Self {
        self.steer = steer;
        self
    }
}

// ============================================
// ----- vehicle state ------------------------
// ============================================

/// Per-vehicle simulation state. Only the model step mutates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub position: Vec2,
    pub heading: f32,   // degrees
    pub velocity: Vec2, // drift model; kinematic mirrors forward * speed
    pub speed: f32,     // kinematic model, signed (negative = reverse)
    pub gear: i32,      // MIN_GEAR ..= max_gear
}

impl VehicleState {
    pub fn new(position: Vec2, heading: f32, gear: i32) -> Self {
        Self {
            position,
            heading,
            velocity: Vec2::zeros(),
            speed: 0.0,
            gear,
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        forward(self.heading)
    }

    #[inline]
    pub fn right(&self) -> Vec2 {
        right(self.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn basis_is_orthonormal_and_up_at_zero() {
        let f = forward(0.0);
        assert!((f - Vec2::new(0.0, 1.0)).norm() < EPS);
        let r = right(0.0);
        assert!((r - Vec2::new(1.0, 0.0)).norm() < EPS);

        for h in [-135.0_f32, -30.0, 45.0, 90.0, 170.0] {
            assert!(forward(h).dot(&right(h)).abs() < EPS);
            assert!((forward(h).norm() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn positive_heading_turns_left() {
        // +90 degrees counter-clockwise from +Y faces -X
        assert!((forward(90.0) - Vec2::new(-1.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn move_towards_never_overshoots() {
        assert_eq!(move_towards(0.05, 0.0, 0.1), 0.0);
        assert_eq!(move_towards(-0.05, 0.0, 0.1), 0.0);
        assert!((move_towards(1.0, 0.0, 0.25) - 0.75).abs() < EPS);
        assert!((move_towards(-1.0, 0.0, 0.25) + 0.75).abs() < EPS);
    }

    #[test]
    fn wrap_keeps_range() {
        assert!((wrap_degrees(190.0) + 170.0).abs() < 1e-3);
        assert!((wrap_degrees(-190.0) - 170.0).abs() < 1e-3);
        assert!((wrap_degrees(720.0)).abs() < 1e-3);
    }

    #[test]
    fn normalized_clamps_and_drops_nan() {
        let c = ControlFrame::default()
            .with_throttle(3.0)
            .with_steer(f32::NAN)
            .normalized();
        assert_eq!(c.throttle, 1.0);
        assert_eq!(c.steer, 0.0);
    }

    #[test]
    fn clamp_magnitude_keeps_direction() {
        let v = clamp_magnitude(Vec2::new(3.0, 4.0), 2.5);
        assert!((v.norm() - 2.5).abs() < EPS);
        assert!((v.x / v.y - 0.75).abs() < EPS);
        assert_eq!(clamp_magnitude(Vec2::new(1.0, 0.0), 2.0), Vec2::new(1.0, 0.0));
    }
}
