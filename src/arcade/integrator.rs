use crate::arcade::types::{Vec2, move_towards};

/// Folds a force acting over `dt` into a planar velocity.
/// Mass and drag belong to whoever implements this (a point mass in tests,
/// the rigid body in the server world).
pub trait ForceIntegrator {
    fn integrate_force(&self, velocity: Vec2, force: Vec2, dt: f32) -> Vec2;
}

/// Standalone integrator: `v += F / m * dt`, then rolling drag slows the
/// vehicle linearly until it is exactly at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMass {
    pub mass: f32,         // kg
    pub rolling_drag: f32, // m/s^2
}

impl Default for PointMass {
    fn default() -> Self {
        Self { mass: 1.0, rolling_drag: 0.0 }
    }
}

impl ForceIntegrator for PointMass {
    fn integrate_force(&self, velocity: Vec2, force: Vec2, dt: f32) -> Vec2 {
        let v = velocity + force * (dt / self.mass.max(1e-6));
        if self.rolling_drag <= 0.0 {
            return v;
        }

        let speed = v.norm();
        let slowed = move_towards(speed, 0.0, self.rolling_drag * dt);
        if slowed > 0.0 { v * (slowed / speed) } else { Vec2::zeros() }
    }
}
