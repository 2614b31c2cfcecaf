// ==============================================================================
// drift.rs: FORCE-DRIFT CAR MODEL
// ==============================================================================
// One fixed tick, in this order (each stage reads the previous one):
// 1) engine force through the force integrator, clamped to the gear limit
// 2) steering, authority fading out linearly toward max_speed
// 3) grip: forward velocity kept, lateral velocity scaled by the drift factor,
//    traction pulls velocity back toward pure forward while driving
// 4) global clamp to max_speed
//
// "drift factor" is a grip retention coefficient: lower = more sliding.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::arcade::error::{ConfigError, require_gear_count, require_positive, require_range};
use crate::arcade::gears::{GearTable, shift};
use crate::arcade::integrator::ForceIntegrator;
use crate::arcade::types::{ControlFrame, Vec2, VehicleState, clamp_magnitude, wrap_degrees};

/// Below this speed (m/s) the wheel has no effect.
pub const MIN_STEER_SPEED: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub acceleration_power: f32,     // N
    pub steering_power: f32,         // degrees per tick at standstill
    pub max_speed: f32,              // m/s
    pub drift_factor: f32,           // 0..1 lateral grip retained
    pub handbrake_drift_factor: f32, // 0..1, below drift_factor
    pub traction: f32,               // 1/s blend toward forward under throttle
    pub max_gear: i32,
    pub reverse_speed_limit: f32,    // m/s, only used for generated tables
    pub gear_speeds: Option<Vec<f32>>,

    // --- rigid body (collaborator side) ---
    pub mass: f32,                   // kg
    pub linear_damping: f32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            acceleration_power: 5.0,
            steering_power: 5.0,
            max_speed: 30.0,
            drift_factor: 0.9,
            handbrake_drift_factor: 0.5,
            traction: 0.9,
            max_gear: 6,
            reverse_speed_limit: 10.0,
            gear_speeds: None,
            mass: 1.0,
            linear_damping: 0.0,
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("drift.acceleration_power", self.acceleration_power)?;
        require_positive("drift.max_speed", self.max_speed)?;
        require_positive("drift.reverse_speed_limit", self.reverse_speed_limit)?;
        require_positive("drift.mass", self.mass)?;
        require_range("drift.steering_power", self.steering_power, 0.0, 180.0)?;
        require_range("drift.drift_factor", self.drift_factor, 0.0, 1.0)?;
        require_range("drift.handbrake_drift_factor", self.handbrake_drift_factor, 0.0, 1.0)?;
        require_range("drift.traction", self.traction, 0.0, f32::MAX)?;
        require_range("drift.linear_damping", self.linear_damping, 0.0, f32::MAX)?;

        if self.handbrake_drift_factor >= self.drift_factor {
            return Err(ConfigError::GripOrder {
                drift_factor: self.drift_factor,
                handbrake_drift_factor: self.handbrake_drift_factor,
            });
        }
        require_gear_count(self.max_gear)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriftModel {
    config: DriftConfig,
    gears: GearTable,
}

impl DriftModel {
    /// Validates the config and builds the gear table up front.
    pub fn new(config: DriftConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let gears = GearTable::resolve(
            config.gear_speeds.as_deref(),
            config.max_speed,
            config.max_gear,
            config.reverse_speed_limit,
        )?;
        Ok(Self { config, gears })
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn gears(&self) -> &GearTable {
        &self.gears
    }

    /// Spawns in first gear.
    pub fn initial_state(&self, position: Vec2, heading: f32) -> VehicleState {
        VehicleState::new(position, heading, 1)
    }

    /// Steering multiplier at `speed`: 1 at rest, 0 at max_speed.
    pub fn steering_authority(&self, speed: f32) -> f32 {
        1.0 - (speed.abs() / self.config.max_speed).clamp(0.0, 1.0)
    }

    pub fn step(
        &self,
        state: &mut VehicleState,
        control: &ControlFrame,
        dt: f32,
        integrator: &dyn ForceIntegrator,
    ) {
        state.gear = shift(state.gear, control, self.gears.max_gear());

        let driving = self.apply_engine_force(state, control, dt, integrator);
        self.apply_steering(state, control);
        self.apply_grip(state, control, dt, driving);

        state.velocity = clamp_magnitude(state.velocity, self.config.max_speed);
        state.speed = state.velocity.dot(&state.forward());
    }

    /// Returns whether the engine is connected to the wheels this tick.
    fn apply_engine_force(
        &self,
        state: &mut VehicleState,
        control: &ControlFrame,
        dt: f32,
        integrator: &dyn ForceIntegrator,
    ) -> bool {
        // Clutch in or neutral: no drive, but the body still coasts (drag).
        if control.clutch || state.gear == 0 {
            state.velocity = integrator.integrate_force(state.velocity, Vec2::zeros(), dt);
            return false;
        }

        let direction = state.gear.signum() as f32;
        let force = state.forward() * (control.throttle * self.config.acceleration_power * direction);
        state.velocity = integrator.integrate_force(state.velocity, force, dt);

        let limit = self.gears.speed_cap(state.gear);
        state.velocity = clamp_magnitude(state.velocity, limit);
        true
    }

    fn apply_steering(&self, state: &mut VehicleState, control: &ControlFrame) {
        let speed = state.velocity.norm();
        if speed <= MIN_STEER_SPEED {
            return;
        }

        let steer_amount = control.steer * self.config.steering_power * self.steering_authority(speed);
        state.heading = wrap_degrees(state.heading - steer_amount);
    }

    fn apply_grip(&self, state: &mut VehicleState, control: &ControlFrame, dt: f32, driving: bool) {
        let grip = if control.handbrake {
            self.config.handbrake_drift_factor
        } else {
            self.config.drift_factor
        };

        let fwd = state.forward();
        let side = state.right();
        let forward_velocity = fwd * state.velocity.dot(&fwd);
        let lateral_velocity = side * state.velocity.dot(&side);

        state.velocity = forward_velocity + lateral_velocity * grip;

        if driving && control.throttle != 0.0 {
            let t = (self.config.traction * dt).clamp(0.0, 1.0);
            state.velocity = state.velocity.lerp(&forward_velocity, t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcade::integrator::PointMass;

    const DT: f32 = 0.02;

    fn model() -> DriftModel {
        DriftModel::new(DriftConfig::default()).unwrap()
    }

    fn full_throttle() -> ControlFrame {
        ControlFrame::default().with_throttle(1.0)
    }

    fn run(model: &DriftModel, state: &mut VehicleState, control: ControlFrame, ticks: usize) {
        let body = PointMass::default();
        for _ in 0..ticks {
            model.step(state, &control, DT, &body);
        }
    }

    #[test]
    fn third_gear_scenario_stays_under_limit() {
        let m = model();
        assert_eq!(m.gears().limit(3), Some(15.0));

        let mut s = m.initial_state(Vec2::zeros(), 0.0);
        s.gear = 3;

        let mut last = 0.0;
        for _ in 0..10 {
            run(&m, &mut s, full_throttle(), 1);
            let speed = s.velocity.norm();
            assert!(speed > last);
            assert!(speed <= 15.0);
            last = speed;
        }
        // 5 N on 1 kg for 0.2 s
        assert!((last - 1.0).abs() < 1e-4);
    }

    #[test]
    fn full_throttle_converges_to_each_gear_limit() {
        let m = model();
        for gear in 1..=6 {
            let mut s = m.initial_state(Vec2::zeros(), 0.0);
            s.gear = gear;
            run(&m, &mut s, full_throttle(), 2_000);

            let limit = m.gears().limit(gear).unwrap();
            let speed = s.velocity.norm();
            assert!(speed <= limit + 1e-4, "gear {gear}: {speed} > {limit}");
            assert!((speed - limit).abs() < 1e-3, "gear {gear}: {speed} vs {limit}");
        }
    }

    #[test]
    fn reverse_gear_backs_up_to_reverse_limit() {
        let m = model();
        let mut s = m.initial_state(Vec2::zeros(), 0.0);
        s.gear = -1;
        run(&m, &mut s, full_throttle(), 1_000);

        assert!((s.velocity.norm() - 10.0).abs() < 1e-3);
        assert!(s.speed < 0.0);
        assert!(s.velocity.y < 0.0);
    }

    #[test]
    fn clutch_cancels_throttle() {
        let m = model();
        let mut held = m.initial_state(Vec2::zeros(), 0.0);
        held.gear = 2;
        held.velocity = Vec2::new(1.5, 4.0);
        let mut idle = held;

        let clutch = ControlFrame { clutch: true, ..full_throttle() };
        let coast = ControlFrame { clutch: true, ..Default::default() };
        run(&m, &mut held, clutch, 200);
        run(&m, &mut idle, coast, 200);

        assert!((held.velocity.norm() - idle.velocity.norm()).abs() < 1e-6);
    }

    #[test]
    fn neutral_does_not_drive() {
        let m = model();
        let mut s = m.initial_state(Vec2::zeros(), 0.0);
        s.gear = 0;
        run(&m, &mut s, full_throttle(), 100);
        assert_eq!(s.velocity, Vec2::zeros());
    }

    #[test]
    fn steering_authority_fades_with_speed() {
        let m = model();
        let speeds = [0.0, 5.0, 10.0, 20.0, 29.0, 30.0, 45.0];
        let authority: Vec<f32> = speeds.iter().map(|&v| m.steering_authority(v)).collect();

        assert!(authority.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(authority[0], 1.0);
        assert_eq!(authority[5], 0.0);
        assert_eq!(authority[6], 0.0);
    }

    #[test]
    fn steering_needs_motion_and_turns_right_on_positive_input() {
        let m = model();
        let right = ControlFrame::default().with_steer(1.0);

        let mut parked = m.initial_state(Vec2::zeros(), 0.0);
        run(&m, &mut parked, right, 1);
        assert_eq!(parked.heading, 0.0);

        let mut rolling = m.initial_state(Vec2::zeros(), 0.0);
        rolling.gear = 3;
        rolling.velocity = Vec2::new(0.0, 15.0);
        run(&m, &mut rolling, right, 1);
        // half authority at half max speed
        assert!((rolling.heading + 2.5).abs() < 1e-4);
    }

    #[test]
    fn handbrake_keeps_less_lateral_velocity() {
        let m = model();
        let mut grip = m.initial_state(Vec2::zeros(), 0.0);
        grip.gear = 6;
        grip.velocity = Vec2::new(6.0, 8.0);
        let mut slide = grip;

        run(&m, &mut grip, ControlFrame::default(), 1);
        run(&m, &mut slide, ControlFrame { handbrake: true, ..Default::default() }, 1);

        assert!((grip.velocity.x - 5.4).abs() < 1e-4);
        assert!((slide.velocity.x - 3.0).abs() < 1e-4);
        assert!(slide.velocity.x.abs() < grip.velocity.x.abs());
        // forward component untouched
        assert!((grip.velocity.y - 8.0).abs() < 1e-4);
        assert!((slide.velocity.y - 8.0).abs() < 1e-4);
    }

    #[test]
    fn traction_pulls_toward_forward_under_throttle() {
        let m = model();
        let mut coasting = m.initial_state(Vec2::zeros(), 0.0);
        coasting.velocity = Vec2::new(4.0, 2.0);
        let mut driving = coasting;

        run(&m, &mut coasting, ControlFrame::default(), 1);
        run(&m, &mut driving, full_throttle(), 1);

        assert!(driving.velocity.x.abs() < coasting.velocity.x.abs());
    }

    #[test]
    fn never_exceeds_max_speed() {
        let m = model();
        let mut s = m.initial_state(Vec2::zeros(), 0.0);
        s.velocity = Vec2::new(0.0, 80.0);
        run(&m, &mut s, ControlFrame { clutch: true, ..Default::default() }, 1);
        assert!(s.velocity.norm() <= 30.0 + 1e-4);
    }

    #[test]
    fn coasting_with_drag_comes_to_rest() {
        let m = model();
        let body = PointMass { mass: 1.0, rolling_drag: 1.5 };
        let mut s = m.initial_state(Vec2::zeros(), 30.0);
        s.velocity = s.forward() * 3.0;

        for _ in 0..500 {
            m.step(&mut s, &ControlFrame::default(), DT, &body);
        }
        assert_eq!(s.velocity, Vec2::zeros());
    }

    #[test]
    fn config_validation() {
        let bad = DriftConfig { handbrake_drift_factor: 0.95, ..Default::default() };
        assert!(matches!(DriftModel::new(bad), Err(ConfigError::GripOrder { .. })));

        let bad = DriftConfig { max_speed: 0.0, ..Default::default() };
        assert!(matches!(DriftModel::new(bad), Err(ConfigError::NonPositive { .. })));

        let bad = DriftConfig { max_gear: 0, ..Default::default() };
        assert!(matches!(DriftModel::new(bad), Err(ConfigError::TooFewGears { .. })));
    }
}
