// ==============================================================================
// kinematic.rs: KINEMATIC GEAR/SPEED CAR MODEL
// ==============================================================================
// No forces: a signed scalar speed is driven directly by throttle, drag and
// brakes, clamped by the current gear, and the pose is moved along heading.
//
// update_controls(...): once per control sample:
// 1) clutch-gated gear shifts
// 2) handbrake switches drag/braking to the high-drag pair and bleeds speed
// 3) throttle accelerates toward the gear's direction, else speed decays to 0
// 4) brake key pulls non-negative speed back by braking * dt
// 5) steering, authority growing with speed (and while braking)
//
// translate(...): once per fixed tick:
// 6) position += forward * speed * dt
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::arcade::error::{ConfigError, require_gear_count, require_positive, require_range};
use crate::arcade::gears::{GearTable, shift};
use crate::arcade::types::{ControlFrame, MIN_GEAR, Vec2, VehicleState, move_towards, wrap_degrees};

/// Steering base while rolling / while the handbrake is held.
pub const STEER_BIAS: f32 = 0.25;
pub const BRAKING_STEER_BIAS: f32 = 0.75;

/// Coasting decay multiplier applied on top of the drag coefficient.
pub const COAST_DECAY: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    pub acceleration_factor: f32,  // m/s^2 at full throttle
    pub max_speed: f32,            // m/s, steering reference
    pub max_gear: i32,
    pub gear_speeds: Option<Vec<f32>>,
    pub reverse_speed_limit: f32,  // m/s, only used for generated tables

    pub drag: f32,                 // coasting decay
    pub braking: f32,              // brake key, m/s^2
    pub handbrake_drag: f32,
    pub handbrake_braking: f32,

    pub steering_sensitivity: f32, // degrees per second
}

impl Default for KinematicConfig {
    fn default() -> Self {
        Self {
            acceleration_factor: 100.0,
            max_speed: 200.0,
            max_gear: 6,
            gear_speeds: Some(vec![-15.0, 0.0, 20.0, 30.0, 40.0, 55.0, 70.0, 90.0]),
            reverse_speed_limit: 15.0,
            drag: 0.08,
            braking: 0.5,
            handbrake_drag: 2.6,
            handbrake_braking: 10.0,
            steering_sensitivity: 90.0,
        }
    }
}

impl KinematicConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("kinematic.acceleration_factor", self.acceleration_factor)?;
        require_positive("kinematic.max_speed", self.max_speed)?;
        require_positive("kinematic.reverse_speed_limit", self.reverse_speed_limit)?;
        require_range("kinematic.drag", self.drag, 0.0, f32::MAX)?;
        require_range("kinematic.braking", self.braking, 0.0, f32::MAX)?;
        require_range("kinematic.handbrake_drag", self.handbrake_drag, 0.0, f32::MAX)?;
        require_range("kinematic.handbrake_braking", self.handbrake_braking, 0.0, f32::MAX)?;
        require_range("kinematic.steering_sensitivity", self.steering_sensitivity, 0.0, f32::MAX)?;

        require_gear_count(self.max_gear)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KinematicModel {
    config: KinematicConfig,
    gears: GearTable,
}

impl KinematicModel {
    pub fn new(config: KinematicConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let gears = GearTable::resolve(
            config.gear_speeds.as_deref(),
            config.max_speed,
            config.max_gear,
            config.reverse_speed_limit,
        )?;

        let reverse = gears.speed_cap(MIN_GEAR);
        let floor = STEER_BIAS * config.max_speed;
        if reverse > floor {
            return Err(ConfigError::GearTable(format!(
                "reverse limit {reverse} exceeds {floor} (0.25 * max_speed), steering would invert in reverse"
            )));
        }
        Ok(Self { config, gears })
    }

    pub fn config(&self) -> &KinematicConfig {
        &self.config
    }

    pub fn gears(&self) -> &GearTable {
        &self.gears
    }

    /// Spawns in neutral.
    pub fn initial_state(&self, position: Vec2, heading: f32) -> VehicleState {
        VehicleState::new(position, heading, 0)
    }

    /// Turn rate in degrees per second at `speed`. Stays non-negative down to
    /// `-STEER_BIAS * max_speed`; `new` rejects reverse limits beyond that.
    pub fn steering_rate(&self, speed: f32, braking: bool) -> f32 {
        let bias = if braking { BRAKING_STEER_BIAS } else { STEER_BIAS };
        self.config.steering_sensitivity * (bias + speed / self.config.max_speed)
    }

    /// Control pass followed by the translation pass, both with `dt`.
    pub fn step(&self, state: &mut VehicleState, control: &ControlFrame, dt: f32) {
        self.update_controls(state, control, dt);
        self.translate(state, dt);
    }

    pub fn update_controls(&self, state: &mut VehicleState, control: &ControlFrame, dt: f32) {
        let cfg = &self.config;

        state.gear = shift(state.gear, control, self.gears.max_gear());

        // --- braking state ---
        let braking = control.handbrake;
        let (drag, brake_rate) = if braking {
            (cfg.handbrake_drag, cfg.handbrake_braking)
        } else {
            (cfg.drag, cfg.braking)
        };
        if braking {
            state.speed = move_towards(state.speed, 0.0, brake_rate * dt);
        }

        // --- speed ---
        let cap = self.gears.speed_cap(state.gear);
        let throttle = control.throttle.max(0.0);

        if throttle > 0.0 && state.gear != 0 && !control.clutch {
            let delta = throttle * cfg.acceleration_factor * dt;
            state.speed = if state.gear < 0 {
                (state.speed - delta).clamp(-cap, 0.0)
            } else {
                (state.speed + delta).clamp(0.0, cap)
            };
        } else {
            state.speed = move_towards(state.speed, 0.0, drag * dt * COAST_DECAY);
        }

        if control.brake && state.speed >= 0.0 {
            state.speed -= brake_rate * dt;
        }

        // --- steering ---
        if state.speed != 0.0 {
            let rate = self.steering_rate(state.speed, braking);
            state.heading = wrap_degrees(state.heading - control.steer * rate * dt);
        }
    }

    pub fn translate(&self, state: &mut VehicleState, dt: f32) {
        let fwd = state.forward();
        state.position += fwd * (state.speed * dt);
        state.velocity = fwd * state.speed;
    }
}
