// ==============================================================================
// input.rs: RAW CLIENT INPUT -> CONTROL FRAME
// ------------------------------------------------------------------------------
// Clients report *held* states. The latch remembers the previous sample so a
// held gear key produces exactly one shift edge.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::arcade::ControlFrame;

/// Latest input reported by a client, as held states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInput {
    pub throttle: f32,   // -1..1
    pub steer: f32,      // -1..1, positive = right
    pub handbrake: bool,
    pub clutch: bool,
    pub brake: bool,
    pub gear_up: bool,   // held
    pub gear_down: bool, // held
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputLatch {
    gear_up_held: bool,
    gear_down_held: bool,
}

impl InputLatch {
    /// Samples `raw` once for this tick.
    pub fn sample(&mut self, raw: &RawInput) -> ControlFrame {
        let gear_up = raw.gear_up && !self.gear_up_held;
        let gear_down = raw.gear_down && !self.gear_down_held;
        self.gear_up_held = raw.gear_up;
        self.gear_down_held = raw.gear_down;

        ControlFrame {
            throttle: raw.throttle,
            steer: raw.steer,
            handbrake: raw.handbrake,
            clutch: raw.clutch,
            brake: raw.brake,
            gear_up,
            gear_down,
        }
        .normalized()
    }
}
