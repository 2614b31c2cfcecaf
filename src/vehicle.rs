use rapier3d::prelude::*;
use serde::Serialize;

use crate::arcade::{ModelKind, VehicleModel, VehicleState};
use crate::input::{InputLatch, RawInput};

/// Per-vehicle wire view, one per snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub id: String,
    pub model: ModelKind,
    pub x: f32,
    pub y: f32,
    pub heading: f32, // degrees
    pub speed: f32,   // signed, m/s
    pub gear: i32,
}

pub struct Vehicle {
    pub id: String,
    pub body: RigidBodyHandle,  // the chassis body
    pub model: VehicleModel,    // physics style + gear table
    pub state: VehicleState,    // pose, velocity, speed, gear
    pub input: RawInput,        // latest held input from the client
    pub latch: InputLatch,      // gear key edge detection
}

impl Vehicle {
    pub fn new(id: String, body: RigidBodyHandle, model: VehicleModel, state: VehicleState) -> Self {
        Self {
            id,
            body,
            model,
            state,
            input: RawInput::default(),
            latch: InputLatch::default(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id.clone(),
            model: self.kind(),
            x: self.state.position.x,
            y: self.state.position.y,
            heading: self.state.heading,
            speed: self.model.forward_speed(&self.state),
            gear: self.state.gear,
        }
    }
}
