use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arcade::drift::DriftModel;
use crate::arcade::gears::GearTable;
use crate::arcade::integrator::ForceIntegrator;
use crate::arcade::kinematic::KinematicModel;
use crate::arcade::types::{ControlFrame, Vec2, VehicleState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Drift,
    Kinematic,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Drift => write!(f, "drift"),
            ModelKind::Kinematic => write!(f, "kinematic"),
        }
    }
}

/// The physics style driving a vehicle. Callers step it without caring
/// which variant is active.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleModel {
    Drift(DriftModel),
    Kinematic(KinematicModel),
}

impl VehicleModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            VehicleModel::Drift(_) => ModelKind::Drift,
            VehicleModel::Kinematic(_) => ModelKind::Kinematic,
        }
    }

    pub fn gears(&self) -> &GearTable {
        match self {
            VehicleModel::Drift(m) => m.gears(),
            VehicleModel::Kinematic(m) => m.gears(),
        }
    }

    pub fn initial_state(&self, position: Vec2, heading: f32) -> VehicleState {
        match self {
            VehicleModel::Drift(m) => m.initial_state(position, heading),
            VehicleModel::Kinematic(m) => m.initial_state(position, heading),
        }
    }

    /// Advances `state` by one tick. The kinematic model ignores the integrator.
    pub fn step(
        &self,
        state: &mut VehicleState,
        control: &ControlFrame,
        dt: f32,
        integrator: &dyn ForceIntegrator,
    ) {
        match self {
            VehicleModel::Drift(m) => m.step(state, control, dt, integrator),
            VehicleModel::Kinematic(m) => m.step(state, control, dt),
        }
    }

    /// Signed speed along the heading.
    pub fn forward_speed(&self, state: &VehicleState) -> f32 {
        match self {
            VehicleModel::Drift(_) => state.velocity.dot(&state.forward()),
            VehicleModel::Kinematic(_) => state.speed,
        }
    }
}

impl From<DriftModel> for VehicleModel {
    fn from(m: DriftModel) -> Self {
        VehicleModel::Drift(m)
    }
}

impl From<KinematicModel> for VehicleModel {
    fn from(m: KinematicModel) -> Self {
        VehicleModel::Kinematic(m)
    }
}
