//! arcade - engine-agnostic top-down car models (pure types + step functions)

pub mod types;
pub mod error;
pub mod gears;
pub mod integrator;
pub mod drift;
pub mod kinematic;
pub mod model;

pub use types::*;
pub use error::ConfigError;
pub use gears::{GearTable, shift};
pub use integrator::{ForceIntegrator, PointMass};
pub use drift::{DriftConfig, DriftModel};
pub use kinematic::{KinematicConfig, KinematicModel};
pub use model::{ModelKind, VehicleModel};
