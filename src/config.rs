//! Server configuration, loaded from TOML. Every field has a default so an
//! empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::arcade::{ConfigError, DriftConfig, DriftModel, KinematicConfig, KinematicModel, ModelKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub tick_hz: u32,
    pub default_model: ModelKind,
    pub max_vehicles: usize,
    pub drift: DriftConfig,
    pub kinematic: KinematicConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9001".to_string(),
            tick_hz: 60,
            default_model: ModelKind::Drift,
            max_vehicles: 16,
            drift: DriftConfig::default(),
            kinematic: KinematicConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::NonPositive { field: "tick_hz", value: 0.0 });
        }
        if self.max_vehicles == 0 {
            return Err(ConfigError::NonPositive { field: "max_vehicles", value: 0.0 });
        }
        self.drift.validate()?;
        self.kinematic.validate()
    }

    /// Fixed timestep in seconds.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }

    /// Builds both models once; vehicles clone them at spawn.
    pub fn build_models(&self) -> Result<(DriftModel, KinematicModel), ConfigError> {
        Ok((
            DriftModel::new(self.drift.clone())?,
            KinematicModel::new(self.kinematic.clone())?,
        ))
    }
}
