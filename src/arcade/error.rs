use std::fmt;

use crate::arcade::types::MAX_GEAR_LIMIT;

/// Invalid vehicle or server configuration, reported at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositive { field: &'static str, value: f32 },
    OutOfRange { field: &'static str, value: f32, min: f32, max: f32 },
    /// Handbrake grip must be strictly lower than normal grip.
    GripOrder { drift_factor: f32, handbrake_drift_factor: f32 },
    TooFewGears { max_gear: i32 },
    TooManyGears { max_gear: i32 },
    GearTable(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositive { field, value } => {
                write!(f, "{field} must be positive (got {value})")
            }
            ConfigError::OutOfRange { field, value, min, max } => {
                write!(f, "{field} must be within [{min}, {max}] (got {value})")
            }
            ConfigError::GripOrder { drift_factor, handbrake_drift_factor } => write!(
                f,
                "handbrake_drift_factor ({handbrake_drift_factor}) must be below drift_factor ({drift_factor})"
            ),
            ConfigError::TooFewGears { max_gear } => {
                write!(f, "max_gear must be at least 1 (got {max_gear})")
            }
            ConfigError::TooManyGears { max_gear } => {
                write!(f, "max_gear must be at most {MAX_GEAR_LIMIT} (got {max_gear})")
            }
            ConfigError::GearTable(msg) => write!(f, "invalid gear table: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub(crate) fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

pub(crate) fn require_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}

pub(crate) fn require_gear_count(max_gear: i32) -> Result<(), ConfigError> {
    if max_gear < 1 {
        Err(ConfigError::TooFewGears { max_gear })
    } else if max_gear > MAX_GEAR_LIMIT {
        Err(ConfigError::TooManyGears { max_gear })
    } else {
        Ok(())
    }
}
