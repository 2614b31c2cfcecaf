// ==============================================================================
// gears.rs: GEAR TABLE + CLUTCH-GATED SHIFTING
// ------------------------------------------------------------------------------
// A gear table holds one speed limit per gear, reverse through top gear:
//
//   gear   | -1  |  0  |  1  |  2  | ... | max
//   index  |  0  |  1  |  2  |  3  | ... | max + 1
//
// - reverse limit is negative
// - neutral is always 0 (ignored by both models)
// - forward limits are positive and strictly increasing
//
// Tables are built once per model and never mutated.
// ==============================================================================

use tracing::debug;

use crate::arcade::error::{ConfigError, require_gear_count};
use crate::arcade::types::{ControlFrame, MAX_GEAR_LIMIT, MIN_GEAR};

#[derive(Debug, Clone, PartialEq)]
pub struct GearTable {
    limits: Vec<f32>,
}

impl GearTable {
    /// Evenly spaced forward limits: gear `i` tops out at `max_speed / max_gear * i`.
    pub fn linear(max_speed: f32, max_gear: i32, reverse_limit: f32) -> Self {
        let max_gear = max_gear.clamp(1, MAX_GEAR_LIMIT);
        let step = max_speed / max_gear as f32;

        let mut limits = Vec::with_capacity(max_gear as usize + 2);
        limits.push(-reverse_limit.abs());
        limits.push(0.0);
        limits.extend((1..=max_gear).map(|i| step * i as f32));

        Self { limits }
    }

    /// Takes an explicit table (reverse first) and checks its invariants.
    pub fn from_limits(limits: &[f32]) -> Result<Self, ConfigError> {
        if limits.len() < 3 {
            return Err(ConfigError::GearTable(format!(
                "need reverse, neutral and at least one forward gear, got {} entries",
                limits.len()
            )));
        }
        if let Some(bad) = limits.iter().find(|v| !v.is_finite()) {
            return Err(ConfigError::GearTable(format!("non-finite limit {bad}")));
        }
        if limits[0] >= 0.0 {
            return Err(ConfigError::GearTable(format!(
                "reverse limit must be negative, got {}",
                limits[0]
            )));
        }

        let forward = &limits[2..];
        if forward[0] <= 0.0 {
            return Err(ConfigError::GearTable(format!(
                "first gear limit must be positive, got {}",
                forward[0]
            )));
        }
        if let Some(pair) = forward.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ConfigError::GearTable(format!(
                "forward limits must strictly increase ({} then {})",
                pair[0], pair[1]
            )));
        }

        let mut limits = limits.to_vec();
        limits[1] = 0.0;
        Ok(Self { limits })
    }

    /// Picks the explicit table when it covers every gear, otherwise falls
    /// back to the linear table. Extra trailing entries are dropped.
    pub fn resolve(
        explicit: Option<&[f32]>,
        max_speed: f32,
        max_gear: i32,
        reverse_limit: f32,
    ) -> Result<Self, ConfigError> {
        require_gear_count(max_gear)?;
        let needed = max_gear
            .checked_sub(MIN_GEAR)
            .and_then(|n| n.checked_add(1))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(ConfigError::TooManyGears { max_gear })?;

        match explicit {
            Some(table) if table.len() >= needed => Self::from_limits(&table[..needed]),
            Some(table) => {
                debug!(
                    entries = table.len(),
                    needed, "gear table too short, generating linear table"
                );
                Ok(Self::linear(max_speed, max_gear, reverse_limit))
            }
            None => Ok(Self::linear(max_speed, max_gear, reverse_limit)),
        }
    }

    #[inline]
    fn index(&self, gear: i32) -> Option<usize> {
        let i = gear - MIN_GEAR;
        (i >= 0 && (i as usize) < self.limits.len()).then_some(i as usize)
    }

    /// Signed limit for `gear`, `None` when the gear does not exist.
    pub fn limit(&self, gear: i32) -> Option<f32> {
        self.index(gear).map(|i| self.limits[i])
    }

    /// Unsigned speed cap for `gear` (0 for neutral or unknown gears).
    pub fn speed_cap(&self, gear: i32) -> f32 {
        self.limit(gear).map(f32::abs).unwrap_or(0.0)
    }

    pub fn max_gear(&self) -> i32 {
        self.limits.len() as i32 + MIN_GEAR - 1
    }

    pub fn limits(&self) -> &[f32] {
        &self.limits
    }
}

/// Applies gear-shift edges. Shifting only happens while the clutch is held,
/// one gear per call, and never leaves `MIN_GEAR ..= max_gear`.
pub fn shift(gear: i32, control: &ControlFrame, max_gear: i32) -> i32 {
    if !control.clutch {
        return gear;
    }
    if control.gear_up && gear < max_gear {
        gear + 1
    } else if control.gear_down && gear > MIN_GEAR {
        gear - 1
    } else {
        gear
    }
}
