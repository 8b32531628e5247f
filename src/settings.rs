use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_HALF_TIME_SECS: u64 = 120;
pub const DEFAULT_BREAK_TIME_SECS: u64 = 30;

/// Timing configuration served by `/settings`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_half_time", deserialize_with = "half_time_or_default")]
    pub half_time: u64,
    #[serde(
        default = "default_break_time",
        deserialize_with = "break_time_or_default"
    )]
    pub break_time: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            half_time: DEFAULT_HALF_TIME_SECS,
            break_time: DEFAULT_BREAK_TIME_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("half time must be at least one second")]
    ZeroHalfTime,
    #[error("break time must be at least one second")]
    ZeroBreakTime,
}

impl Settings {
    pub fn new(half_time: u64, break_time: u64) -> Result<Self, SettingsError> {
        let settings = Self {
            half_time,
            break_time,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.half_time == 0 {
            return Err(SettingsError::ZeroHalfTime);
        }
        if self.break_time == 0 {
            return Err(SettingsError::ZeroBreakTime);
        }
        Ok(())
    }
}

fn default_half_time() -> u64 {
    DEFAULT_HALF_TIME_SECS
}

fn default_break_time() -> u64 {
    DEFAULT_BREAK_TIME_SECS
}

// null, zero, negative or non-numeric values all mean "unset"
fn positive_or(value: Option<serde_json::Value>, fallback: u64) -> u64 {
    value
        .and_then(|v| v.as_u64())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}

fn half_time_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(positive_or(
        Option::<serde_json::Value>::deserialize(d)?,
        DEFAULT_HALF_TIME_SECS,
    ))
}

fn break_time_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(positive_or(
        Option::<serde_json::Value>::deserialize(d)?,
        DEFAULT_BREAK_TIME_SECS,
    ))
}
