use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::{validate_common, SyncRecord};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthCategory {
    Weight,
    Height,
    Head,
}

impl GrowthCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthCategory::Weight => "weight",
            GrowthCategory::Height => "height",
            GrowthCategory::Head => "head",
        }
    }
}

impl fmt::Display for GrowthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrowthCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weight" => Ok(GrowthCategory::Weight),
            "height" => Ok(GrowthCategory::Height),
            "head" => Ok(GrowthCategory::Head),
            _ => Err(format!(
                "Invalid growth category '{}'. Valid options: weight, height, head",
                s
            )),
        }
    }
}

/// A single growth measurement. Same lifecycle as [`super::Event`], separate
/// table, same clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthData {
    pub id: String,
    pub device_id: String,
    pub category: GrowthCategory,
    pub value: f64,
    /// Free text as entered on the device (lb, in, cm, ...).
    pub unit: String,
    /// When the measurement was taken.
    pub ts: i64,
    pub created_ts: i64,
    pub updated_ts: i64,
    pub version: i64,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub server_clock: i64,
}

impl GrowthData {
    pub fn new(
        id: impl Into<String>,
        category: GrowthCategory,
        value: f64,
        unit: impl Into<String>,
        device_id: impl Into<String>,
        ts: i64,
    ) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            category,
            value,
            unit: unit.into(),
            ts,
            created_ts: ts,
            updated_ts: ts,
            version: 1,
            deleted: false,
            server_clock: 0,
        }
    }

    pub fn edited(&self, device_id: impl Into<String>, now: i64) -> Self {
        Self {
            version: self.version + 1,
            updated_ts: now,
            device_id: device_id.into(),
            server_clock: 0,
            ..self.clone()
        }
    }
}

impl SyncRecord for GrowthData {
    const FAMILY: &'static str = "growth";

    fn record_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn updated_ts(&self) -> i64 {
        self.updated_ts
    }

    fn writer_device_id(&self) -> &str {
        &self.device_id
    }

    fn server_clock(&self) -> i64 {
        self.server_clock
    }

    fn set_server_clock(&mut self, clock: i64) {
        self.server_clock = clock;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_common(
            &self.id,
            &self.device_id,
            self.version,
            self.created_ts,
            self.updated_ts,
        )?;
        if self.ts < 0 {
            return Err(ValidationError::NegativeTimestamp {
                field: "ts",
                value: self.ts,
            });
        }
        if !self.value.is_finite() {
            return Err(ValidationError::NonFiniteValue);
        }
        if self.unit.trim().is_empty() {
            return Err(ValidationError::EmptyUnit);
        }
        Ok(())
    }
}
