//! `[sensor]` section: identity and cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::core::measurement::SensorIdentity;

#[derive(Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SensorConfig {
    #[validate(length(min = 1, message = "sensor id is required"))]
    pub id: String,

    #[validate(length(min = 1, message = "sensor secret is required"))]
    pub secret: String,

    /// Pause between two measurements, in milliseconds.
    #[validate(range(min = 1, message = "interval must be at least 1 ms"))]
    pub interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            secret: String::new(),
            interval_ms: 1000,
        }
    }
}

impl SensorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn identity(&self) -> Result<SensorIdentity, ValidationErrors> {
        SensorIdentity::new(self.id.clone(), self.secret.clone())
    }
}

impl std::fmt::Debug for SensorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorConfig")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("interval_ms", &self.interval_ms)
            .finish()
    }
}
