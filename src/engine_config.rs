//! Engine configuration.
//!
//! Hosts pass this as JSON when creating a tracker. Every field has a default,
//! so `{}` (or no payload at all) yields [`EngineConfig::default`].

use log::warn;
use serde::{Deserialize, Serialize};

/// Interval applied when a record carries no usable interval for a service type.
pub const DEFAULT_INTERVAL_KM: u64 = 10_000;

/// Percentage of an interval after which a service is reported as due soon.
pub const DEFAULT_DUE_SOON_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fallback interval for records with a zero, negative or missing interval.
    pub default_interval_km: u64,
    /// Consumed percentage at which a service turns `DueSoon`.
    pub due_soon_threshold: f64,
    /// When false every read recomputes progress.
    pub cache_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_interval_km: DEFAULT_INTERVAL_KM,
            due_soon_threshold: DEFAULT_DUE_SOON_THRESHOLD,
            cache_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Parses a host-supplied JSON payload. Empty input means defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Replaces out-of-range values with usable ones.
    pub fn sanitized(mut self) -> Self {
        if self.default_interval_km == 0 {
            warn!("default_interval_km of 0 is unusable, falling back to {DEFAULT_INTERVAL_KM}");
            self.default_interval_km = DEFAULT_INTERVAL_KM;
        }
        if !self.due_soon_threshold.is_finite() {
            warn!("Non-finite due_soon_threshold, falling back to {DEFAULT_DUE_SOON_THRESHOLD}");
            self.due_soon_threshold = DEFAULT_DUE_SOON_THRESHOLD;
        }
        self.due_soon_threshold = self.due_soon_threshold.clamp(0.0, 100.0);
        self
    }
}
