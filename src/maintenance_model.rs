//! Data model definitions for maintenance tracking.
//!
//! This module defines the strict shapes the engine computes over. Records
//! reach these types through the normalization adapter in
//! [`crate::record_normalizer`]; once here, every numeric field is already
//! non-negative and every flag is a real boolean.
//!
//! The primary types are [`Vehicle`], [`MaintenanceRecord`] and the derived
//! [`ServiceProgress`] / [`ProgressReport`] pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the independently tracked maintenance obligations.
///
/// Each type runs on its own interval and is anchored on its own record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Rotation,
    Alignment,
    Balancing,
}

impl ServiceType {
    /// All tracked service types, in report order.
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Rotation,
        ServiceType::Alignment,
        ServiceType::Balancing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Rotation => "rotation",
            ServiceType::Alignment => "alignment",
            ServiceType::Balancing => "balancing",
        }
    }
}

/// Which services a single record performed. Any combination is valid,
/// including none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFlags {
    pub rotation: bool,
    pub alignment: bool,
    pub balancing: bool,
}

impl ServiceFlags {
    pub fn get(&self, service: ServiceType) -> bool {
        match service {
            ServiceType::Rotation => self.rotation,
            ServiceType::Alignment => self.alignment,
            ServiceType::Balancing => self.balancing,
        }
    }

    /// True when alignment or balancing was performed.
    pub fn has_auxiliary(&self) -> bool {
        self.alignment || self.balancing
    }
}

/// A fleet vehicle as seen by the engine.
///
/// The engine only reads vehicles. `current_odometer` is `None` when no
/// distance has ever been recorded, which is different from a reading of 0.
///
/// ```rust
/// use fleet_maintenance_core::maintenance_model::Vehicle;
///
/// let truck = Vehicle::new("veh-1", "AB-123-CD", Some(45_000));
/// assert_eq!(truck.odometer_or_zero(), 45_000);
///
/// let fresh = Vehicle::new("veh-2", "EF-456-GH", None);
/// assert_eq!(fresh.odometer_or_zero(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Stable identifier, referenced by [`MaintenanceRecord::vehicle_id`].
    pub id: String,
    /// Human-facing label, usually the license plate.
    pub label: String,
    /// Latest odometer reading in kilometers.
    pub current_odometer: Option<u64>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, label: impl Into<String>, current_odometer: Option<u64>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            current_odometer,
        }
    }

    pub fn odometer_or_zero(&self) -> u64 {
        self.current_odometer.unwrap_or(0)
    }
}

/// One physical service event.
///
/// Records are immutable inputs for the engine. The three interval fields use
/// `0` for "not configured"; the calculator substitutes the configured default
/// for those.
///
/// # Anchoring
///
/// - Alignment and balancing anchor on their own flag.
/// - Rotation anchors on a non-empty [`positions_serviced`](Self::positions_serviced)
///   list, whatever the `rotation` flag says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: String,
    /// Owning vehicle. A reference, not ownership.
    pub vehicle_id: String,
    pub service_date: DateTime<Utc>,
    /// Odometer at the moment of service. Sequences are not guaranteed to be
    /// monotonic.
    pub odometer_at_service: u64,
    /// Wheel position tags, informational.
    pub positions_serviced: Vec<String>,
    pub service_flags: ServiceFlags,
    pub rotation_interval_km: u64,
    pub alignment_interval_km: u64,
    pub balancing_interval_km: u64,
}

impl MaintenanceRecord {
    /// Interval stored on this record for `service`, `0` when unset.
    pub fn interval_for(&self, service: ServiceType) -> u64 {
        match service {
            ServiceType::Rotation => self.rotation_interval_km,
            ServiceType::Alignment => self.alignment_interval_km,
            ServiceType::Balancing => self.balancing_interval_km,
        }
    }

    /// Whether this record can anchor progress for `service`.
    pub fn anchors(&self, service: ServiceType) -> bool {
        match service {
            ServiceType::Rotation => !self.positions_serviced.is_empty(),
            ServiceType::Alignment | ServiceType::Balancing => self.service_flags.get(service),
        }
    }
}

/// Where a service stands relative to its interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// No qualifying record exists. Not an error.
    NoHistory,
    /// There is an anchor but the vehicle never reported an odometer, so
    /// progress reads as zero without meaning "on schedule".
    OdometerUnknown,
    OnSchedule,
    DueSoon,
    Due,
}

/// Derived progress for one vehicle and one service type. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceProgress {
    /// Percentage of the interval elapsed, always within `[0, 100]`.
    pub consumed_fraction: f64,
    /// Kilometers left before the service is due. Never negative.
    pub remaining_distance: u64,
    /// Interval in effect; 0 when there is no history.
    pub interval_distance: u64,
    /// The anchor record, if any.
    pub last_service_record: Option<MaintenanceRecord>,
    /// Anchor odometer plus interval, or 0 when there is no history.
    pub next_due_odometer: u64,
    pub status: ServiceStatus,
}

impl ServiceProgress {
    /// The terminal "no history" state.
    pub fn no_history() -> Self {
        Self {
            consumed_fraction: 0.0,
            remaining_distance: 0,
            interval_distance: 0,
            last_service_record: None,
            next_due_odometer: 0,
            status: ServiceStatus::NoHistory,
        }
    }

    pub fn has_history(&self) -> bool {
        self.last_service_record.is_some()
    }
}

/// Progress for all three service types of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub vehicle_id: String,
    /// False when the vehicle has never reported an odometer reading. Progress
    /// is then computed against 0 and must not be read as "on schedule".
    pub odometer_known: bool,
    pub rotation: ServiceProgress,
    pub alignment: ServiceProgress,
    pub balancing: ServiceProgress,
}

impl ProgressReport {
    pub fn get(&self, service: ServiceType) -> &ServiceProgress {
        match service {
            ServiceType::Rotation => &self.rotation,
            ServiceType::Alignment => &self.alignment,
            ServiceType::Balancing => &self.balancing,
        }
    }
}
