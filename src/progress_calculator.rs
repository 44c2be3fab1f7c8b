//! Per-vehicle interval progress.
//!
//! Pure functions: no I/O, no shared state, same inputs always give the same
//! report. Records belonging to other vehicles are filtered out here rather
//! than trusted to the caller; records without a vehicle id belong to none.

use log::debug;

use crate::engine_config::{EngineConfig, DEFAULT_INTERVAL_KM};
use crate::maintenance_model::{
    MaintenanceRecord, ProgressReport, ServiceProgress, ServiceStatus, ServiceType, Vehicle,
};

/// Computes rotation, alignment and balancing progress for `vehicle`.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use fleet_maintenance_core::engine_config::EngineConfig;
/// use fleet_maintenance_core::maintenance_model::{MaintenanceRecord, ServiceFlags, Vehicle};
/// use fleet_maintenance_core::progress_calculator::compute_progress;
///
/// let vehicle = Vehicle::new("veh-1", "AB-123-CD", Some(45_000));
/// let record = MaintenanceRecord {
///     id: "r1".to_string(),
///     vehicle_id: "veh-1".to_string(),
///     service_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
///     odometer_at_service: 40_000,
///     positions_serviced: vec!["FL".to_string(), "FR".to_string()],
///     service_flags: ServiceFlags { rotation: true, ..Default::default() },
///     rotation_interval_km: 10_000,
///     alignment_interval_km: 0,
///     balancing_interval_km: 0,
/// };
///
/// let report = compute_progress(&vehicle, &[record], &EngineConfig::default());
/// assert_eq!(report.rotation.consumed_fraction, 50.0);
/// assert_eq!(report.rotation.remaining_distance, 5_000);
/// assert_eq!(report.rotation.next_due_odometer, 50_000);
/// assert!(!report.alignment.has_history());
/// ```
pub fn compute_progress(
    vehicle: &Vehicle,
    records: &[MaintenanceRecord],
    config: &EngineConfig,
) -> ProgressReport {
    let owned: Vec<&MaintenanceRecord> = records
        .iter()
        .filter(|record| !record.vehicle_id.is_empty() && record.vehicle_id == vehicle.id)
        .collect();

    if owned.len() != records.len() {
        debug!(
            "Ignored {} record(s) not belonging to vehicle {}",
            records.len() - owned.len(),
            vehicle.id
        );
    }

    ProgressReport {
        vehicle_id: vehicle.id.clone(),
        odometer_known: vehicle.current_odometer.is_some(),
        rotation: service_progress(vehicle, &owned, ServiceType::Rotation, config),
        alignment: service_progress(vehicle, &owned, ServiceType::Alignment, config),
        balancing: service_progress(vehicle, &owned, ServiceType::Balancing, config),
    }
}

/// Progress for a single service type over records already filtered to
/// `vehicle`.
pub fn service_progress(
    vehicle: &Vehicle,
    records: &[&MaintenanceRecord],
    service: ServiceType,
    config: &EngineConfig,
) -> ServiceProgress {
    let anchor = match find_anchor(records, service) {
        Some(anchor) => anchor,
        None => {
            debug!("No {} history for vehicle {}", service.as_str(), vehicle.id);
            return ServiceProgress::no_history();
        }
    };

    let interval = effective_interval(anchor, service, config);
    // Odometer rollback or entry errors can put the anchor ahead of the
    // current reading; traveled distance never goes below zero.
    let traveled = vehicle.odometer_or_zero().saturating_sub(anchor.odometer_at_service);
    let consumed_fraction = consumed_percentage(traveled, interval);

    debug!(
        "Vehicle {} {}: anchor {} at {} km, traveled {} of {} km",
        vehicle.id,
        service.as_str(),
        anchor.id,
        anchor.odometer_at_service,
        traveled,
        interval
    );

    ServiceProgress {
        consumed_fraction,
        remaining_distance: interval.saturating_sub(traveled),
        interval_distance: interval,
        last_service_record: Some(anchor.clone()),
        next_due_odometer: anchor.odometer_at_service.saturating_add(interval),
        status: classify(vehicle, consumed_fraction, config),
    }
}

/// Most recent qualifying record; equal dates prefer the higher odometer.
pub fn find_anchor<'a>(
    records: &[&'a MaintenanceRecord],
    service: ServiceType,
) -> Option<&'a MaintenanceRecord> {
    records
        .iter()
        .copied()
        .filter(|record| record.anchors(service))
        .max_by(|a, b| {
            a.service_date
                .cmp(&b.service_date)
                .then(a.odometer_at_service.cmp(&b.odometer_at_service))
        })
}

/// The record's own interval when positive, the configured default otherwise.
/// A zero default falls back to [`DEFAULT_INTERVAL_KM`].
pub fn effective_interval(record: &MaintenanceRecord, service: ServiceType, config: &EngineConfig) -> u64 {
    match (record.interval_for(service), config.default_interval_km) {
        (0, 0) => DEFAULT_INTERVAL_KM,
        (0, default) => default,
        (interval, _) => interval,
    }
}

fn consumed_percentage(traveled: u64, interval: u64) -> f64 {
    if interval == 0 {
        return 0.0;
    }
    let percentage = traveled as f64 / interval as f64 * 100.0;
    if percentage.is_finite() {
        percentage.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn classify(vehicle: &Vehicle, consumed_fraction: f64, config: &EngineConfig) -> ServiceStatus {
    if vehicle.current_odometer.is_none() {
        ServiceStatus::OdometerUnknown
    } else if consumed_fraction >= 100.0 {
        ServiceStatus::Due
    } else if consumed_fraction >= config.due_soon_threshold {
        ServiceStatus::DueSoon
    } else {
        ServiceStatus::OnSchedule
    }
}
