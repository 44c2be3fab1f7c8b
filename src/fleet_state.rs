//! In-memory fleet snapshot with memoized progress.
//!
//! [`FleetState`] holds the vehicles and records a host has pushed in and
//! plays the part of the recalculation trigger: a progress report is reused
//! until either the vehicle's odometer or the record set changes. Changes are
//! tracked with a revision counter that every record mutation bumps; the cache
//! key is an md5 fingerprint of `(vehicle id, odometer, revision)`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::engine_config::EngineConfig;
use crate::fleet_comparator::{compare, ComparisonResult, VehicleHistory};
use crate::maintenance_model::{
    MaintenanceRecord, ProgressReport, ServiceProgress, ServiceStatus, ServiceType, Vehicle,
};
use crate::progress_calculator::compute_progress;

/// Read access to vehicles and their records.
///
/// The comparator only needs this; it never touches progress state.
pub trait RecordSource {
    fn vehicle(&self, vehicle_id: &str) -> Option<Vehicle>;
    fn records_for(&self, vehicle_id: &str) -> Vec<MaintenanceRecord>;
}

/// Compares two vehicles pulled from any [`RecordSource`].
pub fn compare_from_source(
    source: &impl RecordSource,
    vehicle_a: &str,
    vehicle_b: &str,
) -> Result<ComparisonResult, AppResponse> {
    let a = source
        .vehicle(vehicle_a)
        .ok_or_else(|| AppResponse::NotFound(format!("No vehicle found with id: {vehicle_a}")))?;
    let b = source
        .vehicle(vehicle_b)
        .ok_or_else(|| AppResponse::NotFound(format!("No vehicle found with id: {vehicle_b}")))?;

    let history_a = source.records_for(&a.id);
    let history_b = source.records_for(&b.id);

    Ok(compare(
        VehicleHistory::new(&a.label, &history_a),
        VehicleHistory::new(&b.label, &history_b),
    ))
}

/// Hit/miss counters for the progress cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries found but discarded because their fingerprint went stale.
    pub invalidations: u64,
}

/// A service that is due or about to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueService {
    pub vehicle_id: String,
    pub vehicle_label: String,
    pub service: ServiceType,
    pub progress: ServiceProgress,
}

#[derive(Debug, Clone)]
struct CachedProgress {
    fingerprint: String,
    report: ProgressReport,
}

#[derive(Debug, Default)]
struct ProgressCache {
    entries: HashMap<String, CachedProgress>,
    stats: CacheStats,
}

pub struct FleetState {
    config: EngineConfig,
    vehicles: BTreeMap<String, Vehicle>,
    records: BTreeMap<String, MaintenanceRecord>,
    revision: u64,
    cache: Mutex<ProgressCache>,
}

impl FleetState {
    pub fn init(config: EngineConfig) -> Self {
        let config = config.sanitized();
        info!(
            "Fleet state initialized (default interval {} km, due soon at {}%, cache {})",
            config.default_interval_km,
            config.due_soon_threshold,
            if config.cache_enabled { "on" } else { "off" }
        );
        Self {
            config,
            vehicles: BTreeMap::new(),
            records: BTreeMap::new(),
            revision: 0,
            cache: Mutex::new(ProgressCache::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Revision of the record set. Bumped by every record mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Inserts or replaces a vehicle. An odometer change makes the cached
    /// report stale through its fingerprint.
    pub fn upsert_vehicle(&mut self, vehicle: Vehicle) -> Result<Vehicle, AppResponse> {
        if vehicle.id.is_empty() {
            return Err(AppResponse::ValidationError("Vehicle id cannot be empty".to_string()));
        }
        match self.vehicles.insert(vehicle.id.clone(), vehicle.clone()) {
            Some(previous) if previous.current_odometer != vehicle.current_odometer => info!(
                "Vehicle {} odometer {:?} -> {:?}",
                vehicle.id, previous.current_odometer, vehicle.current_odometer
            ),
            Some(_) => debug!("Vehicle {} replaced", vehicle.id),
            None => info!("Vehicle {} registered", vehicle.id),
        }
        Ok(vehicle)
    }

    pub fn update_odometer(&mut self, vehicle_id: &str, odometer: Option<u64>) -> Result<Vehicle, AppResponse> {
        let vehicle = self
            .vehicles
            .get_mut(vehicle_id)
            .ok_or_else(|| AppResponse::NotFound(format!("No vehicle found with id: {vehicle_id}")))?;
        info!("Vehicle {} odometer {:?} -> {:?}", vehicle_id, vehicle.current_odometer, odometer);
        vehicle.current_odometer = odometer;
        Ok(vehicle.clone())
    }

    /// Removes a vehicle and every record referencing it.
    pub fn remove_vehicle(&mut self, vehicle_id: &str) -> bool {
        if self.vehicles.remove(vehicle_id).is_none() {
            return false;
        }
        let before = self.records.len();
        self.records.retain(|_, record| record.vehicle_id != vehicle_id);
        if self.records.len() != before {
            self.bump_revision();
        }
        self.lock_cache().entries.remove(vehicle_id);
        info!("Vehicle {} removed with {} record(s)", vehicle_id, before - self.records.len());
        true
    }

    /// Inserts a new record. Ids must be unique.
    pub fn push(&mut self, record: MaintenanceRecord) -> Result<MaintenanceRecord, AppResponse> {
        validate_record(&record)?;
        if self.records.contains_key(&record.id) {
            return Err(AppResponse::ValidationError(format!(
                "A record with id '{}' already exists",
                record.id
            )));
        }
        if !self.vehicles.contains_key(&record.vehicle_id) {
            warn!("Record {} references unregistered vehicle {}", record.id, record.vehicle_id);
        }
        self.records.insert(record.id.clone(), record.clone());
        self.bump_revision();
        info!("Record {} stored for vehicle {}", record.id, record.vehicle_id);
        Ok(record)
    }

    /// Replaces an existing record. Returns `Ok(None)` when the id is unknown.
    pub fn put(&mut self, record: MaintenanceRecord) -> Result<Option<MaintenanceRecord>, AppResponse> {
        validate_record(&record)?;
        match self.records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                self.bump_revision();
                info!("Record {} updated", record.id);
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<MaintenanceRecord> {
        self.records.get(id).cloned()
    }

    /// All records, ordered by id.
    pub fn get(&self) -> Vec<MaintenanceRecord> {
        self.records.values().cloned().collect()
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.vehicles.values().cloned().collect()
    }

    pub fn delete_by_id(&mut self, id: &str) -> bool {
        match self.records.remove(id) {
            Some(record) => {
                self.bump_revision();
                info!("Record {} deleted from vehicle {}", id, record.vehicle_id);
                true
            }
            None => false,
        }
    }

    pub fn clear_all_records(&mut self) -> usize {
        let cleared = self.records.len();
        self.records.clear();
        self.bump_revision();
        info!("Cleared {} record(s)", cleared);
        cleared
    }

    /// Progress for one vehicle, served from the cache while the vehicle's
    /// odometer and the record set are unchanged.
    pub fn progress(&self, vehicle_id: &str) -> Result<ProgressReport, AppResponse> {
        let vehicle = self
            .vehicles
            .get(vehicle_id)
            .ok_or_else(|| AppResponse::NotFound(format!("No vehicle found with id: {vehicle_id}")))?;

        if !self.config.cache_enabled {
            self.lock_cache().stats.misses += 1;
            return Ok(compute_progress(vehicle, &self.records_for(vehicle_id), &self.config));
        }

        let fingerprint = self.fingerprint(vehicle);
        {
            let mut cache = self.lock_cache();
            let cached = cache
                .entries
                .get(vehicle_id)
                .map(|entry| (entry.fingerprint == fingerprint, entry.report.clone()));
            match cached {
                Some((true, report)) => {
                    cache.stats.hits += 1;
                    debug!("Progress cache hit for vehicle {}", vehicle_id);
                    return Ok(report);
                }
                Some((false, _)) => {
                    cache.stats.invalidations += 1;
                    cache.stats.misses += 1;
                    debug!("Progress cache stale for vehicle {}", vehicle_id);
                }
                None => {
                    cache.stats.misses += 1;
                    debug!("Progress cache miss for vehicle {}", vehicle_id);
                }
            }
        }

        let report = compute_progress(vehicle, &self.records_for(vehicle_id), &self.config);
        self.lock_cache().entries.insert(
            vehicle_id.to_string(),
            CachedProgress {
                fingerprint,
                report: report.clone(),
            },
        );
        Ok(report)
    }

    /// Progress for every registered vehicle, ordered by vehicle id.
    pub fn fleet_progress(&self) -> Vec<ProgressReport> {
        self.vehicles
            .keys()
            .filter_map(|id| self.progress(id).ok())
            .collect()
    }

    /// Services that are due or due soon across the fleet, most consumed first.
    pub fn due_services(&self) -> Vec<DueService> {
        let mut due: Vec<DueService> = self
            .fleet_progress()
            .into_iter()
            .flat_map(|report| {
                let label = self
                    .vehicles
                    .get(&report.vehicle_id)
                    .map(|vehicle| vehicle.label.clone())
                    .unwrap_or_else(|| report.vehicle_id.clone());
                ServiceType::ALL
                    .iter()
                    .filter(|service| {
                        matches!(
                            report.get(**service).status,
                            ServiceStatus::DueSoon | ServiceStatus::Due
                        )
                    })
                    .map(|service| DueService {
                        vehicle_id: report.vehicle_id.clone(),
                        vehicle_label: label.clone(),
                        service: *service,
                        progress: report.get(*service).clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        due.sort_by(|a, b| {
            b.progress
                .consumed_fraction
                .total_cmp(&a.progress.consumed_fraction)
                .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
                .then_with(|| a.service.cmp(&b.service))
        });
        due
    }

    pub fn compare_vehicles(&self, vehicle_a: &str, vehicle_b: &str) -> Result<ComparisonResult, AppResponse> {
        compare_from_source(self, vehicle_a, vehicle_b)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats
    }

    fn fingerprint(&self, vehicle: &Vehicle) -> String {
        let key = format!("{}|{:?}|{}", vehicle.id, vehicle.current_odometer, self.revision);
        format!("{:x}", md5::compute(key.as_bytes()))
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        debug!("Record set revision is now {}", self.revision);
    }

    fn lock_cache(&self) -> MutexGuard<'_, ProgressCache> {
        // The cache holds no invariants a panicking reader could break.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordSource for FleetState {
    fn vehicle(&self, vehicle_id: &str) -> Option<Vehicle> {
        self.vehicles.get(vehicle_id).cloned()
    }

    fn records_for(&self, vehicle_id: &str) -> Vec<MaintenanceRecord> {
        self.records
            .values()
            .filter(|record| record.vehicle_id == vehicle_id)
            .cloned()
            .collect()
    }
}

fn validate_record(record: &MaintenanceRecord) -> Result<(), AppResponse> {
    if record.id.is_empty() {
        return Err(AppResponse::ValidationError("Record id cannot be empty".to_string()));
    }
    if record.vehicle_id.is_empty() {
        return Err(AppResponse::ValidationError(format!(
            "Record '{}' has no vehicle id",
            record.id
        )));
    }
    Ok(())
}
