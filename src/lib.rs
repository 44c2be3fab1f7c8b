//! # Fleet Maintenance Core
//!
//! Odometer-interval maintenance tracking for vehicle fleets, built for FFI
//! integration with Flutter and other cross-platform hosts.
//!
//! ## Features
//!
//! - **Interval progress**: how much of the rotation, alignment and balancing
//!   intervals a vehicle has consumed, and the odometer reading at which each
//!   is due next
//! - **Tread-life comparison**: which of two vehicles covers more distance per
//!   service interval, with an advisory note on auxiliary services
//! - **Normalization boundary**: loosely typed store records are coerced once,
//!   on the way in
//! - **Memoized recalculation**: reports are recomputed only when an odometer
//!   or the record set changes
//! - **Safe error handling**: No `unwrap()` calls in production code
//!
//! ## Quick Start
//!
//! ```no_run
//! use fleet_maintenance_core::{create_tracker, get_progress, push_record, upsert_vehicle};
//! use std::ffi::CString;
//!
//! let config = CString::new("{}").unwrap();
//! let tracker = create_tracker(config.as_ptr());
//!
//! let vehicle = CString::new(r#"{"id":"veh-1","plate":"AB-123-CD","currentOdometer":45000}"#).unwrap();
//! upsert_vehicle(tracker, vehicle.as_ptr());
//!
//! let record = CString::new(r#"{"id":"r1","vehicleId":"veh-1","serviceDate":"2024-03-01",
//!     "odometerAtService":40000,"positionsServiced":["FL","FR"],"rotation":true}"#).unwrap();
//! push_record(tracker, record.as_ptr());
//!
//! let id = CString::new("veh-1").unwrap();
//! let progress = get_progress(tracker, id.as_ptr());
//! ```
//!
//! ## FFI Functions
//!
//! Every function returns a JSON-serialized [`AppResponse`](app_response::AppResponse)
//! that must be released with [`free_response`].
//!
//! - [`create_tracker`] - Initialize a fleet snapshot
//! - [`upsert_vehicle`] - Register a vehicle or update its odometer
//! - [`push_record`] / [`update_record`] / [`delete_record`] - Record mutations
//! - [`get_record`] / [`get_all_records`] - Record reads
//! - [`get_progress`] / [`get_fleet_progress`] / [`get_due_services`] - Progress reads
//! - [`compare_vehicles`] - Compare two registered vehicles
//! - [`compute_progress`] / [`compare_histories`] - Stateless computations
//! - [`close_tracker`] - Release the snapshot

pub mod app_response;
pub mod engine_config;
pub mod fleet_comparator;
pub mod fleet_state;
pub mod maintenance_model;
pub mod progress_calculator;
pub mod record_normalizer;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::app_response::AppResponse;
use crate::engine_config::EngineConfig;
use crate::fleet_comparator::VehicleHistory;
use crate::fleet_state::FleetState;
use crate::record_normalizer::{field, normalize_history, normalize_record, normalize_records, normalize_vehicle};

/// Creates a new fleet snapshot.
///
/// # Parameters
///
/// * `config_json` - Null-terminated JSON [`EngineConfig`]; null or empty
///   means defaults
///
/// # Returns
///
/// A pointer to the [`FleetState`], or null when the configuration cannot be
/// parsed. Release it with [`close_tracker`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use fleet_maintenance_core::create_tracker;
///
/// let config = CString::new(r#"{"default_interval_km": 8000}"#).unwrap();
/// let tracker = create_tracker(config.as_ptr());
/// assert!(!tracker.is_null());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_tracker(config_json: *const c_char) -> *mut FleetState {
    let config = if config_json.is_null() {
        EngineConfig::default()
    } else {
        let raw = match unsafe { CStr::from_ptr(config_json).to_str() } {
            Ok(s) => s,
            Err(e) => {
                warn!("Invalid UTF-8 in tracker configuration: {e}");
                return std::ptr::null_mut();
            }
        };
        match EngineConfig::from_json(raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("❌ Invalid tracker configuration: {e}");
                return std::ptr::null_mut();
            }
        }
    };

    info!("✅ Fleet tracker created");
    Box::into_raw(Box::new(FleetState::init(config)))
}

/// Registers a vehicle or replaces an existing one.
///
/// Sending the same vehicle with a new `currentOdometer` is how a host reports
/// odometer changes; the next progress read recomputes.
///
/// # JSON Format
///
/// ```json
/// { "id": "veh-1", "plate": "AB-123-CD", "currentOdometer": 45000 }
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn upsert_vehicle(state: *mut FleetState, json_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "upsert_vehicle") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let raw = match c_ptr_to_json(json_ptr, "vehicle JSON") {
        Ok(raw) => raw,
        Err(err) => return err,
    };

    match state.upsert_vehicle(normalize_vehicle(&raw)) {
        Ok(vehicle) => ok_json(&vehicle),
        Err(e) => response_to_c_string(&e),
    }
}

/// Inserts a new maintenance record.
///
/// The payload goes through the normalization boundary first, so string
/// numbers, `"true"` flags and snake_case keys are all accepted.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use fleet_maintenance_core::{create_tracker, push_record};
///
/// let tracker = create_tracker(std::ptr::null());
/// let json = CString::new(r#"{"id":"r1","vehicle_id":"veh-1","service_date":"2024-03-01",
///     "odometer_at_service":"40000","alignment":1}"#).unwrap();
/// let result = push_record(tracker, json.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn push_record(state: *mut FleetState, json_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "push_record") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let raw = match c_ptr_to_json(json_ptr, "record JSON") {
        Ok(raw) => raw,
        Err(err) => return err,
    };

    match state.push(normalize_record(&raw)) {
        Ok(record) => ok_json(&record),
        Err(e) => response_to_c_string(&e),
    }
}

/// Replaces an existing record, identified by the `id` in the payload.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_record(state: *mut FleetState, json_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "update_record") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let raw = match c_ptr_to_json(json_ptr, "record JSON") {
        Ok(raw) => raw,
        Err(err) => return err,
    };

    match state.put(normalize_record(&raw)) {
        Ok(Some(record)) => ok_json(&record),
        Ok(None) => response_to_c_string(&AppResponse::NotFound("Record not found for update".to_string())),
        Err(e) => response_to_c_string(&e),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_record(state: *mut FleetState, id: *const c_char) -> *const c_char {
    let state = match state_mut(state, "delete_record") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    if state.delete_by_id(&id_str) {
        response_to_c_string(&AppResponse::success("Record deleted successfully"))
    } else {
        response_to_c_string(&AppResponse::NotFound(format!("No record found with id: {id_str}")))
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_record(state: *mut FleetState, id: *const c_char) -> *const c_char {
    let state = match state_ref(state, "get_record") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    match state.get_by_id(&id_str) {
        Some(record) => ok_json(&record),
        None => response_to_c_string(&AppResponse::NotFound(format!("No record found with id: {id_str}"))),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_all_records(state: *mut FleetState) -> *const c_char {
    match state_ref(state, "get_all_records") {
        Ok(state) => ok_json(&state.get()),
        Err(err) => err,
    }
}

/// Returns the progress report for one vehicle.
///
/// The report is served from cache until the vehicle's odometer or the
/// record set changes.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_progress(state: *mut FleetState, vehicle_id: *const c_char) -> *const c_char {
    let state = match state_ref(state, "get_progress") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let id_str = match c_ptr_to_string(vehicle_id, "vehicle id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    match state.progress(&id_str) {
        Ok(report) => ok_json(&report),
        Err(e) => response_to_c_string(&e),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_fleet_progress(state: *mut FleetState) -> *const c_char {
    match state_ref(state, "get_fleet_progress") {
        Ok(state) => ok_json(&state.fleet_progress()),
        Err(err) => err,
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_due_services(state: *mut FleetState) -> *const c_char {
    match state_ref(state, "get_due_services") {
        Ok(state) => ok_json(&state.due_services()),
        Err(err) => err,
    }
}

/// Compares two registered vehicles by distance covered per service interval.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn compare_vehicles(
    state: *mut FleetState,
    vehicle_a: *const c_char,
    vehicle_b: *const c_char,
) -> *const c_char {
    let state = match state_ref(state, "compare_vehicles") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let a = match c_ptr_to_string(vehicle_a, "first vehicle id") {
        Ok(id) => id,
        Err(err) => return err,
    };
    let b = match c_ptr_to_string(vehicle_b, "second vehicle id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    match state.compare_vehicles(&a, &b) {
        Ok(result) => ok_json(&result),
        Err(e) => response_to_c_string(&e),
    }
}

/// Stateless progress computation.
///
/// # JSON Format
///
/// ```json
/// {
///   "vehicle": { "id": "veh-1", "currentOdometer": 45000 },
///   "records": [ { "id": "r1", "vehicleId": "veh-1", "...": "..." } ],
///   "config": { "default_interval_km": 10000 }
/// }
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn compute_progress(json_ptr: *const c_char) -> *const c_char {
    let raw = match c_ptr_to_json(json_ptr, "progress JSON") {
        Ok(raw) => raw,
        Err(err) => return err,
    };
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            return response_to_c_string(&AppResponse::BadRequest(
                "Progress payload must be a JSON object".to_string(),
            ))
        }
    };

    let vehicle = match field(obj, &["vehicle"]) {
        Some(vehicle) => normalize_vehicle(vehicle),
        None => {
            return response_to_c_string(&AppResponse::BadRequest(
                "Progress payload has no 'vehicle'".to_string(),
            ))
        }
    };
    if vehicle.id.is_empty() {
        warn!("Progress payload vehicle has no id");
        return response_to_c_string(&AppResponse::BadRequest(
            "Progress payload vehicle has no 'id'".to_string(),
        ));
    }
    let records = field(obj, &["records"]).map(normalize_records).unwrap_or_default();
    let config = match field(obj, &["config"]).filter(|config| !config.is_null()) {
        Some(config) => match serde_json::from_value::<EngineConfig>(config.clone()) {
            Ok(config) => config.sanitized(),
            Err(e) => return response_to_c_string(&AppResponse::from(e)),
        },
        None => EngineConfig::default(),
    };

    ok_json(&progress_calculator::compute_progress(&vehicle, &records, &config))
}

/// Stateless two-vehicle comparison.
///
/// # JSON Format
///
/// ```json
/// {
///   "vehicleA": { "label": "AB-123-CD", "records": [ ... ] },
///   "vehicleB": { "label": "EF-456-GH", "records": [ ... ] }
/// }
/// ```
///
/// Either side may also be a bare record array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn compare_histories(json_ptr: *const c_char) -> *const c_char {
    let raw = match c_ptr_to_json(json_ptr, "comparison JSON") {
        Ok(raw) => raw,
        Err(err) => return err,
    };
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            return response_to_c_string(&AppResponse::BadRequest(
                "Comparison payload must be a JSON object".to_string(),
            ))
        }
    };

    let (label_a, records_a) = field(obj, &["vehicleA", "historyA", "a"])
        .map(normalize_history)
        .unwrap_or_default();
    let (label_b, records_b) = field(obj, &["vehicleB", "historyB", "b"])
        .map(normalize_history)
        .unwrap_or_default();

    let label_a = if label_a.is_empty() { "A".to_string() } else { label_a };
    let label_b = if label_b.is_empty() { "B".to_string() } else { label_b };

    ok_json(&fleet_comparator::compare(
        VehicleHistory::new(&label_a, &records_a),
        VehicleHistory::new(&label_b, &records_b),
    ))
}

/// Releases a response returned by any function in this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr) });
}

/// Releases a tracker created by [`create_tracker`]. The pointer must not be
/// used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_tracker(state: *mut FleetState) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_tracker".to_string());
        return response_to_c_string(&error);
    }

    drop(unsafe { Box::from_raw(state) });
    info!("Fleet tracker closed");
    response_to_c_string(&AppResponse::success("Tracker closed successfully"))
}

fn state_ref<'a>(state: *mut FleetState, caller: &str) -> Result<&'a FleetState, *const c_char> {
    match unsafe { state.as_ref() } {
        Some(s) => Ok(s),
        None => {
            warn!("Null state pointer passed to {caller}");
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn state_mut<'a>(state: *mut FleetState, caller: &str) -> Result<&'a mut FleetState, *const c_char> {
    match unsafe { state.as_mut() } {
        Some(s) => Ok(s),
        None => {
            warn!("Null state pointer passed to {caller}");
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

/// Wraps a serialized value in `AppResponse::Ok`.
fn ok_json<T: Serialize>(value: &T) -> *const c_char {
    match serde_json::to_string(value) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Converts an [`AppResponse`] to a C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust String.
///
/// On failure the `Err` side already holds the serialized error response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn c_ptr_to_json(ptr: *const c_char, field_name: &str) -> Result<JsonValue, *const c_char> {
    let raw = c_ptr_to_string(ptr, field_name)?;
    serde_json::from_str(&raw).map_err(|e| {
        let error = AppResponse::SerializationError(format!("Invalid JSON in {field_name}: {e}"));
        response_to_c_string(&error)
    })
}
