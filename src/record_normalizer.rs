//! Normalization boundary between the record store and the engine.
//!
//! Upstream stores hand over records as loosely typed JSON: numbers arrive as
//! strings, keys come in camelCase or snake_case, flags are encoded as
//! `"true"` or `1`. This module is the only place those shapes are tolerated.
//! Everything it returns is a strict [`MaintenanceRecord`] or [`Vehicle`], and
//! nothing downstream re-validates types.
//!
//! Normalization never fails. Each fallback is logged with `warn!`:
//!
//! | input                         | result                         |
//! |-------------------------------|--------------------------------|
//! | negative / non-numeric number | `0`                            |
//! | missing or null flag          | `false`                        |
//! | null `positionsServiced`      | empty list                     |
//! | unparseable date              | Unix epoch                     |

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::warn;
use serde_json::{Map, Value as JsonValue};

use crate::maintenance_model::{MaintenanceRecord, ServiceFlags, Vehicle};

/// Normalizes a single raw record.
///
/// ```rust
/// use fleet_maintenance_core::record_normalizer::normalize_record;
/// use serde_json::json;
///
/// let record = normalize_record(&json!({
///     "id": 7,
///     "vehicleId": "veh-1",
///     "serviceDate": "2024-03-01",
///     "odometerAtService": "40000",
///     "positionsServiced": ["FL", "FR"],
///     "rotation": "true",
///     "rotationIntervalKm": -5
/// }));
///
/// assert_eq!(record.id, "7");
/// assert_eq!(record.odometer_at_service, 40_000);
/// assert!(record.service_flags.rotation);
/// assert!(!record.service_flags.alignment);
/// assert_eq!(record.rotation_interval_km, 0);
/// ```
pub fn normalize_record(raw: &JsonValue) -> MaintenanceRecord {
    let empty = Map::new();
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            warn!("Record payload is not an object: {raw}");
            &empty
        }
    };

    let flags_obj = field(obj, &["serviceFlags", "flags"]).and_then(JsonValue::as_object);
    let flag = |name: &str| -> bool {
        flags_obj
            .and_then(|flags| field(flags, &[name]))
            .or_else(|| field(obj, &[name]))
            .map(|value| coerce_bool(value, name))
            .unwrap_or(false)
    };

    MaintenanceRecord {
        id: coerce_id(field(obj, &["id"])),
        vehicle_id: coerce_id(field(obj, &["vehicleId"])),
        service_date: coerce_date(field(obj, &["serviceDate", "date"])),
        odometer_at_service: field(obj, &["odometerAtService", "odometer", "mileage"])
            .map(|value| coerce_u64(value, "odometerAtService"))
            .unwrap_or(0),
        positions_serviced: coerce_positions(field(obj, &["positionsServiced", "positions"])),
        service_flags: ServiceFlags {
            rotation: flag("rotation"),
            alignment: flag("alignment"),
            balancing: flag("balancing"),
        },
        rotation_interval_km: interval(obj, "rotationIntervalKm"),
        alignment_interval_km: interval(obj, "alignmentIntervalKm"),
        balancing_interval_km: interval(obj, "balancingIntervalKm"),
    }
}

/// Normalizes a list of raw records. A single object is accepted as a list of
/// one; anything else yields an empty list.
pub fn normalize_records(raw: &JsonValue) -> Vec<MaintenanceRecord> {
    match raw {
        JsonValue::Array(items) => items.iter().map(normalize_record).collect(),
        JsonValue::Object(_) => vec![normalize_record(raw)],
        JsonValue::Null => Vec::new(),
        other => {
            warn!("Record list payload is neither an array nor an object: {other}");
            Vec::new()
        }
    }
}

/// Normalizes one side of a comparison payload.
///
/// Accepts either a bare record array (the label is then empty) or an object
/// carrying `label`/`plate` and `records`/`history`.
pub fn normalize_history(raw: &JsonValue) -> (String, Vec<MaintenanceRecord>) {
    match raw {
        JsonValue::Object(obj) => {
            let label = field(obj, &["label", "plate", "licensePlate", "vehicleId", "id"])
                .map(|value| coerce_id(Some(value)))
                .unwrap_or_default();
            let records = field(obj, &["records", "history"])
                .map(normalize_records)
                .unwrap_or_default();
            (label, records)
        }
        other => (String::new(), normalize_records(other)),
    }
}

/// Normalizes a raw vehicle.
///
/// A missing, null or non-numeric odometer becomes `None` so callers can tell
/// "no data" apart from a reading of zero. The label falls back to the plate,
/// then to the id.
pub fn normalize_vehicle(raw: &JsonValue) -> Vehicle {
    let empty = Map::new();
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            warn!("Vehicle payload is not an object: {raw}");
            &empty
        }
    };

    let id = coerce_id(field(obj, &["id", "vehicleId"]));
    let label = field(obj, &["label", "plate", "licensePlate"])
        .map(|value| coerce_id(Some(value)))
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| id.clone());
    let current_odometer = field(obj, &["currentOdometer", "odometer", "currentMileage"])
        .and_then(coerce_optional_u64);

    Vehicle {
        id,
        label,
        current_odometer,
    }
}

/// Looks a key up ignoring case, underscores and dashes, so `vehicleId`,
/// `vehicle_id` and `VEHICLE-ID` all match. The first candidate present wins.
pub(crate) fn field<'a>(obj: &'a Map<String, JsonValue>, candidates: &[&str]) -> Option<&'a JsonValue> {
    candidates.iter().find_map(|candidate| {
        let wanted = canonical_key(candidate);
        obj.iter()
            .find(|(key, _)| canonical_key(key) == wanted)
            .map(|(_, value)| value)
    })
}

fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn interval(obj: &Map<String, JsonValue>, name: &str) -> u64 {
    field(obj, &[name]).map(|value| coerce_u64(value, name)).unwrap_or(0)
}

fn coerce_id(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.trim().to_string(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => {
            warn!("Unexpected identifier shape: {other}");
            other.to_string()
        }
    }
}

/// Coerces a numeric field to a non-negative integer. Fractions are rounded.
pub(crate) fn coerce_u64(value: &JsonValue, name: &str) -> u64 {
    match parse_number(value) {
        Some(n) if n.is_finite() && n > 0.0 => {
            if n >= u64::MAX as f64 {
                u64::MAX
            } else {
                n.round() as u64
            }
        }
        Some(n) if n.is_finite() => {
            if n < 0.0 {
                warn!("Negative value {n} for '{name}', using 0");
            }
            0
        }
        Some(_) | None => {
            if !value.is_null() {
                warn!("Non-numeric value {value} for '{name}', using 0");
            }
            0
        }
    }
}

fn coerce_optional_u64(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) if s.trim().is_empty() => None,
        other => match parse_number(other) {
            Some(n) if n.is_finite() => Some(coerce_u64(other, "currentOdometer")),
            _ => {
                warn!("Non-numeric odometer {other}, treating it as unknown");
                None
            }
        },
    }
}

fn parse_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Strict boolean coercion. Only explicit truthy encodings count; anything
/// unrecognized is false.
pub(crate) fn coerce_bool(value: &JsonValue, name: &str) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64() == Some(1.0),
        JsonValue::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            match s.as_str() {
                "true" | "1" | "yes" | "y" | "on" => true,
                "false" | "0" | "no" | "n" | "off" | "" => false,
                _ => {
                    warn!("Unrecognized boolean '{s}' for '{name}', using false");
                    false
                }
            }
        }
        JsonValue::Null => false,
        other => {
            warn!("Unrecognized boolean {other} for '{name}', using false");
            false
        }
    }
}

fn coerce_positions(value: Option<&JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(JsonValue::String(s)) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                if let Ok(parsed) = serde_json::from_str::<JsonValue>(trimmed) {
                    return coerce_positions(Some(&parsed));
                }
            }
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        }
        Some(JsonValue::Null) | None => Vec::new(),
        Some(other) => {
            warn!("Unexpected positionsServiced shape {other}, using an empty list");
            Vec::new()
        }
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD`, naive `YYYY-MM-DD HH:MM:SS`
/// (read as UTC) and epoch milliseconds.
fn coerce_date(value: Option<&JsonValue>) -> DateTime<Utc> {
    let parsed = match value {
        Some(JsonValue::String(s)) => parse_date_str(s.trim()),
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        warn!("Missing or unparseable serviceDate {value:?}, using the Unix epoch");
        DateTime::<Utc>::default()
    })
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
