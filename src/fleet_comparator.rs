//! Two-vehicle tread-life comparison.
//!
//! Compares how far each vehicle travels between consecutive services and
//! attaches a qualitative note about auxiliary services (alignment and
//! balancing). The note is advisory text derived from a single pair of
//! vehicles. It is not a statistic.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::maintenance_model::MaintenanceRecord;

/// Distance figures for one vehicle's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryAnalysis {
    /// Mean kilometers per qualifying pair, rounded. 0 when nothing qualifies.
    pub average_distance_per_interval: u64,
    pub total_records: usize,
    /// Sum of strictly increasing odometer deltas between consecutive records.
    pub total_distance_covered: u64,
    pub qualifying_pairs: usize,
}

/// A labelled history handed to [`compare`].
#[derive(Debug, Clone, Copy)]
pub struct VehicleHistory<'a> {
    pub label: &'a str,
    pub records: &'a [MaintenanceRecord],
}

impl<'a> VehicleHistory<'a> {
    pub fn new(label: &'a str, records: &'a [MaintenanceRecord]) -> Self {
        Self { label, records }
    }
}

/// Per-vehicle section of a [`ComparisonResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub label: String,
    pub has_auxiliary_services: bool,
    pub total_records: usize,
    pub total_distance_covered: u64,
    pub average_distance_per_interval: u64,
    pub qualifying_pairs: usize,
}

/// What the advisory note says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    /// The winner had auxiliary services and the loser did not.
    AuxiliaryServicesMayHelp,
    /// The loser had auxiliary services and the winner did not.
    AuxiliaryServicesMayNotHelp,
    /// Both or neither vehicle had auxiliary services.
    NoCorrelationEstablished,
    /// No winner could be determined.
    InsufficientData,
}

/// Qualitative note attached to every comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryNote {
    pub kind: AdvisoryKind,
    pub message: String,
    /// Always false: the note comes from two vehicles and carries no
    /// statistical weight.
    pub statistically_significant: bool,
}

/// Which side of a comparison a vehicle was passed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonSide {
    A,
    B,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub vehicle_a: VehicleSummary,
    pub vehicle_b: VehicleSummary,
    /// Absent when the comparison is inconclusive or tied.
    pub winner_vehicle_label: Option<String>,
    /// Side that won. Unambiguous even when both labels are equal.
    pub winner: Option<ComparisonSide>,
    /// Relative improvement of the winner over the loser, 2 decimals.
    pub percent_advantage: f64,
    pub advisory: AdvisoryNote,
}

impl ComparisonResult {
    pub fn is_conclusive(&self) -> bool {
        self.winner_vehicle_label.is_some()
    }
}

/// Walks a history in date order and averages the distance between
/// consecutive services.
///
/// Pairs whose odometer does not strictly increase are skipped, so a
/// data-entry regression cannot produce negative or inflated distances.
///
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use fleet_maintenance_core::fleet_comparator::analyze_history;
/// use fleet_maintenance_core::maintenance_model::{MaintenanceRecord, ServiceFlags};
///
/// let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
/// let records: Vec<MaintenanceRecord> = [10_000, 20_000, 15_000, 30_000]
///     .iter()
///     .enumerate()
///     .map(|(i, odo)| MaintenanceRecord {
///         id: format!("r{i}"),
///         vehicle_id: "veh-1".to_string(),
///         service_date: start + Duration::days(30 * i as i64),
///         odometer_at_service: *odo,
///         positions_serviced: Vec::new(),
///         service_flags: ServiceFlags::default(),
///         rotation_interval_km: 0,
///         alignment_interval_km: 0,
///         balancing_interval_km: 0,
///     })
///     .collect();
///
/// let analysis = analyze_history(&records);
/// assert_eq!(analysis.qualifying_pairs, 2);
/// assert_eq!(analysis.average_distance_per_interval, 12_500);
/// ```
pub fn analyze_history(records: &[MaintenanceRecord]) -> HistoryAnalysis {
    if records.len() < 2 {
        return HistoryAnalysis {
            total_records: records.len(),
            ..HistoryAnalysis::default()
        };
    }

    let mut ordered: Vec<&MaintenanceRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.service_date);

    let mut total_distance_covered: u64 = 0;
    let mut qualifying_pairs: usize = 0;
    for pair in ordered.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if curr.odometer_at_service > prev.odometer_at_service {
            total_distance_covered = total_distance_covered
                .saturating_add(curr.odometer_at_service - prev.odometer_at_service);
            qualifying_pairs += 1;
        } else {
            debug!(
                "Skipping non-increasing pair {} ({} km) -> {} ({} km)",
                prev.id, prev.odometer_at_service, curr.id, curr.odometer_at_service
            );
        }
    }

    let average_distance_per_interval = if qualifying_pairs > 0 {
        (total_distance_covered as f64 / qualifying_pairs as f64).round() as u64
    } else {
        0
    };

    HistoryAnalysis {
        average_distance_per_interval,
        total_records: records.len(),
        total_distance_covered,
        qualifying_pairs,
    }
}

/// True when any record performed alignment or balancing.
pub fn has_auxiliary_services(records: &[MaintenanceRecord]) -> bool {
    records.iter().any(|record| record.service_flags.has_auxiliary())
}

/// Compares two vehicles. Never fails; short or empty histories produce an
/// inconclusive result.
pub fn compare(a: VehicleHistory<'_>, b: VehicleHistory<'_>) -> ComparisonResult {
    let summary_a = summarize(a);
    let summary_b = summarize(b);

    let avg_a = summary_a.average_distance_per_interval;
    let avg_b = summary_b.average_distance_per_interval;

    let winner_side = if avg_a == 0 || avg_b == 0 || avg_a == avg_b {
        None
    } else if avg_a > avg_b {
        Some(ComparisonSide::A)
    } else {
        Some(ComparisonSide::B)
    };
    let (winner, loser) = match winner_side {
        Some(ComparisonSide::A) => (Some(&summary_a), Some(&summary_b)),
        Some(ComparisonSide::B) => (Some(&summary_b), Some(&summary_a)),
        None => (None, None),
    };

    let (winner_vehicle_label, percent_advantage, advisory) = match (winner, loser) {
        (Some(winner), Some(loser)) => {
            let ratio = winner.average_distance_per_interval as f64
                / loser.average_distance_per_interval as f64;
            (
                Some(winner.label.clone()),
                round_to_cents((ratio - 1.0) * 100.0),
                advisory_for(winner, loser),
            )
        }
        _ => (None, 0.0, inconclusive_note(avg_a, avg_b)),
    };

    debug!(
        "Compared {} ({} km/interval) with {} ({} km/interval): winner {:?}",
        summary_a.label, avg_a, summary_b.label, avg_b, winner_side
    );

    ComparisonResult {
        vehicle_a: summary_a,
        vehicle_b: summary_b,
        winner_vehicle_label,
        winner: winner_side,
        percent_advantage,
        advisory,
    }
}

fn summarize(history: VehicleHistory<'_>) -> VehicleSummary {
    let analysis = analyze_history(history.records);
    VehicleSummary {
        label: history.label.to_string(),
        has_auxiliary_services: has_auxiliary_services(history.records),
        total_records: analysis.total_records,
        total_distance_covered: analysis.total_distance_covered,
        average_distance_per_interval: analysis.average_distance_per_interval,
        qualifying_pairs: analysis.qualifying_pairs,
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn advisory_for(winner: &VehicleSummary, loser: &VehicleSummary) -> AdvisoryNote {
    let (kind, message) = match (winner.has_auxiliary_services, loser.has_auxiliary_services) {
        (true, false) => (
            AdvisoryKind::AuxiliaryServicesMayHelp,
            format!(
                "Advisory: {} received alignment or balancing and covered more distance per interval than {}, which did not. Auxiliary services may correlate with the longer tread life; two vehicles are not enough to establish it.",
                winner.label, loser.label
            ),
        ),
        (false, true) => (
            AdvisoryKind::AuxiliaryServicesMayNotHelp,
            format!(
                "Advisory: {} covered more distance per interval without alignment or balancing, while {} received them. Auxiliary services do not appear to correlate with tread life in this pair; two vehicles are not enough to establish it.",
                winner.label, loser.label
            ),
        ),
        _ => (
            AdvisoryKind::NoCorrelationEstablished,
            "Advisory: both vehicles share the same auxiliary service pattern, so no correlation between alignment or balancing and tread life can be established from this pair.".to_string(),
        ),
    };

    AdvisoryNote {
        kind,
        message,
        statistically_significant: false,
    }
}

fn inconclusive_note(avg_a: u64, avg_b: u64) -> AdvisoryNote {
    let message = if avg_a > 0 && avg_a == avg_b {
        "Advisory: both vehicles cover the same distance per interval; no winner and no correlation can be established.".to_string()
    } else {
        "Advisory: at least one vehicle lacks two services with increasing odometer readings; the comparison is inconclusive.".to_string()
    };
    AdvisoryNote {
        kind: AdvisoryKind::InsufficientData,
        message,
        statistically_significant: false,
    }
}
