/// The event records reconstructed from a log.
///
/// Every record carries a normalized timestamp (seconds since the earliest record of its batch,
/// see normalize.rs) and one of a closed set of kinds.  Records are immutable once the parser has
/// emitted them.
///
/// Memory sizes are in MB as printed by the collector (which truncates), region counts are plain
/// counts, and durations carry their unit in the field name.  Optional fields are None when the log
/// line simply does not carry the datum; they are never filled with invented defaults.
use serde::{Serialize, Serializer};
use std::fmt;
use ustr::Ustr;

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: f64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Pause(PauseEvent),
    ConcurrentPhase(ConcurrentPhaseEvent),
    PageSizing(PageSizingEvent),
    CollectionCause(CollectionCauseEvent),
    HeapPause(HeapPauseEvent),
    Scaling(ScalingEvent),
    RegionTransition(RegionTransitionEvent),
    SizingActivity(SizingActivityEvent),
}

/// The record categories, used for lookups and for reporting which category came up empty.

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Pause,
    ConcurrentPhase,
    PageSizing,
    CollectionCause,
    HeapPause,
    Scaling,
    RegionTransition,
    SizingActivity,
}

pub const ALL_CATEGORIES: [Category; 8] = [
    Category::HeapPause,
    Category::Scaling,
    Category::RegionTransition,
    Category::SizingActivity,
    Category::Pause,
    Category::ConcurrentPhase,
    Category::PageSizing,
    Category::CollectionCause,
];

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Pause => "pause",
            Category::ConcurrentPhase => "concurrent phase",
            Category::PageSizing => "page sizing",
            Category::CollectionCause => "collection cause",
            Category::HeapPause => "heap pause",
            Category::Scaling => "scaling",
            Category::RegionTransition => "region transition",
            Category::SizingActivity => "sizing activity",
        };
        f.write_str(s)
    }
}

impl EventKind {
    pub fn category(&self) -> Category {
        match self {
            EventKind::Pause(_) => Category::Pause,
            EventKind::ConcurrentPhase(_) => Category::ConcurrentPhase,
            EventKind::PageSizing(_) => Category::PageSizing,
            EventKind::CollectionCause(_) => Category::CollectionCause,
            EventKind::HeapPause(_) => Category::HeapPause,
            EventKind::Scaling(_) => Category::Scaling,
            EventKind::RegionTransition(_) => Category::RegionTransition,
            EventKind::SizingActivity(_) => Category::SizingActivity,
        }
    }

    /// The grouping key and duration of a stop-the-world pause, for either collector family.  For
    /// the region-based collector the key is the composed pause name; for the low-pause collector
    /// it is "<Generation> Pause <type>", or "Pause <type>" when the log has no generations.
    pub fn pause_key(&self) -> Option<(String, f64)> {
        match self {
            EventKind::HeapPause(p) => Some((p.pause_name.to_string(), p.duration_ms)),
            EventKind::Pause(p) => {
                let key = match p.generation {
                    Some(g) => format!("{g} Pause {}", p.pause_type),
                    None => format!("Pause {}", p.pause_type),
                };
                Some((key, p.duration_ms))
            }
            _ => None,
        }
    }
}

/// Generation of a low-pause collector record.  A one-letter code that isn't recognized maps to
/// Unknown; logs from the non-generational collector have no generation at all (None).

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Generation {
    Young,
    Old,
    Unknown,
}

impl Generation {
    pub fn from_code(code: &str) -> Generation {
        match code.to_ascii_uppercase().as_str() {
            "Y" => Generation::Young,
            "O" => Generation::Old,
            _ => Generation::Unknown,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Generation::Young => "Young",
            Generation::Old => "Old",
            Generation::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PauseEvent {
    pub gc_id: u64,
    pub generation: Option<Generation>,
    #[serde(serialize_with = "ser_ustr")]
    pub pause_type: Ustr,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcurrentPhaseEvent {
    pub gc_id: u64,
    pub generation: Option<Generation>,
    #[serde(serialize_with = "ser_ustr")]
    pub phase_type: Ustr,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSizingEvent {
    pub gc_id: u64,
    pub generation: Option<Generation>,
    #[serde(serialize_with = "ser_ustr")]
    pub page_type: Ustr,
    pub candidates: u64,
    pub selected: u64,
    pub in_place: u64,
    pub size_mb: f64,
    pub empty_mb: f64,
    pub relocated_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionCauseEvent {
    pub gc_id: u64,
    #[serde(serialize_with = "ser_ustr")]
    pub collection_type: Ustr,
    #[serde(serialize_with = "ser_ustr")]
    pub cause: Ustr,
    pub before_mb: u64,
    pub before_pct: u32,
    pub after_mb: u64,
    pub after_pct: u32,
    /// Absent for the non-generational collector, which doesn't log it on this line.
    pub duration_s: Option<f64>,
}

/// A region-based collector pause with heap occupancy before and after.  `total_heap_before_mb`
/// is not in the log line: it is the `total_heap_after_mb` of the preceding heap pause (0 for the
/// first one), which is how capacity before the pause is known.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapPauseEvent {
    pub gc_id: Option<u64>,
    pub heap_before_mb: u64,
    pub heap_after_mb: u64,
    pub total_heap_after_mb: u64,
    pub total_heap_before_mb: u64,
    #[serde(serialize_with = "ser_ustr")]
    pub pause_name: Ustr,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingEvent {
    pub gc_id: u64,
    pub user_s: f64,
    pub sys_s: f64,
    pub real_s: f64,
    /// user_s / real_s, +infinity when real_s is zero.  (Serialized as null in that case, as json
    /// has no infinity.)
    pub scaling_factor: f64,
}

impl ScalingEvent {
    pub fn new(gc_id: u64, user_s: f64, sys_s: f64, real_s: f64) -> ScalingEvent {
        let scaling_factor = if real_s == 0.0 {
            f64::INFINITY
        } else {
            user_s / real_s
        };
        ScalingEvent {
            gc_id,
            user_s,
            sys_s,
            real_s,
            scaling_factor,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RegionType {
    Eden,
    Survivor,
    Old,
    Humongous,
}

pub const ALL_REGION_TYPES: [RegionType; 4] = [
    RegionType::Eden,
    RegionType::Survivor,
    RegionType::Old,
    RegionType::Humongous,
];

impl RegionType {
    pub fn from_label(label: &str) -> Option<RegionType> {
        match label {
            "Eden" => Some(RegionType::Eden),
            "Survivor" => Some(RegionType::Survivor),
            "Old" => Some(RegionType::Old),
            "Humongous" => Some(RegionType::Humongous),
            _ => None,
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTransitionEvent {
    pub gc_id: u64,
    pub region_type: RegionType,
    pub before_count: u64,
    pub after_count: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingType {
    HeapSizingEnabled,
    HeapSizingDisabled,
    HeapSizingInit,
    SizingParameters,
    UncommitEvaluationStart,
    UncommitEvaluationScan,
    TimeBasedScanResult,
    TimeBasedEvaluationShrink,
    TimeBasedEvaluationNoUncommit,
    TimeBasedRequest,
    TimeBasedProcessing,
    TimeBasedUncommit,
    TimeBasedCandidate,
    TimeBasedDeactivateRegion,
    HeapShrinkCompleted,
    HeapShrinkDetails,
    RegionStateTransition,
}

impl SizingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizingType::HeapSizingEnabled => "heap_sizing_enabled",
            SizingType::HeapSizingDisabled => "heap_sizing_disabled",
            SizingType::HeapSizingInit => "heap_sizing_init",
            SizingType::SizingParameters => "sizing_parameters",
            SizingType::UncommitEvaluationStart => "uncommit_evaluation_start",
            SizingType::UncommitEvaluationScan => "uncommit_evaluation_scan",
            SizingType::TimeBasedScanResult => "time_based_scan_result",
            SizingType::TimeBasedEvaluationShrink => "time_based_evaluation_shrink",
            SizingType::TimeBasedEvaluationNoUncommit => "time_based_evaluation_no_uncommit",
            SizingType::TimeBasedRequest => "time_based_request",
            SizingType::TimeBasedProcessing => "time_based_processing",
            SizingType::TimeBasedUncommit => "time_based_uncommit",
            SizingType::TimeBasedCandidate => "time_based_candidate",
            SizingType::TimeBasedDeactivateRegion => "time_based_deactivate_region",
            SizingType::HeapShrinkCompleted => "heap_shrink_completed",
            SizingType::HeapShrinkDetails => "heap_shrink_details",
            SizingType::RegionStateTransition => "region_state_transition",
        }
    }

    /// Records that only appear when the time-based (uncommit-only) sizing policy is active.
    pub fn is_time_based_marker(&self) -> bool {
        matches!(
            self,
            SizingType::TimeBasedEvaluationShrink
                | SizingType::TimeBasedEvaluationNoUncommit
                | SizingType::TimeBasedUncommit
                | SizingType::TimeBasedRequest
                | SizingType::TimeBasedProcessing
                | SizingType::TimeBasedScanResult
        )
    }
}

impl fmt::Display for SizingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One heap sizing record.  Which optional fields are present depends on the sizing type and on
/// which lines of an evaluation sequence were logged.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingActivityEvent {
    pub sizing_type: SizingType,
    pub sizing_mode: Option<String>,
    pub interval_ms: Option<u64>,
    pub delay_ms: Option<u64>,
    pub inactive_regions: Option<u64>,
    pub inactive_required: Option<u64>,
    pub requested_regions: Option<u64>,
    pub total_empty_regions: Option<u64>,
    pub uncommit_regions: Option<u64>,
    pub uncommit_mb: Option<f64>,
    pub shrink_mb: Option<f64>,
    pub heap_size_mb: Option<f64>,
    pub heap_bytes: Option<u64>,
    pub min_heap_bytes: Option<u64>,
    pub region_id: Option<u64>,
    pub last_access_ms: Option<u64>,
    pub transition_state: Option<String>,
}

impl SizingActivityEvent {
    pub fn new(sizing_type: SizingType) -> SizingActivityEvent {
        SizingActivityEvent {
            sizing_type,
            sizing_mode: None,
            interval_ms: None,
            delay_ms: None,
            inactive_regions: None,
            inactive_required: None,
            requested_regions: None,
            total_empty_regions: None,
            uncommit_regions: None,
            uncommit_mb: None,
            shrink_mb: None,
            heap_size_mb: None,
            heap_bytes: None,
            min_heap_bytes: None,
            region_id: None,
            last_access_ms: None,
            transition_state: None,
        }
    }
}

fn ser_ustr<S: Serializer>(u: &Ustr, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(u.as_str())
}

#[test]
fn test_scaling_factor() {
    let s = ScalingEvent::new(1, 0.04, 0.01, 0.02);
    assert!((s.scaling_factor - 2.0).abs() < 1e-9);
    let s = ScalingEvent::new(1, 0.04, 0.01, 0.0);
    assert!(s.scaling_factor == f64::INFINITY);
}

#[test]
fn test_generation_codes() {
    assert!(Generation::from_code("Y") == Generation::Young);
    assert!(Generation::from_code("o") == Generation::Old);
    assert!(Generation::from_code("X") == Generation::Unknown);
}

#[test]
fn test_pause_key() {
    let k = EventKind::Pause(PauseEvent {
        gc_id: 3,
        generation: Some(Generation::Young),
        pause_type: Ustr::from("Mark Start"),
        duration_ms: 0.5,
    });
    assert!(k.pause_key() == Some(("Young Pause Mark Start".to_string(), 0.5)));
    let k = EventKind::Pause(PauseEvent {
        gc_id: 3,
        generation: None,
        pause_type: Ustr::from("Relocate"),
        duration_ms: 0.25,
    });
    assert!(k.pause_key() == Some(("Pause Relocate".to_string(), 0.25)));
    let k = EventKind::RegionTransition(RegionTransitionEvent {
        gc_id: 1,
        region_type: RegionType::Eden,
        before_count: 1,
        after_count: 0,
    });
    assert!(k.pause_key().is_none());
}
