/// Extractors, one per grammar: pure functions from the captures of a matched line to a record.
///
/// Numeric captures are converted to their declared type; an extractor returns None only if a
/// conversion fails (which in practice means an integer too large for its field), and the caller
/// then drops the line.  Optional groups that did not participate become None fields.
///
/// Timestamps are not handled here, the parser attaches them (see logfile.rs).
use crate::events::{
    CollectionCauseEvent, ConcurrentPhaseEvent, EventKind, Generation, HeapPauseEvent,
    PageSizingEvent, PauseEvent, RegionTransitionEvent, RegionType, ScalingEvent,
    SizingActivityEvent, SizingType,
};
use crate::sizing::SizingLine;

use regex::Captures;
use std::str::FromStr;
use ustr::Ustr;

pub enum Extracted {
    /// A complete record.  For heap pauses the capacity before the pause is filled in later.
    Event(EventKind),
    /// A line of the heap sizing instrumentation, to be run through the sequence reconstructor.
    Sizing(SizingLine),
    RegionSize(u64),
    Version(String),
    /// The line matched but carries nothing of interest (an unknown region label, say).
    Ignored,
}

pub type Extractor = fn(&Captures) -> Option<Extracted>;

fn num<T: FromStr>(c: &Captures, i: usize) -> Option<T> {
    c.get(i)?.as_str().parse::<T>().ok()
}

// A share of the heap, at most 100.
fn pct(c: &Captures, i: usize) -> Option<u32> {
    num(c, i).filter(|p| *p <= 100)
}

fn text<'a>(c: &Captures<'a>, i: usize) -> Option<&'a str> {
    c.get(i).map(|m| m.as_str())
}

fn sizing(line: SizingLine) -> Option<Extracted> {
    Some(Extracted::Sizing(line))
}

fn event(kind: EventKind) -> Option<Extracted> {
    Some(Extracted::Event(kind))
}

/// Compose the grouping name of a region-based collector pause from the phase, the description
/// clause and the cause clause.
///
/// A description naming a mixed or concurrent-start collection takes the place of the phase, and
/// is then used up.  A description mentioning an explicit System.gc() sets the cause.  The name is
/// the phase followed by the cause if there is one, else by the remaining description.

pub fn compose_pause_name(pause_type: &str, description: Option<&str>, cause: Option<&str>) -> String {
    let mut pause_type = pause_type;
    let mut description = description;
    let mut cause = cause;
    if let Some(d) = description {
        if d.contains("System.gc()") {
            cause = Some("SystemGC");
        }
        if d.contains("Mixed") || d.contains("Concurrent Start") {
            pause_type = d;
            description = None;
        }
    }
    match (cause, description) {
        (Some(c), _) => format!("{pause_type} {c}"),
        (None, Some(d)) => format!("{pause_type} {d}"),
        (None, None) => pause_type.to_string(),
    }
}

pub fn region_size(c: &Captures) -> Option<Extracted> {
    Some(Extracted::RegionSize(num(c, 1)?))
}

pub fn version(c: &Captures) -> Option<Extracted> {
    Some(Extracted::Version(text(c, 1)?.to_string()))
}

pub fn heap_pause(c: &Captures) -> Option<Extracted> {
    let gc_id = match c.get(1) {
        Some(_) => Some(num(c, 1)?),
        None => None,
    };
    let name = compose_pause_name(text(c, 2)?, text(c, 3), text(c, 4));
    event(EventKind::HeapPause(HeapPauseEvent {
        gc_id,
        heap_before_mb: num(c, 5)?,
        heap_after_mb: num(c, 6)?,
        total_heap_after_mb: num(c, 7)?,
        total_heap_before_mb: 0,
        pause_name: Ustr::from(&name),
        duration_ms: num(c, 8)?,
    }))
}

pub fn scaling(c: &Captures) -> Option<Extracted> {
    event(EventKind::Scaling(ScalingEvent::new(
        num(c, 1)?,
        num(c, 2)?,
        num(c, 3)?,
        num(c, 4)?,
    )))
}

pub fn region_transition(c: &Captures) -> Option<Extracted> {
    let Some(region_type) = RegionType::from_label(text(c, 2)?) else {
        return Some(Extracted::Ignored);
    };
    event(EventKind::RegionTransition(RegionTransitionEvent {
        gc_id: num(c, 1)?,
        region_type,
        before_count: num(c, 3)?,
        after_count: num(c, 4)?,
    }))
}

pub fn generational_pause(c: &Captures) -> Option<Extracted> {
    event(EventKind::Pause(PauseEvent {
        gc_id: num(c, 1)?,
        generation: Some(Generation::from_code(text(c, 2)?)),
        pause_type: Ustr::from(text(c, 3)?.trim()),
        duration_ms: num(c, 4)?,
    }))
}

pub fn generational_concurrent_phase(c: &Captures) -> Option<Extracted> {
    event(EventKind::ConcurrentPhase(ConcurrentPhaseEvent {
        gc_id: num(c, 1)?,
        generation: Some(Generation::from_code(text(c, 2)?)),
        phase_type: Ustr::from(text(c, 3)?.trim()),
        duration_ms: num(c, 4)?,
    }))
}

pub fn generational_page_sizing(c: &Captures) -> Option<Extracted> {
    event(EventKind::PageSizing(PageSizingEvent {
        gc_id: num(c, 1)?,
        generation: Some(Generation::from_code(text(c, 2)?)),
        page_type: Ustr::from(text(c, 3)?),
        candidates: num(c, 4)?,
        selected: num(c, 5)?,
        in_place: num(c, 6)?,
        size_mb: num(c, 7)?,
        empty_mb: num(c, 8)?,
        relocated_mb: num(c, 9)?,
    }))
}

pub fn generational_collection_cause(c: &Captures) -> Option<Extracted> {
    event(EventKind::CollectionCause(CollectionCauseEvent {
        gc_id: num(c, 1)?,
        collection_type: Ustr::from(&format!("{} Collection", text(c, 2)?)),
        cause: Ustr::from(text(c, 3)?),
        before_mb: num(c, 4)?,
        before_pct: pct(c, 5)?,
        after_mb: num(c, 6)?,
        after_pct: pct(c, 7)?,
        duration_s: Some(num(c, 8)?),
    }))
}

pub fn legacy_pause(c: &Captures) -> Option<Extracted> {
    event(EventKind::Pause(PauseEvent {
        gc_id: num(c, 1)?,
        generation: None,
        pause_type: Ustr::from(text(c, 2)?),
        duration_ms: num(c, 3)?,
    }))
}

pub fn legacy_concurrent_phase(c: &Captures) -> Option<Extracted> {
    event(EventKind::ConcurrentPhase(ConcurrentPhaseEvent {
        gc_id: num(c, 1)?,
        generation: None,
        phase_type: Ustr::from(text(c, 2)?),
        duration_ms: num(c, 3)?,
    }))
}

pub fn legacy_collection_cause(c: &Captures) -> Option<Extracted> {
    event(EventKind::CollectionCause(CollectionCauseEvent {
        gc_id: num(c, 1)?,
        collection_type: Ustr::from("Garbage Collection"),
        cause: Ustr::from(text(c, 2)?),
        before_mb: num(c, 3)?,
        before_pct: pct(c, 4)?,
        after_mb: num(c, 5)?,
        after_pct: pct(c, 6)?,
        duration_s: None,
    }))
}

// Heap sizing.  The role of each line in an evaluation sequence is decided here, the sequence
// itself is reconstructed in sizing.rs.

pub fn sizing_status(c: &Captures) -> Option<Extracted> {
    let ty = if text(c, 1)? == "enabled" {
        SizingType::HeapSizingEnabled
    } else {
        SizingType::HeapSizingDisabled
    };
    let mut e = SizingActivityEvent::new(ty);
    e.sizing_mode = text(c, 2).map(|s| s.to_string());
    sizing(SizingLine::Standalone(e))
}

pub fn sizing_init(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::HeapSizingInit);
    e.sizing_mode = Some(text(c, 1)?.to_string());
    sizing(SizingLine::Standalone(e))
}

pub fn sizing_parameters(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::SizingParameters);
    e.interval_ms = Some(num(c, 1)?);
    e.delay_ms = Some(num(c, 2)?);
    sizing(SizingLine::Standalone(e))
}

pub fn sizing_parameters_seconds(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::SizingParameters);
    e.interval_ms = Some(num::<u64>(c, 1)?.checked_mul(1000)?);
    e.delay_ms = Some(num::<u64>(c, 2)?.checked_mul(1000)?);
    e.inactive_required = Some(num(c, 3)?);
    sizing(SizingLine::Standalone(e))
}

pub fn legacy_uncommit(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedUncommit);
    e.uncommit_regions = Some(num(c, 1)?);
    e.uncommit_mb = Some(num(c, 2)?);
    e.inactive_regions = Some(num(c, 3)?);
    sizing(SizingLine::Terminal(e))
}

pub fn legacy_shrink_evaluation(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
    e.shrink_mb = Some(num(c, 1)?);
    sizing(SizingLine::Standalone(e))
}

pub fn legacy_no_uncommit(_c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::Terminal(SizingActivityEvent::new(
        SizingType::TimeBasedEvaluationNoUncommit,
    )))
}

pub fn shrink_completed(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::HeapShrinkCompleted);
    e.heap_size_mb = Some(num(c, 1)?);
    sizing(SizingLine::Standalone(e))
}

pub fn shrink_details(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::HeapShrinkDetails);
    e.uncommit_regions = Some(num(c, 1)?);
    e.uncommit_mb = Some(num(c, 2)?);
    e.heap_size_mb = Some(num(c, 3)?);
    sizing(SizingLine::Terminal(e))
}

pub fn evaluation_start(_c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::Start)
}

pub fn evaluation_scan(_c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::Standalone(SizingActivityEvent::new(
        SizingType::UncommitEvaluationScan,
    )))
}

pub fn scan_result(c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::Scan {
        inactive: num(c, 1)?,
        total: num(c, 2)?,
    })
}

pub fn found_requested(c: &Captures) -> Option<Extracted> {
    let inactive: u64 = num(c, 1)?;
    let requested: u64 = num(c, 2)?;
    if inactive > 0 {
        let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
        e.inactive_regions = Some(inactive);
        e.requested_regions = Some(requested);
        sizing(SizingLine::Decision(e))
    } else {
        let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationNoUncommit);
        e.inactive_regions = Some(inactive);
        e.requested_regions = Some(requested);
        sizing(SizingLine::Terminal(e))
    }
}

pub fn found_min_required(c: &Captures) -> Option<Extracted> {
    let inactive: u64 = num(c, 1)?;
    let required: u64 = num(c, 2)?;
    if inactive >= required {
        let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
        e.inactive_regions = Some(inactive);
        e.inactive_required = Some(required);
        e.requested_regions = Some(required);
        sizing(SizingLine::Decision(e))
    } else {
        let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationNoUncommit);
        e.inactive_regions = Some(inactive);
        e.inactive_required = Some(required);
        sizing(SizingLine::Terminal(e))
    }
}

pub fn found_uncommitting(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
    e.inactive_regions = Some(num(c, 1)?);
    e.requested_regions = Some(num(c, 2)?);
    e.shrink_mb = Some(num(c, 3)?);
    sizing(SizingLine::Decision(e))
}

pub fn shrinking_by_selection(c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::ShrinkAmount {
        shrink_mb: num(c, 1)?,
    })
}

pub fn no_action_detailed(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationNoUncommit);
    e.inactive_regions = Some(num(c, 1)?);
    e.inactive_required = Some(num(c, 2)?);
    e.heap_bytes = Some(num(c, 3)?);
    e.min_heap_bytes = Some(num(c, 4)?);
    sizing(SizingLine::Terminal(e))
}

pub fn no_action_numbered(c: &Captures) -> Option<Extracted> {
    // The evaluation number is validated but not kept.
    num::<u64>(c, 1)?;
    sizing(SizingLine::Terminal(SizingActivityEvent::new(
        SizingType::TimeBasedEvaluationNoUncommit,
    )))
}

pub fn heap_evaluation_shrink(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
    e.shrink_mb = Some(num(c, 1)?);
    e.inactive_regions = Some(num(c, 2)?);
    e.inactive_required = Some(num(c, 3)?);
    e.heap_bytes = Some(num(c, 4)?);
    e.min_heap_bytes = Some(num(c, 5)?);
    sizing(SizingLine::Decision(e))
}

pub fn shrink_request(c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::Request {
        shrink_mb: num(c, 1)?,
        candidates: num(c, 2)?,
    })
}

pub fn shrink_processing(c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::Processing {
        uncommit_regions: num(c, 1)?,
        total_empty: num(c, 2)?,
    })
}

pub fn shrink_deactivated(c: &Captures) -> Option<Extracted> {
    sizing(SizingLine::Deactivated {
        count: num(c, 1)?,
    })
}

pub fn candidate_region(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedCandidate);
    e.region_id = Some(num(c, 1)?);
    e.last_access_ms = Some(num(c, 2)?);
    sizing(SizingLine::Standalone(e))
}

pub fn deactivating_region(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedDeactivateRegion);
    e.region_id = Some(num(c, 1)?);
    e.last_access_ms = Some(num(c, 2)?);
    sizing(SizingLine::Standalone(e))
}

pub fn region_state_transition(c: &Captures) -> Option<Extracted> {
    let mut e = SizingActivityEvent::new(SizingType::RegionStateTransition);
    e.region_id = Some(num(c, 1)?);
    e.transition_state = Some(format!("{}->{}", text(c, 2)?, text(c, 3)?));
    e.last_access_ms = Some(num(c, 4)?);
    sizing(SizingLine::Standalone(e))
}

#[test]
fn test_compose_pause_name() {
    assert!(
        compose_pause_name("Young", Some("Concurrent Start G1 Evacuation Pause"), None)
            == "Concurrent Start G1 Evacuation Pause"
    );
    assert!(
        compose_pause_name("Young", Some("Metadata GC Threshold (System.gc())"), None)
            == "Young SystemGC"
    );
    assert!(compose_pause_name("Young", Some("Normal"), Some("G1 Evacuation Pause")) == "Young G1 Evacuation Pause");
    assert!(compose_pause_name("Young", Some("Mixed"), Some("G1 Evacuation Pause")) == "Mixed G1 Evacuation Pause");
    assert!(
        compose_pause_name("Young", Some("Concurrent Start"), Some("G1 Humongous Allocation"))
            == "Concurrent Start G1 Humongous Allocation"
    );
    assert!(compose_pause_name("Full", Some("System.gc()"), None) == "Full SystemGC");
    assert!(compose_pause_name("Full", Some("G1 Compaction Pause"), None) == "Full G1 Compaction Pause");
    assert!(compose_pause_name("Remark", None, None) == "Remark");
}

#[cfg(test)]
fn extract_line(line: &str) -> Option<Extracted> {
    crate::grammar::classify(line, crate::dialect::Dialect::TraditionalElapsedSeconds)?.extract()
}

#[test]
fn test_extract_heap_pause() {
    let Some(Extracted::Event(EventKind::HeapPause(p))) = extract_line(
        "[0.123s][info][gc] GC(12) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.456ms",
    ) else {
        panic!("Not a heap pause")
    };
    assert!(p.gc_id == Some(12));
    assert!(p.heap_before_mb == 24);
    assert!(p.heap_after_mb == 4);
    assert!(p.total_heap_after_mb == 256);
    assert!(p.pause_name.as_str() == "Young G1 Evacuation Pause");
    assert!(p.duration_ms == 3.456);

    let Some(Extracted::Event(EventKind::HeapPause(p))) =
        extract_line("[9.000s][info][gc] Pause Full (System.gc()) 100M->20M(256M) 45.000ms")
    else {
        panic!("Not a heap pause")
    };
    assert!(p.gc_id.is_none());
    assert!(p.pause_name.as_str() == "Full SystemGC");
}

#[test]
fn test_extract_overflow() {
    assert!(extract_line(
        "[0.123s][info][gc] GC(1) Pause Young (Normal) (G1 Evacuation Pause) 99999999999999999999999M->4M(256M) 3.456ms"
    )
    .is_none());
    assert!(extract_line("[0.123s][info][gc,heap] GC(1) Eden regions: 99999999999999999999->0(20)").is_none());
}

#[test]
fn test_extract_region_transition() {
    let Some(Extracted::Event(EventKind::RegionTransition(r))) =
        extract_line("[0.123s][info][gc,heap] GC(2) Humongous regions: 3->1")
    else {
        panic!("Not a region transition")
    };
    assert!(r.gc_id == 2);
    assert!(r.region_type == RegionType::Humongous);
    assert!(r.before_count == 3 && r.after_count == 1);

    assert!(matches!(
        extract_line("[0.123s][info][gc,heap] GC(2) Archive regions: 2->2"),
        Some(Extracted::Ignored)
    ));
}

#[test]
fn test_extract_low_pause() {
    let Some(Extracted::Event(EventKind::Pause(p))) =
        extract_line("[1.020s][info][gc,phases] GC(3) O: Pause Mark End (Major) 0.021ms")
    else {
        panic!("Not a pause")
    };
    assert!(p.generation == Some(Generation::Old));
    assert!(p.pause_type.as_str() == "Mark End (Major)");
    assert!(p.duration_ms == 0.021);

    let Some(Extracted::Event(EventKind::ConcurrentPhase(p))) =
        extract_line("[1.030s][info][gc,phases] GC(3) Y: Concurrent Mark Roots 1.234ms")
    else {
        panic!("Not a concurrent phase")
    };
    assert!(p.phase_type.as_str() == "Mark Roots");

    let Some(Extracted::Event(EventKind::PageSizing(p))) =
        extract_line("[1.040s][info][gc,reloc] GC(3) Y: Small Pages: 50 20 0 100M 40M 2M")
    else {
        panic!("Not a page row")
    };
    assert!(p.page_type.as_str() == "Small");
    assert!(p.candidates == 50 && p.selected == 20 && p.in_place == 0);
    assert!(p.size_mb == 100.0 && p.empty_mb == 40.0 && p.relocated_mb == 2.0);

    let Some(Extracted::Event(EventKind::CollectionCause(p))) = extract_line(
        "[1.050s][info][gc] GC(3) Major Collection (Proactive) 200M(10%)->50M(2%) 0.030s",
    ) else {
        panic!("Not a cause")
    };
    assert!(p.collection_type.as_str() == "Major Collection");
    assert!(p.cause.as_str() == "Proactive");
    assert!(p.before_pct == 10 && p.after_pct == 2);
    assert!(p.duration_s == Some(0.030));

    let Some(Extracted::Event(EventKind::CollectionCause(p))) =
        extract_line("[2.020s][info][gc] GC(4) Garbage Collection (Warmup) 120M(6%)->40M(2%)")
    else {
        panic!("Not a cause")
    };
    assert!(p.collection_type.as_str() == "Garbage Collection");
    assert!(p.duration_s.is_none());

    // A share of the heap above 100% is not a valid record.
    assert!(
        extract_line("[2.020s][info][gc] GC(4) Garbage Collection (Warmup) 120M(250%)->40M(180%)")
            .is_none()
    );
    assert!(extract_line(
        "[1.050s][info][gc] GC(3) Major Collection (Proactive) 200M(101%)->50M(2%) 0.030s"
    )
    .is_none());

    let Some(Extracted::Event(EventKind::Pause(p))) =
        extract_line("[2.000s][info][gc,phases] GC(4) Pause Relocate Start 0.010ms")
    else {
        panic!("Not a pause")
    };
    assert!(p.generation.is_none());
    assert!(p.pause_type.as_str() == "Relocate Start");
}

#[test]
fn test_extract_sizing_roles() {
    assert!(matches!(
        extract_line("[5.0s][info][gc,sizing] Uncommit evaluation: found 3 inactive candidates (min required: 4)"),
        Some(Extracted::Sizing(SizingLine::Terminal(_)))
    ));
    assert!(matches!(
        extract_line("[5.0s][info][gc,sizing] Uncommit evaluation: found 4 inactive candidates (min required: 4)"),
        Some(Extracted::Sizing(SizingLine::Decision(_)))
    ));
    assert!(matches!(
        extract_line("[5.0s][info][gc,sizing] Time-based uncommit evaluation: found 0 inactive regions (requested 8)"),
        Some(Extracted::Sizing(SizingLine::Terminal(_)))
    ));

    let Some(Extracted::Sizing(SizingLine::Standalone(e))) = extract_line(
        "[0.01s][info][gc,init] Evaluation Interval: 60s, Uncommit Delay: 300s, Min Regions To Uncommit: 10",
    ) else {
        panic!("Not sizing parameters")
    };
    assert!(e.sizing_type == SizingType::SizingParameters);
    assert!(e.interval_ms == Some(60000) && e.delay_ms == Some(300000));
    assert!(e.inactive_required == Some(10));

    let Some(Extracted::Sizing(SizingLine::Standalone(e))) = extract_line(
        "[7.5s][trace][gc,sizing] Region state transition: Region 17 transitioning from active to inactive after 300000ms idle",
    ) else {
        panic!("Not a region state transition")
    };
    assert!(e.transition_state.as_deref() == Some("active->inactive"));
    assert!(e.region_id == Some(17) && e.last_access_ms == Some(300000));
}
