/// The parser proper: one pass over a complete log buffer, producing the record streams and the
/// metadata about the log.
///
/// NOTE:
///
/// - The buffer may be the catenation of several files, see `order_logfiles` for the order they
///   should come in.  The dialect is decided once for the whole buffer.
///
/// - Most lines in a log match nothing and are skipped.  A line that matches a grammar but whose
///   numbers don't convert is dropped and counted as discarded; it is not an error.  A timestamp
///   that doesn't convert becomes 0.0 (and is counted), the record is kept.
///
/// - Scaling records form their own stream and are rebased independently of the primary stream.
use crate::dialect::{collector_marker, detect_dialect, CollectorFamily, Dialect};
use crate::error::GcLogError;
use crate::events::{
    Category, CollectionCauseEvent, ConcurrentPhaseEvent, EventKind, HeapPauseEvent, LogEvent,
    PageSizingEvent, PauseEvent, RegionTransitionEvent, ScalingEvent, SizingActivityEvent,
    SizingType,
};
use crate::extract::Extracted;
use crate::grammar::classify;
use crate::normalize::rebase;
use crate::sizing::SequenceReconstructor;

use gcutils::{parse_uptime, parse_wallclock, TIMESTAMP_SENTINEL};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;

/// What was learned about the log itself.

#[derive(Debug, Clone, Serialize)]
pub struct FormatInfo {
    pub dialect: Dialect,
    pub has_pid_tid: bool,
    pub collector_family: CollectorFamily,
    pub jdk_version: Option<String>,
    /// From the "Heap Region Size" header; the last one wins if there are several.
    pub region_size_mb: Option<u64>,
    pub has_sizing_data: bool,
    pub uncommit_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    pub lines: usize,
    pub matched: usize,
    pub discarded: usize,
    pub unparsed_timestamps: usize,
    pub abandoned_evaluations: usize,
    pub by_category: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone)]
pub struct ParsedLog {
    pub format_info: FormatInfo,
    /// Everything but the scaling records, in log order.
    pub events: Vec<LogEvent>,
    pub scaling: Vec<LogEvent>,
    pub stats: ParseStats,
}

/// Parse a log buffer.  `region_size_mb` is the region size to assume for estimates if the log
/// doesn't state it.
///
/// Returns GcLogError::NoEvents if nothing at all was recognized.

pub fn parse_log(text: &str, region_size_mb: Option<u64>) -> Result<ParsedLog, GcLogError> {
    let dialect = detect_dialect(text);
    log::debug!("Dialect {:?}", dialect);

    let mut format_info = FormatInfo {
        dialect,
        has_pid_tid: dialect.has_pid_tid(),
        collector_family: CollectorFamily::Unknown,
        jdk_version: None,
        region_size_mb: None,
        has_sizing_data: false,
        uncommit_only: false,
    };
    let mut stats: ParseStats = Default::default();
    let mut events = vec![];
    let mut scaling = vec![];
    let mut sizing = SequenceReconstructor::new(region_size_mb);
    let mut prev_total_heap_mb = 0u64;

    for line in text.lines() {
        stats.lines += 1;

        if format_info.collector_family == CollectorFamily::Unknown {
            if let Some(family) = collector_marker(line) {
                log::debug!("Collector family {:?}", family);
                format_info.collector_family = family;
            }
        }

        let Some(classified) = classify(line, dialect) else {
            continue;
        };
        let Some(extracted) = classified.extract() else {
            log::debug!("Discarding {:?} line: {line}", classified.grammar);
            stats.discarded += 1;
            continue;
        };
        stats.matched += 1;

        let timestamp = match classified.timestamp {
            Some(token) => {
                let t = match dialect {
                    Dialect::TraditionalElapsedSeconds => parse_uptime(token),
                    Dialect::StructuredTimestampPidTid => parse_wallclock(token),
                };
                t.unwrap_or_else(|| {
                    log::trace!("Unparseable timestamp {token}");
                    stats.unparsed_timestamps += 1;
                    TIMESTAMP_SENTINEL
                })
            }
            None => TIMESTAMP_SENTINEL,
        };

        match extracted {
            Extracted::RegionSize(mb) => {
                format_info.region_size_mb = Some(mb);
                sizing.set_region_size(mb);
            }
            Extracted::Version(v) => {
                if format_info.jdk_version.is_none() {
                    format_info.jdk_version = Some(v);
                }
            }
            Extracted::Event(EventKind::HeapPause(mut p)) => {
                p.total_heap_before_mb = prev_total_heap_mb;
                prev_total_heap_mb = p.total_heap_after_mb;
                sizing.pass(LogEvent {
                    timestamp,
                    kind: EventKind::HeapPause(p),
                });
            }
            Extracted::Event(kind @ EventKind::Scaling(_)) => {
                scaling.push(LogEvent { timestamp, kind });
            }
            Extracted::Event(kind) => {
                sizing.pass(LogEvent { timestamp, kind });
            }
            Extracted::Sizing(s) => {
                sizing.feed(timestamp, s);
            }
            Extracted::Ignored => {}
        }
        // Primary records go through the reconstructor so that none gets ahead of a pending
        // sizing summary.
        events.extend(sizing.take_records());
    }

    let (rest, abandoned) = sizing.finish();
    events.extend(rest);
    stats.abandoned_evaluations = abandoned;

    if events.is_empty() && scaling.is_empty() {
        return Err(GcLogError::NoEvents);
    }
    if stats.unparsed_timestamps > 0 {
        log::warn!(
            "{} timestamps could not be parsed and were set to {TIMESTAMP_SENTINEL}",
            stats.unparsed_timestamps
        );
    }

    for e in events.iter().chain(scaling.iter()) {
        *stats.by_category.entry(e.kind.category()).or_insert(0) += 1;
    }

    if format_info.collector_family == CollectorFamily::Unknown {
        format_info.collector_family = infer_collector_family(&events);
    }
    format_info.has_sizing_data = stats.by_category.contains_key(&Category::SizingActivity);
    format_info.uncommit_only = is_uncommit_only(&events);

    rebase(&mut events);
    rebase(&mut scaling);

    Ok(ParsedLog {
        format_info,
        events,
        scaling,
        stats,
    })
}

// A log without the initialization lines can still be attributed by the records it has.
fn infer_collector_family(events: &[LogEvent]) -> CollectorFamily {
    for e in events {
        match e.kind {
            EventKind::HeapPause(_) | EventKind::RegionTransition(_) => {
                return CollectorFamily::RegionBased
            }
            EventKind::Pause(_) | EventKind::PageSizing(_) | EventKind::CollectionCause(_) => {
                return CollectorFamily::ConcurrentLowPause
            }
            _ => {}
        }
    }
    CollectorFamily::Unknown
}

// The mode an initialization line reports is authoritative; failing that, the time-based records
// only appear in that mode.
fn is_uncommit_only(events: &[LogEvent]) -> bool {
    let mut saw_marker = false;
    for e in events {
        if let EventKind::SizingActivity(ref s) = e.kind {
            if s.sizing_type == SizingType::HeapSizingInit {
                if let Some(ref mode) = s.sizing_mode {
                    if mode.contains("uncommit-only") {
                        return true;
                    }
                }
            }
            saw_marker = saw_marker || s.sizing_type.is_time_based_marker();
        }
    }
    saw_marker
}

macro_rules! stream_accessor {
    ($name:ident, $field:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> impl Iterator<Item = (f64, &$ty)> {
            self.$field.iter().filter_map(|e| match e.kind {
                EventKind::$variant(ref x) => Some((e.timestamp, x)),
                _ => None,
            })
        }
    };
}

impl ParsedLog {
    stream_accessor!(pauses, events, Pause, PauseEvent);
    stream_accessor!(concurrent_phases, events, ConcurrentPhase, ConcurrentPhaseEvent);
    stream_accessor!(page_sizing, events, PageSizing, PageSizingEvent);
    stream_accessor!(collection_causes, events, CollectionCause, CollectionCauseEvent);
    stream_accessor!(heap_pauses, events, HeapPause, HeapPauseEvent);
    stream_accessor!(region_transitions, events, RegionTransition, RegionTransitionEvent);
    stream_accessor!(sizing_activity, events, SizingActivity, SizingActivityEvent);
    stream_accessor!(scaling_events, scaling, Scaling, ScalingEvent);

    pub fn count(&self, category: Category) -> usize {
        self.stats.by_category.get(&category).copied().unwrap_or(0)
    }

    /// Succeeds if there is at least one record of the category.
    pub fn require(&self, category: Category) -> Result<(), GcLogError> {
        if self.count(category) == 0 {
            Err(GcLogError::MissingCategory(category))
        } else {
            Ok(())
        }
    }
}

/// Sort file names so that supplementary sizing logs (names containing `marker`, ignoring case)
/// come after the primary logs.  The order is otherwise unchanged.

pub fn order_logfiles(files: &mut [String], marker: &str) {
    let marker = marker.to_lowercase();
    files.sort_by_key(|f| f.to_lowercase().contains(&marker));
}

/// Read the files and catenate their contents in the given order, one file per chunk separated by
/// newlines.  Invalid UTF-8 is replaced rather than rejected.

pub fn read_logfiles(files: &[String]) -> Result<String, GcLogError> {
    let mut chunks = vec![];
    for path in files {
        let bytes = fs::read(path).map_err(|source| GcLogError::Io {
            path: path.clone(),
            source,
        })?;
        chunks.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(chunks.join("\n"))
}

#[test]
fn test_empty_input() {
    assert!(matches!(parse_log("", None), Err(GcLogError::NoEvents)));
    assert!(matches!(
        parse_log("hello\n[0.001s][info][safepoint] Safepoint \"Cleanup\"\n", None),
        Err(GcLogError::NoEvents)
    ));
    // Header lines alone yield no records.
    assert!(matches!(
        parse_log("[0.004s][info][gc,init] Heap Region Size: 1M\n[0.005s][info][gc] Using G1\n", None),
        Err(GcLogError::NoEvents)
    ));
}

#[test]
fn test_capacity_chain() {
    let text = "\
[1.000s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.000ms
[2.000s][info][gc] GC(1) Pause Young (Normal) (G1 Evacuation Pause) 30M->6M(128M) 2.000ms
[2.500s][info][gc] GC(2) Pause Young (Normal) (G1 Evacuation Pause) 30M->6M(99999999999999999999999M) 2.000ms
[3.000s][info][gc] GC(3) Pause Remark 40M->40M(512M) 1.000ms
";
    let log = parse_log(text, None).unwrap();
    let pauses = log.heap_pauses().map(|(_, p)| p).collect::<Vec<&HeapPauseEvent>>();
    assert!(pauses.len() == 3);
    assert!(pauses[0].total_heap_before_mb == 0);
    for i in 1..pauses.len() {
        assert!(pauses[i].total_heap_before_mb == pauses[i - 1].total_heap_after_mb);
    }
    assert!(log.stats.discarded == 1);
    let ts = log.heap_pauses().map(|(t, _)| t).collect::<Vec<f64>>();
    assert!(ts == vec![0.0, 1.0, 2.0]);
}

#[test]
fn test_order_logfiles() {
    let mut files = vec![
        "run1-GC-Sizing.log".to_string(),
        "run1.log".to_string(),
        "gc-sizing-extra.log".to_string(),
        "run2.log".to_string(),
    ];
    order_logfiles(&mut files, "gc-sizing");
    assert!(
        files
            == vec![
                "run1.log".to_string(),
                "run2.log".to_string(),
                "run1-GC-Sizing.log".to_string(),
                "gc-sizing-extra.log".to_string()
            ]
    );
}

#[test]
fn test_read_missing_file() {
    let r = read_logfiles(&["../tests/gclog/no-such-file.log".to_string()]);
    assert!(matches!(r, Err(GcLogError::Io { .. })));
}

#[test]
fn test_unparseable_timestamp() {
    let text = "\
[2025-07-01T12:00:01.000+0000][4242][4250][info][gc          ] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 2.500ms
[2025-13-01T12:00:03.500+0000][4242][4250][info][gc          ] GC(1) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(192M) 1.500ms
";
    let log = parse_log(text, None).unwrap();
    assert!(log.format_info.dialect == Dialect::StructuredTimestampPidTid);
    let pauses = log.heap_pauses().collect::<Vec<(f64, &HeapPauseEvent)>>();
    assert!(pauses.len() == 2);
    assert!(log.stats.unparsed_timestamps == 1);
    assert!(log.stats.discarded == 0);
    // The record keeps its place, and its 0.0 is the base the stream is rebased on.
    assert!(pauses[1].1.gc_id == Some(1));
    assert!(pauses[1].0 == 0.0);
    assert!(pauses[0].0 > 0.0);
}

#[test]
fn test_out_of_range_share_discarded() {
    let text = "\
[2.000s][info][gc,phases] GC(4) Pause Relocate Start 0.010ms
[2.020s][info][gc] GC(4) Garbage Collection (Warmup) 120M(250%)->40M(180%)
";
    let log = parse_log(text, None).unwrap();
    assert!(log.count(Category::CollectionCause) == 0);
    assert!(log.stats.discarded == 1);
}
