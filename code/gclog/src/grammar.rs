/// The line classifier: an ordered table of line grammars, each a pattern plus the extractor that
/// turns its captures into a record.
///
/// The grammars are written against the message part of a line only and are shared by both
/// dialects; the dialect decides just how the timestamp decoration is found (dialect.rs).  Every
/// grammar is anchored on a literal substring that no other grammar contains, so a line matches at
/// most one of them, but the table is searched first-match-wins all the same and the order below
/// is significant where patterns are loose (the heap pause before the legacy low-pause pause).
///
/// Lines that match no grammar are the common case and are not errors.
use crate::dialect::Dialect;
use crate::extract::{self, Extracted, Extractor};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grammar {
    HeapRegionSize,
    Version,

    HeapPause,
    Scaling,
    RegionTransition,

    GenerationalPause,
    GenerationalConcurrentPhase,
    GenerationalPageSizing,
    GenerationalCollectionCause,
    LegacyPause,
    LegacyConcurrentPhase,
    LegacyCollectionCause,

    SizingStatus,
    SizingInit,
    SizingParameters,
    SizingParametersSeconds,
    LegacyUncommit,
    LegacyShrinkEvaluation,
    LegacyNoUncommit,
    ShrinkCompleted,
    ShrinkDetails,
    EvaluationStart,
    EvaluationScan,
    ScanResult,
    FoundRequested,
    FoundMinRequired,
    FoundUncommitting,
    ShrinkingBySelection,
    NoActionDetailed,
    NoActionNumbered,
    HeapEvaluationNoAction,
    HeapEvaluationShrink,
    ShrinkRequest,
    ShrinkProcessing,
    ShrinkDeactivated,
    ShrinkUncommitted,
    CandidateRegion,
    DeactivatingRegion,
    RegionStateTransition,
}

pub struct Rule {
    pub grammar: Grammar,
    /// Header lines (region size, version) are recognized with or without decorations; all other
    /// grammars need a timestamp.
    pub needs_timestamp: bool,
    regex: Regex,
    extract: Extractor,
}

/// A line that matched a grammar: the grammar, the raw timestamp token if there is one, and the
/// raw captures.

pub struct Classified<'a> {
    pub grammar: Grammar,
    pub timestamp: Option<&'a str>,
    pub captures: Captures<'a>,
    extract: Extractor,
}

impl<'a> Classified<'a> {
    /// Run the grammar's extractor.  None means a captured numeric token didn't convert.
    pub fn extract(&self) -> Option<Extracted> {
        (self.extract)(&self.captures)
    }
}

fn rule(grammar: Grammar, needs_timestamp: bool, pattern: &str, extract: Extractor) -> Rule {
    Rule {
        grammar,
        needs_timestamp,
        regex: Regex::new(pattern).unwrap(),
        extract,
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Grammar::*;
    vec![
        // Headers
        rule(HeapRegionSize, false, r"Heap Region Size: (\d+)M", extract::region_size),
        rule(Version, false, r"\bVersion: (\d[^\s]*)", extract::version),
        // Region-based collector
        rule(
            HeapPause,
            true,
            r"(?:GC\((\d+)\) )?Pause (\w+)(?: \((.*?)\))? ?(?:\((.*?)\))? (\d+)M->(\d+)M\((\d+)M\) (\d+\.\d+)ms",
            extract::heap_pause,
        ),
        rule(
            Scaling,
            true,
            r"GC\((\d+)\) User=(\d+\.\d+)s Sys=(\d+\.\d+)s Real=(\d+\.\d+)s",
            extract::scaling,
        ),
        rule(
            RegionTransition,
            true,
            r"GC\((\d+)\) (\w+) regions: (\d+)->(\d+)",
            extract::region_transition,
        ),
        // Low-pause collector, generational layout
        rule(
            GenerationalPause,
            true,
            r"GC\((\d+)\) (\w): Pause ((?:\w+\s)+\w+(?: \(\w+\))?)(?:\s+)?(\d+\.\d+)ms",
            extract::generational_pause,
        ),
        rule(
            GenerationalConcurrentPhase,
            true,
            r"GC\((\d+)\) (\w): Concurrent ([\w\s]+) (\d+\.\d+)ms",
            extract::generational_concurrent_phase,
        ),
        rule(
            GenerationalPageSizing,
            true,
            r"GC\((\d+)\) (\w): (\w+) Pages:\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)M\s+(\d+)M\s+(\d+)M",
            extract::generational_page_sizing,
        ),
        rule(
            GenerationalCollectionCause,
            true,
            r"GC\((\d+)\) (Minor|Major) Collection \((.+?)\) (\d+)M\((\d+)%\)->(\d+)M\((\d+)%\) (\d+\.\d+)s",
            extract::generational_collection_cause,
        ),
        // Low-pause collector, legacy layout
        rule(
            LegacyPause,
            true,
            r"GC\((\d+)\) Pause (\w+(?: Start| End)?) (\d+\.\d+)ms",
            extract::legacy_pause,
        ),
        rule(
            LegacyConcurrentPhase,
            true,
            r"GC\((\d+)\) Concurrent (\w+) (\d+\.\d+)ms",
            extract::legacy_concurrent_phase,
        ),
        rule(
            LegacyCollectionCause,
            true,
            r"GC\((\d+)\) Garbage Collection \((.+?)\) (\d+)M\((\d+)%\)->(\d+)M\((\d+)%\)",
            extract::legacy_collection_cause,
        ),
        // Heap sizing
        rule(
            SizingStatus,
            true,
            r"G1 Time-Based Heap Sizing (enabled|disabled)(?: \(([^)]+)\))?",
            extract::sizing_status,
        ),
        rule(
            SizingInit,
            true,
            r"Heap sizing initialized \(mode: ([^)]+)\)",
            extract::sizing_init,
        ),
        rule(
            SizingParameters,
            true,
            r"Heap sizing parameters: evaluation_interval_ms=(\d+), uncommit_delay_ms=(\d+)",
            extract::sizing_parameters,
        ),
        rule(
            SizingParametersSeconds,
            true,
            r"Evaluation Interval: (\d+)s, Uncommit Delay: (\d+)s, Min Regions To Uncommit: (\d+)",
            extract::sizing_parameters_seconds,
        ),
        rule(
            LegacyUncommit,
            true,
            r"Time-based uncommit: (\d+) regions \((\d+\.\d+)MB\) uncommitted \(inactive: (\d+), total: \d+ regions\)",
            extract::legacy_uncommit,
        ),
        rule(
            LegacyShrinkEvaluation,
            true,
            r"Time-based evaluation: shrink by (\d+)MB",
            extract::legacy_shrink_evaluation,
        ),
        rule(
            LegacyNoUncommit,
            true,
            r"Time-based evaluation: no uncommit needed",
            extract::legacy_no_uncommit,
        ),
        rule(
            ShrinkCompleted,
            true,
            r"Heap shrink completed.*heap: (\d+)M",
            extract::shrink_completed,
        ),
        rule(
            ShrinkDetails,
            true,
            r"Heap shrink details: uncommitted (\d+) regions \((\d+)MB\), heap size now (\d+)MB",
            extract::shrink_details,
        ),
        rule(
            EvaluationStart,
            true,
            r"Starting (?:uncommit|heap) evaluation",
            extract::evaluation_start,
        ),
        rule(
            EvaluationScan,
            true,
            r"Full region scan: counting uncommit candidates",
            extract::evaluation_scan,
        ),
        rule(
            ScanResult,
            true,
            r"Full region scan: found (\d+) inactive regions out of (\d+) total regions",
            extract::scan_result,
        ),
        rule(
            FoundRequested,
            true,
            r"Time-based uncommit evaluation: found (\d+) inactive regions \(requested (\d+)\)",
            extract::found_requested,
        ),
        rule(
            FoundMinRequired,
            true,
            r"Uncommit evaluation: found (\d+) inactive candidates \(min required: (\d+)\)",
            extract::found_min_required,
        ),
        rule(
            FoundUncommitting,
            true,
            r"Uncommit evaluation: found (\d+) inactive regions, uncommitting (\d+) regions \((\d+)MB\)",
            extract::found_uncommitting,
        ),
        rule(
            ShrinkingBySelection,
            true,
            r"Uncommit evaluation: shrinking heap by (\d+)MB using time-based selection",
            extract::shrinking_by_selection,
        ),
        rule(
            NoActionDetailed,
            true,
            r"Uncommit evaluation: no heap uncommit needed \(inactive=(\d+) min_required=(\d+) heap=(\d+)B min=(\d+)B\)",
            extract::no_action_detailed,
        ),
        rule(
            NoActionNumbered,
            true,
            r"Uncommit evaluation: no heap uncommit needed \(evaluation #(\d+)\)",
            extract::no_action_numbered,
        ),
        rule(
            HeapEvaluationNoAction,
            true,
            r"Time-based heap evaluation: no uncommit needed \(inactive=(\d+) min_required=(\d+) heap=(\d+)B min=(\d+)B\)",
            extract::no_action_detailed,
        ),
        rule(
            HeapEvaluationShrink,
            true,
            r"Time-based heap evaluation: shrinking heap by (\d+)MB \(inactive=(\d+) min_required=(\d+) heap=(\d+)B min=(\d+)B\)",
            extract::heap_evaluation_shrink,
        ),
        rule(
            ShrinkRequest,
            true,
            r"Time-based shrink: requesting (\d+)MB based on (\d+) time-based candidates",
            extract::shrink_request,
        ),
        rule(
            ShrinkProcessing,
            true,
            r"Time-based shrink: processing (\d+) oldest regions out of (\d+) empty regions",
            extract::shrink_processing,
        ),
        rule(
            ShrinkDeactivated,
            true,
            r"Time-based shrink: deactivated (\d+) oldest empty regions",
            extract::shrink_deactivated,
        ),
        rule(
            ShrinkUncommitted,
            true,
            r"Time-based shrink: uncommitted (\d+) oldest regions \((\d+)MB\), heap size now (\d+)MB",
            extract::shrink_details,
        ),
        rule(
            CandidateRegion,
            true,
            r"Time-based shrink: identified region (\d+) as candidate \(last_access=(\d+)ms ago\)",
            extract::candidate_region,
        ),
        rule(
            DeactivatingRegion,
            true,
            r"Time-based shrink: deactivating region (\d+) \(last_access=(\d+)ms ago\)",
            extract::deactivating_region,
        ),
        rule(
            RegionStateTransition,
            true,
            r"Region state transition: Region (\d+) transitioning from (\w+) to (\w+) after (\d+)ms idle",
            extract::region_state_transition,
        ),
    ]
});

/// Find the grammar matched by `line`, if any.  Lines without the timestamp decoration of
/// `dialect` can only match the header grammars.

pub fn classify<'a>(line: &'a str, dialect: Dialect) -> Option<Classified<'a>> {
    let timestamp = dialect.timestamp_token(line);
    for r in RULES.iter() {
        if r.needs_timestamp && timestamp.is_none() {
            continue;
        }
        if let Some(captures) = r.regex.captures(line) {
            return Some(Classified {
                grammar: r.grammar,
                timestamp,
                captures,
                extract: r.extract,
            });
        }
    }
    None
}

#[cfg(test)]
fn grammar_of(line: &str) -> Option<Grammar> {
    classify(line, Dialect::TraditionalElapsedSeconds).map(|c| c.grammar)
}

#[test]
fn test_classify_region_based() {
    assert!(
        grammar_of("[0.123s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.456ms")
            == Some(Grammar::HeapPause)
    );
    assert!(
        grammar_of("[1.500s][info][gc] GC(7) Pause Remark 30M->30M(256M) 1.200ms")
            == Some(Grammar::HeapPause)
    );
    assert!(
        grammar_of("[0.123s][info][gc,cpu] GC(0) User=0.01s Sys=0.00s Real=0.00s")
            == Some(Grammar::Scaling)
    );
    assert!(
        grammar_of("[0.123s][info][gc,heap] GC(0) Eden regions: 24->0(20)")
            == Some(Grammar::RegionTransition)
    );
    assert!(
        grammar_of("[0.004s][info][gc,init] Heap Region Size: 1M") == Some(Grammar::HeapRegionSize)
    );
    assert!(grammar_of("Heap Region Size: 2M") == Some(Grammar::HeapRegionSize));
    assert!(
        grammar_of("[0.004s][info][gc,init] Version: 17.0.8+7-LTS (release)")
            == Some(Grammar::Version)
    );
}

#[test]
fn test_classify_low_pause() {
    assert!(
        grammar_of("[1.010s][info][gc,phases] GC(3) Y: Pause Mark Start 0.012ms")
            == Some(Grammar::GenerationalPause)
    );
    assert!(
        grammar_of("[1.020s][info][gc,phases] GC(3) O: Pause Mark End (Major) 0.021ms")
            == Some(Grammar::GenerationalPause)
    );
    assert!(
        grammar_of("[1.030s][info][gc,phases] GC(3) Y: Concurrent Mark Roots 1.234ms")
            == Some(Grammar::GenerationalConcurrentPhase)
    );
    assert!(
        grammar_of("[1.040s][info][gc,reloc] GC(3) Y: Small Pages: 50 20 0 100M 40M 2M")
            == Some(Grammar::GenerationalPageSizing)
    );
    assert!(
        grammar_of("[1.050s][info][gc] GC(3) Minor Collection (Allocation Rate) 200M(10%)->50M(2%) 0.030s")
            == Some(Grammar::GenerationalCollectionCause)
    );
    assert!(
        grammar_of("[2.000s][info][gc,phases] GC(4) Pause Mark Start 0.010ms")
            == Some(Grammar::LegacyPause)
    );
    assert!(
        grammar_of("[2.010s][info][gc,phases] GC(4) Concurrent Mark 5.500ms")
            == Some(Grammar::LegacyConcurrentPhase)
    );
    assert!(
        grammar_of("[2.020s][info][gc] GC(4) Garbage Collection (Warmup) 120M(6%)->40M(2%)")
            == Some(Grammar::LegacyCollectionCause)
    );
}

#[test]
fn test_classify_sizing() {
    assert!(
        grammar_of("[5.000s][info][gc,sizing] Starting uncommit evaluation")
            == Some(Grammar::EvaluationStart)
    );
    assert!(
        grammar_of("[5.001s][info][gc,sizing] Full region scan: found 5 inactive regions out of 20 total regions")
            == Some(Grammar::ScanResult)
    );
    assert!(
        grammar_of("[5.002s][info][gc,sizing] Uncommit evaluation: no heap uncommit needed (evaluation #12)")
            == Some(Grammar::NoActionNumbered)
    );
    assert!(
        grammar_of("[5.003s][info][gc,sizing] Time-based heap evaluation: no uncommit needed (inactive=1 min_required=4 heap=1073741824B min=268435456B)")
            == Some(Grammar::HeapEvaluationNoAction)
    );
    assert!(
        grammar_of("[5.004s][info][gc,sizing] Time-based shrink: uncommitted 4 oldest regions (4MB), heap size now 252MB")
            == Some(Grammar::ShrinkUncommitted)
    );
    assert!(
        grammar_of("[5.005s][debug][gc,sizing] Region state transition: Region 17 transitioning from active to inactive after 300000ms idle")
            == Some(Grammar::RegionStateTransition)
    );
}

#[test]
fn test_classify_needs_timestamp() {
    assert!(grammar_of("GC(0) Eden regions: 24->0(20)").is_none());
    assert!(grammar_of("Starting uncommit evaluation").is_none());
    assert!(grammar_of("[0.100s][info][safepoint] Safepoint \"Cleanup\", Time since last: 1000 ns").is_none());
}

#[test]
fn test_classify_structured() {
    let line = "[2025-07-01T12:00:00.100+0000][4242][4243][info][gc          ] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.456ms";
    let c = classify(line, Dialect::StructuredTimestampPidTid).unwrap();
    assert!(c.grammar == Grammar::HeapPause);
    assert!(c.timestamp == Some("2025-07-01T12:00:00.100+0000"));
    assert!(classify(line, Dialect::TraditionalElapsedSeconds).is_none());
}
