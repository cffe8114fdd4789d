/// Reconstruction of heap sizing evaluations from their log lines.
///
/// An evaluation is logged as a short sequence of lines (start, scan result, decision, actions,
/// completion), consecutively but with unrelated lines in between, and with any subset of them
/// missing depending on log verbosity.  There is no transaction id; lines belong together because
/// they are adjacent in time.
///
/// The reconstructor is a state machine over the role of each line:
///
///   Idle --start--> Started --scan--> Scanned --decision--> Decided --terminal--> Idle
///
/// with the accumulated fields of the current evaluation carried along.  A decision whose shrink
/// amount is not yet known leaves its summary record pending in Decided until a later line supplies
/// the amount (or the sequence ends some other way).  Records produced while a summary is pending,
/// including the unrelated ones passed through `pass`, are held back and released after it, so the
/// output stays in log order.  Every record is emitted exactly once and never touched again, and
/// the carried fields are dropped whenever a sequence ends, so nothing from one evaluation can show
/// up in the next one's summary.
///
/// A sequence "ends" when it reaches a terminal line, or is abandoned because a new start (or a new
/// scan after a decision) arrives, or at the end of input.  An abandoned Decided evaluation still
/// emits its pending summary with what is known; an abandoned Started or Scanned evaluation never
/// got to a decision and emits nothing more.
use crate::events::{EventKind, LogEvent, SizingActivityEvent, SizingType};

/// The role a sizing line plays in an evaluation sequence, with its captured fields.

#[derive(Debug, Clone, PartialEq)]
pub enum SizingLine {
    /// A record that is independent of any sequence.
    Standalone(SizingActivityEvent),
    Start,
    Scan { inactive: u64, total: u64 },
    /// The evaluation decided to shrink.  The fields are those of the summary record.
    Decision(SizingActivityEvent),
    /// The shrink amount, refining the current decision or making one.
    ShrinkAmount { shrink_mb: f64 },
    Request { shrink_mb: f64, candidates: u64 },
    Processing { uncommit_regions: u64, total_empty: u64 },
    /// A completion line carrying its own summary record.
    Terminal(SizingActivityEvent),
    /// A completion line with just the number of deactivated regions.
    Deactivated { count: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Summary {
    Emitted,
    /// Not yet emitted; the timestamp of the deciding line.
    Pending(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Started,
    Scanned,
    Decided(Summary),
}

pub struct SequenceReconstructor {
    phase: Phase,
    carried: SizingActivityEvent,
    region_size_mb: Option<u64>,
    abandoned: usize,
    records: Vec<LogEvent>,
    // Output that comes after a pending summary.
    held: Vec<LogEvent>,
}

// The fields that are carried between the lines of one sequence.
macro_rules! overlay {
    ($dst:expr, $src:expr, $cond:ident, [$($f:ident),*]) => {
        $( if $src.$f.is_some() && $cond(&$dst.$f) { $dst.$f = $src.$f.clone(); } )*
    };
}

fn always<T>(_: &Option<T>) -> bool {
    true
}

fn is_none<T>(x: &Option<T>) -> bool {
    x.is_none()
}

// Copy every field that `src` has into `dst`.
fn merge_into(dst: &mut SizingActivityEvent, src: &SizingActivityEvent) {
    overlay!(
        dst,
        src,
        always,
        [
            inactive_regions,
            inactive_required,
            requested_regions,
            total_empty_regions,
            uncommit_regions,
            shrink_mb,
            heap_bytes,
            min_heap_bytes
        ]
    );
}

// Fill the gaps of `dst` from `src`.  A no-action record doesn't take on shrink or uncommit data.
fn fill_from(dst: &mut SizingActivityEvent, src: &SizingActivityEvent) {
    overlay!(
        dst,
        src,
        is_none,
        [
            inactive_regions,
            inactive_required,
            requested_regions,
            total_empty_regions,
            heap_bytes,
            min_heap_bytes
        ]
    );
    if dst.sizing_type != SizingType::TimeBasedEvaluationNoUncommit {
        overlay!(dst, src, is_none, [uncommit_regions, shrink_mb]);
    }
}

fn empty_carry() -> SizingActivityEvent {
    SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink)
}

impl SequenceReconstructor {
    /// `region_size_mb` is the size to use for estimates until the log reveals the real one.
    pub fn new(region_size_mb: Option<u64>) -> SequenceReconstructor {
        SequenceReconstructor {
            phase: Phase::Idle,
            carried: empty_carry(),
            region_size_mb,
            abandoned: 0,
            records: vec![],
            held: vec![],
        }
    }

    pub fn set_region_size(&mut self, region_size_mb: u64) {
        self.region_size_mb = Some(region_size_mb);
    }

    pub fn feed(&mut self, timestamp: f64, line: SizingLine) {
        match line {
            SizingLine::Standalone(e) => {
                self.emit(timestamp, e);
            }
            SizingLine::Start => {
                self.abandon();
                self.phase = Phase::Started;
                self.emit(
                    timestamp,
                    SizingActivityEvent::new(SizingType::UncommitEvaluationStart),
                );
            }
            SizingLine::Scan { inactive, total } => {
                if let Phase::Decided(_) = self.phase {
                    self.abandon();
                }
                self.carried.inactive_regions = Some(inactive);
                self.carried.total_empty_regions = Some(total);
                self.phase = Phase::Scanned;
                let mut e = SizingActivityEvent::new(SizingType::TimeBasedScanResult);
                e.inactive_regions = Some(inactive);
                e.total_empty_regions = Some(total);
                self.emit(timestamp, e);
            }
            SizingLine::Decision(e) => {
                // A second full decision is a new evaluation whose start wasn't logged.
                if let Phase::Decided(_) = self.phase {
                    self.abandon();
                }
                merge_into(&mut self.carried, &e);
                self.decide(timestamp);
            }
            SizingLine::ShrinkAmount { shrink_mb } => {
                self.carried.shrink_mb = Some(shrink_mb);
                match self.phase {
                    Phase::Decided(Summary::Pending(t)) => self.emit_summary(t),
                    Phase::Decided(Summary::Emitted) => {}
                    _ => self.decide(timestamp),
                }
            }
            SizingLine::Request {
                shrink_mb,
                candidates,
            } => {
                self.carried.shrink_mb = Some(shrink_mb);
                if self.carried.requested_regions.is_none() {
                    self.carried.requested_regions = Some(candidates);
                }
                match self.phase {
                    Phase::Decided(Summary::Pending(t)) => self.emit_summary(t),
                    Phase::Decided(Summary::Emitted) => {}
                    _ => self.decide(timestamp),
                }
                self.carried.requested_regions = Some(candidates);
                let mut e = SizingActivityEvent::new(SizingType::TimeBasedRequest);
                e.shrink_mb = Some(shrink_mb);
                e.requested_regions = Some(candidates);
                self.emit(timestamp, e);
            }
            SizingLine::Processing {
                uncommit_regions,
                total_empty,
            } => {
                if self.phase == Phase::Idle {
                    self.phase = Phase::Started;
                }
                self.carried.uncommit_regions = Some(uncommit_regions);
                self.carried.total_empty_regions = Some(total_empty);
                let mut e = SizingActivityEvent::new(SizingType::TimeBasedProcessing);
                e.uncommit_regions = Some(uncommit_regions);
                e.total_empty_regions = Some(total_empty);
                self.emit(timestamp, e);
            }
            SizingLine::Terminal(mut e) => {
                self.resolve_pending();
                fill_from(&mut e, &self.carried);
                self.emit(timestamp, e);
                self.reset();
            }
            SizingLine::Deactivated { count } => {
                self.resolve_pending();
                let carried = &self.carried;
                let shrink_mb = carried.shrink_mb.unwrap_or_else(|| {
                    self.region_size_mb
                        .map(|sz| (count as f64) * (sz as f64))
                        .unwrap_or(0.0)
                });
                let mut e = SizingActivityEvent::new(SizingType::TimeBasedUncommit);
                e.inactive_regions = Some(carried.inactive_regions.unwrap_or(count));
                e.requested_regions = carried.requested_regions.or(carried.inactive_required);
                e.uncommit_regions = Some(count);
                e.uncommit_mb = Some(shrink_mb);
                e.total_empty_regions = carried.total_empty_regions;
                self.emit(timestamp, e);
                self.reset();
            }
        }
    }

    /// Queue a record that is not part of any sequence behind the sizing records already produced.
    pub fn pass(&mut self, e: LogEvent) {
        self.push(e);
    }

    /// Remove and return the records that are ready, in log order.  Records behind a pending
    /// summary are not ready.
    pub fn take_records(&mut self) -> Vec<LogEvent> {
        std::mem::take(&mut self.records)
    }

    /// End of input: abandon whatever is in flight, and return the records in order together with
    /// the number of abandoned sequences.
    pub fn finish(mut self) -> (Vec<LogEvent>, usize) {
        self.abandon();
        (self.records, self.abandoned)
    }

    // Enter Decided, emitting the summary now if the shrink amount is known.
    fn decide(&mut self, timestamp: f64) {
        if self.carried.shrink_mb.is_some() {
            self.emit_summary(timestamp);
        } else {
            self.phase = Phase::Decided(Summary::Pending(timestamp));
        }
    }

    fn emit_summary(&mut self, timestamp: f64) {
        let mut e = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
        merge_into(&mut e, &self.carried);
        // The decision summary describes the choice, not the outcome.
        e.uncommit_regions = None;
        self.records.push(LogEvent {
            timestamp,
            kind: EventKind::SizingActivity(e),
        });
        self.records.append(&mut self.held);
        self.phase = Phase::Decided(Summary::Emitted);
    }

    fn resolve_pending(&mut self) {
        if let Phase::Decided(Summary::Pending(t)) = self.phase {
            self.emit_summary(t);
        }
    }

    fn abandon(&mut self) {
        match self.phase {
            Phase::Idle | Phase::Decided(Summary::Emitted) => {}
            Phase::Decided(Summary::Pending(t)) => {
                log::debug!("Sizing evaluation at {t} ended without a shrink amount");
                self.emit_summary(t);
                self.abandoned += 1;
            }
            Phase::Started | Phase::Scanned => {
                log::debug!("Sizing evaluation abandoned before a decision");
                self.abandoned += 1;
            }
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.carried = empty_carry();
    }

    fn emit(&mut self, timestamp: f64, e: SizingActivityEvent) {
        self.push(LogEvent {
            timestamp,
            kind: EventKind::SizingActivity(e),
        });
    }

    fn push(&mut self, e: LogEvent) {
        if let Phase::Decided(Summary::Pending(_)) = self.phase {
            self.held.push(e);
        } else {
            self.records.push(e);
        }
    }
}

#[cfg(test)]
fn run(lines: Vec<(f64, SizingLine)>, region_size_mb: Option<u64>) -> (Vec<SizingActivityEvent>, usize) {
    let mut r = SequenceReconstructor::new(region_size_mb);
    for (t, l) in lines {
        r.feed(t, l);
    }
    let (records, abandoned) = r.finish();
    let records = records
        .into_iter()
        .map(|e| match e.kind {
            EventKind::SizingActivity(s) => s,
            _ => panic!("Unexpected record"),
        })
        .collect::<Vec<SizingActivityEvent>>();
    (records, abandoned)
}

#[cfg(test)]
fn of_type(records: &[SizingActivityEvent], ty: SizingType) -> Vec<&SizingActivityEvent> {
    records.iter().filter(|e| e.sizing_type == ty).collect()
}

#[cfg(test)]
fn is_summary(e: &SizingActivityEvent) -> bool {
    matches!(
        e.sizing_type,
        SizingType::TimeBasedEvaluationShrink
            | SizingType::TimeBasedEvaluationNoUncommit
            | SizingType::TimeBasedUncommit
            | SizingType::HeapShrinkDetails
    )
}

#[test]
fn test_interrupted_sequence() {
    // The region state line stands for an unrelated line between the steps.
    let mut unrelated = SizingActivityEvent::new(SizingType::TimeBasedCandidate);
    unrelated.region_id = Some(3);
    let (records, abandoned) = run(
        vec![
            (1.0, SizingLine::Start),
            (1.1, SizingLine::Scan { inactive: 5, total: 20 }),
            (1.2, SizingLine::Standalone(unrelated)),
            (1.3, SizingLine::ShrinkAmount { shrink_mb: 30.0 }),
        ],
        None,
    );
    let shrinks = of_type(&records, SizingType::TimeBasedEvaluationShrink);
    assert!(shrinks.len() == 1);
    assert!(shrinks[0].inactive_regions == Some(5));
    assert!(shrinks[0].total_empty_regions == Some(20));
    assert!(shrinks[0].shrink_mb == Some(30.0));
    assert!(abandoned == 0);
}

#[test]
fn test_unfinished_sequence() {
    let (records, abandoned) = run(
        vec![
            (1.0, SizingLine::Start),
            (1.1, SizingLine::Scan { inactive: 0, total: 20 }),
        ],
        None,
    );
    assert!(records.iter().filter(|e| is_summary(e)).count() == 0);
    assert!(abandoned == 1);

    // The scan of the first evaluation must not leak into the second.
    let (records, abandoned) = run(
        vec![
            (1.0, SizingLine::Start),
            (1.1, SizingLine::Scan { inactive: 7, total: 20 }),
            (2.0, SizingLine::Start),
            (2.1, SizingLine::ShrinkAmount { shrink_mb: 8.0 }),
        ],
        None,
    );
    let shrinks = of_type(&records, SizingType::TimeBasedEvaluationShrink);
    assert!(shrinks.len() == 1);
    assert!(shrinks[0].inactive_regions.is_none());
    assert!(shrinks[0].total_empty_regions.is_none());
    assert!(abandoned == 1);
}

#[test]
fn test_pending_decision() {
    let mut decision = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
    decision.inactive_regions = Some(6);
    decision.requested_regions = Some(4);
    let (records, _) = run(
        vec![
            (1.0, SizingLine::Start),
            (1.1, SizingLine::Decision(decision.clone())),
            (1.2, SizingLine::Request { shrink_mb: 4.0, candidates: 6 }),
            (1.3, SizingLine::Processing { uncommit_regions: 4, total_empty: 9 }),
            (1.4, SizingLine::Deactivated { count: 4 }),
        ],
        Some(1),
    );
    let types = records.iter().map(|e| e.sizing_type).collect::<Vec<SizingType>>();
    assert!(
        types
            == vec![
                SizingType::UncommitEvaluationStart,
                SizingType::TimeBasedEvaluationShrink,
                SizingType::TimeBasedRequest,
                SizingType::TimeBasedProcessing,
                SizingType::TimeBasedUncommit
            ]
    );
    let shrink = &records[1];
    assert!(shrink.shrink_mb == Some(4.0));
    assert!(shrink.requested_regions == Some(4));
    let uncommit = &records[4];
    assert!(uncommit.inactive_regions == Some(6));
    assert!(uncommit.uncommit_regions == Some(4));
    assert!(uncommit.uncommit_mb == Some(4.0));
    assert!(uncommit.total_empty_regions == Some(9));
    assert!(uncommit.requested_regions == Some(6));

    // A pending decision that never gets an amount is still reported.
    let (records, abandoned) = run(
        vec![
            (1.0, SizingLine::Start),
            (1.1, SizingLine::Decision(decision)),
            (2.0, SizingLine::Start),
        ],
        None,
    );
    let shrinks = of_type(&records, SizingType::TimeBasedEvaluationShrink);
    assert!(shrinks.len() == 1);
    assert!(shrinks[0].shrink_mb.is_none());
    assert!(abandoned == 2);
}

#[test]
fn test_deactivated_estimate() {
    let (records, _) = run(vec![(1.0, SizingLine::Deactivated { count: 3 })], Some(2));
    assert!(records.len() == 1);
    assert!(records[0].sizing_type == SizingType::TimeBasedUncommit);
    assert!(records[0].inactive_regions == Some(3));
    assert!(records[0].uncommit_mb == Some(6.0));

    let (records, _) = run(vec![(1.0, SizingLine::Deactivated { count: 3 })], None);
    assert!(records[0].uncommit_mb == Some(0.0));

    let mut r = SequenceReconstructor::new(None);
    r.set_region_size(4);
    r.feed(1.0, SizingLine::Deactivated { count: 3 });
    let (records, _) = r.finish();
    let EventKind::SizingActivity(ref e) = records[0].kind else {
        panic!("Not a sizing record")
    };
    assert!(e.uncommit_mb == Some(12.0));
}

#[test]
fn test_terminal_prefers_own_fields() {
    let mut no_action = SizingActivityEvent::new(SizingType::TimeBasedEvaluationNoUncommit);
    no_action.inactive_regions = Some(1);
    no_action.inactive_required = Some(4);
    let (records, abandoned) = run(
        vec![
            (1.0, SizingLine::Start),
            (1.1, SizingLine::Scan { inactive: 2, total: 20 }),
            (1.2, SizingLine::Terminal(no_action)),
        ],
        None,
    );
    let done = of_type(&records, SizingType::TimeBasedEvaluationNoUncommit);
    assert!(done.len() == 1);
    assert!(done[0].inactive_regions == Some(1));
    assert!(done[0].inactive_required == Some(4));
    assert!(done[0].total_empty_regions == Some(20));
    assert!(abandoned == 0);
}

#[test]
fn test_consecutive_decisions() {
    let mut first = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
    first.inactive_regions = Some(8);
    first.requested_regions = Some(8);
    first.shrink_mb = Some(8.0);
    let mut second = first.clone();
    second.inactive_regions = Some(2);
    second.shrink_mb = Some(2.0);
    let (records, abandoned) = run(
        vec![
            (1.0, SizingLine::Decision(first)),
            (1.1, SizingLine::ShrinkAmount { shrink_mb: 8.0 }),
            (2.0, SizingLine::Decision(second)),
        ],
        None,
    );
    let shrinks = of_type(&records, SizingType::TimeBasedEvaluationShrink);
    assert!(shrinks.len() == 2);
    assert!(shrinks[0].shrink_mb == Some(8.0));
    assert!(shrinks[1].inactive_regions == Some(2));
    assert!(abandoned == 0);
}

#[test]
fn test_pending_decision_keeps_log_order() {
    let decision = SizingActivityEvent::new(SizingType::TimeBasedEvaluationShrink);
    let mut candidate = SizingActivityEvent::new(SizingType::TimeBasedCandidate);
    candidate.region_id = Some(17);
    let mut r = SequenceReconstructor::new(None);
    r.feed(1.0, SizingLine::Start);
    r.feed(1.1, SizingLine::Decision(decision));
    r.feed(1.2, SizingLine::Standalone(candidate));
    r.pass(LogEvent {
        timestamp: 1.25,
        kind: EventKind::SizingActivity(SizingActivityEvent::new(SizingType::HeapSizingInit)),
    });

    // Only the start is ready, the rest waits for the shrink amount.
    let ready = r.take_records();
    assert!(ready.len() == 1);
    assert!(ready[0].timestamp == 1.0);

    r.feed(1.3, SizingLine::Request { shrink_mb: 4.0, candidates: 1 });
    let (rest, abandoned) = r.finish();
    let times = rest.iter().map(|e| e.timestamp).collect::<Vec<f64>>();
    assert!(times == vec![1.1, 1.2, 1.25, 1.3]);
    let EventKind::SizingActivity(ref summary) = rest[0].kind else {
        panic!("Not a sizing record")
    };
    assert!(summary.sizing_type == SizingType::TimeBasedEvaluationShrink);
    assert!(summary.shrink_mb == Some(4.0));
    assert!(abandoned == 0);

    // An abandoned pending summary also releases what was held behind it.
    let (records, abandoned) = run(
        vec![
            (1.0, SizingLine::Decision(SizingActivityEvent::new(
                SizingType::TimeBasedEvaluationShrink,
            ))),
            (1.1, SizingLine::Processing { uncommit_regions: 2, total_empty: 5 }),
        ],
        None,
    );
    let types = records.iter().map(|e| e.sizing_type).collect::<Vec<SizingType>>();
    assert!(types == vec![SizingType::TimeBasedEvaluationShrink, SizingType::TimeBasedProcessing]);
    assert!(abandoned == 1);
}
