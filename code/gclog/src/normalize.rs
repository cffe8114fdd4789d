/// Batch rebasing of timestamps.
///
/// After a batch has been extracted the earliest timestamp is subtracted from every record, so the
/// batch starts at time 0.  Ordering is preserved since the same amount is subtracted everywhere.
/// The primary records and the scaling records are rebased as separate batches.
use crate::events::LogEvent;

pub fn rebase(events: &mut [LogEvent]) {
    let Some(base) = events
        .iter()
        .map(|e| e.timestamp)
        .min_by(|a, b| a.total_cmp(b))
    else {
        return;
    };
    for e in events.iter_mut() {
        e.timestamp -= base;
    }
}

#[cfg(test)]
use crate::events::{EventKind, ScalingEvent};

#[cfg(test)]
fn sample(timestamp: f64) -> LogEvent {
    LogEvent {
        timestamp,
        kind: EventKind::Scaling(ScalingEvent::new(0, 0.0, 0.0, 0.0)),
    }
}

#[test]
fn test_rebase() {
    let mut events = vec![sample(1751371205.5), sample(1751371200.25), sample(1751371203.0)];
    rebase(&mut events);
    let ts = events.iter().map(|e| e.timestamp).collect::<Vec<f64>>();
    assert!(ts == vec![5.25, 0.0, 2.75]);

    let mut none: Vec<LogEvent> = vec![];
    rebase(&mut none);
    assert!(none.is_empty());

    // Rebasing a rebased batch changes nothing.
    rebase(&mut events);
    let again = events.iter().map(|e| e.timestamp).collect::<Vec<f64>>();
    assert!(again == ts);
}
