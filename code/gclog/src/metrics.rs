/// Quantities derived from the record streams: region occupancy rates, the aggregate pause
/// summary, and heap sizing totals.
use crate::events::{
    RegionTransitionEvent, RegionType, SizingActivityEvent, SizingType, ALL_REGION_TYPES,
};
use crate::logfile::ParsedLog;

use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRate {
    pub region_type: RegionType,
    pub timestamp: f64,
    pub rate_mb_per_s: f64,
}

/// Occupancy rates between consecutive samples of each region type, in MB/s, grouped by region
/// type in the order Eden, Survivor, Old, Humongous and by time within each group.
///
/// For Eden the rate is from the previous sample's count after collection to the current sample's
/// count before collection, ie, the allocation rate between collections.  For the other types it is
/// from count after to count after, the growth of retained data.  A pair of samples whose time
/// delta isn't positive yields no rate.

pub fn region_rates<'a>(
    samples: impl IntoIterator<Item = (f64, &'a RegionTransitionEvent)>,
    region_size_mb: u64,
) -> Vec<RegionRate> {
    let by_type = samples.into_iter().into_group_map_by(|(_, r)| r.region_type);
    let size = region_size_mb as f64;
    let mut rates = vec![];
    for region_type in ALL_REGION_TYPES {
        let Some(samples) = by_type.get(&region_type) else {
            continue;
        };
        for ((t0, prev), (t1, cur)) in samples.iter().tuple_windows() {
            let dt = t1 - t0;
            if dt <= 0.0 {
                continue;
            }
            let current = if region_type == RegionType::Eden {
                cur.before_count
            } else {
                cur.after_count
            };
            let delta = current as f64 - prev.after_count as f64;
            rates.push(RegionRate {
                region_type,
                timestamp: *t1,
                rate_mb_per_s: delta * size / dt,
            });
        }
    }
    rates
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PauseSummaryRow {
    pub name: String,
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub total_ms: f64,
    /// Percent of the run spent in this kind of pause; None if the run has no length.
    pub overhead_pct: Option<f64>,
}

/// Group the stop-the-world pauses by name and summarize each group, largest total first.  The
/// length of the run is taken to be the largest pause timestamp.

pub fn pause_summary(log: &ParsedLog) -> Vec<PauseSummaryRow> {
    let pauses = log
        .events
        .iter()
        .filter_map(|e| e.kind.pause_key().map(|(k, d)| (e.timestamp, k, d)))
        .collect::<Vec<(f64, String, f64)>>();
    let runtime_s = pauses.iter().map(|(t, _, _)| *t).fold(0.0, f64::max);
    let mut rows = pauses
        .into_iter()
        .map(|(_, k, d)| (k, d))
        .into_group_map()
        .into_iter()
        .map(|(name, durations)| {
            let total_ms: f64 = durations.iter().sum();
            PauseSummaryRow {
                name,
                count: durations.len(),
                min_ms: durations.iter().copied().fold(f64::INFINITY, f64::min),
                max_ms: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                total_ms,
                overhead_pct: if runtime_s > 0.0 {
                    Some(total_ms / (runtime_s * 1000.0) * 100.0)
                } else {
                    None
                },
            }
        })
        .collect::<Vec<PauseSummaryRow>>();
    rows.sort_by(|a, b| b.total_ms.total_cmp(&a.total_ms).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// "~0" below the threshold, two decimals otherwise, "n/a" when unknown.

pub fn format_overhead(overhead_pct: Option<f64>, threshold_pct: f64) -> String {
    match overhead_pct {
        None => "n/a".to_string(),
        Some(x) if x < threshold_pct => "~0".to_string(),
        Some(x) => format!("{:.2}", x),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclaimedPoint {
    pub timestamp: f64,
    pub uncommit_mb: f64,
    pub cumulative_mb: f64,
}

/// The running total of memory uncommitted by the time-based policy, in time order.

pub fn cumulative_reclaimed(log: &ParsedLog) -> Vec<ReclaimedPoint> {
    let mut uncommits = log
        .sizing_activity()
        .filter(|(_, s)| s.sizing_type == SizingType::TimeBasedUncommit)
        .map(|(t, s)| (t, s.uncommit_mb.unwrap_or(0.0)))
        .collect::<Vec<(f64, f64)>>();
    uncommits.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut cumulative_mb = 0.0;
    uncommits
        .into_iter()
        .map(|(timestamp, uncommit_mb)| {
            cumulative_mb += uncommit_mb;
            ReclaimedPoint {
                timestamp,
                uncommit_mb,
                cumulative_mb,
            }
        })
        .collect()
}

/// Uncommitted regions as a percentage of the inactive regions, 0 if there were none.

pub fn uncommit_efficiency(e: &SizingActivityEvent) -> f64 {
    match (e.uncommit_regions, e.inactive_regions) {
        (Some(u), Some(i)) if i > 0 => u as f64 * 100.0 / i as f64,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SizingSummary {
    pub uncommit_count: usize,
    /// Raw count of logged no-action records, not weighted.
    pub no_action_count: usize,
    pub total_reclaimed_mb: f64,
    pub sizing_mode: Option<String>,
    pub interval_ms: Option<u64>,
    pub delay_ms: Option<u64>,
}

pub fn sizing_summary(log: &ParsedLog) -> SizingSummary {
    let mut summary: SizingSummary = Default::default();
    for (_, s) in log.sizing_activity() {
        match s.sizing_type {
            SizingType::TimeBasedUncommit => {
                summary.uncommit_count += 1;
                summary.total_reclaimed_mb += s.uncommit_mb.unwrap_or(0.0);
            }
            SizingType::TimeBasedEvaluationNoUncommit => {
                summary.no_action_count += 1;
            }
            SizingType::HeapSizingInit => {
                if summary.sizing_mode.is_none() {
                    summary.sizing_mode = s.sizing_mode.clone();
                }
            }
            SizingType::SizingParameters => {
                if summary.interval_ms.is_none() && summary.delay_ms.is_none() {
                    summary.interval_ms = s.interval_ms;
                    summary.delay_ms = s.delay_ms;
                }
            }
            _ => {}
        }
    }
    summary
}

#[cfg(test)]
fn transition(region_type: RegionType, before_count: u64, after_count: u64) -> RegionTransitionEvent {
    RegionTransitionEvent {
        gc_id: 0,
        region_type,
        before_count,
        after_count,
    }
}

#[test]
fn test_eden_rate() {
    let a = transition(RegionType::Eden, 10, 2);
    let b = transition(RegionType::Eden, 8, 3);
    let rates = region_rates(vec![(0.0, &a), (1.0, &b)], 1);
    assert!(rates.len() == 1);
    assert!(rates[0].timestamp == 1.0);
    assert!(rates[0].rate_mb_per_s == 6.0);
}

#[test]
fn test_region_rates() {
    let o1 = transition(RegionType::Old, 5, 10);
    let e1 = transition(RegionType::Eden, 10, 0);
    let o2 = transition(RegionType::Old, 10, 14);
    let e2 = transition(RegionType::Eden, 12, 0);
    let o3 = transition(RegionType::Old, 14, 12);
    let rates = region_rates(
        vec![(0.0, &o1), (0.0, &e1), (2.0, &o2), (2.0, &e2), (2.0, &o3)],
        2,
    );
    // Eden first; the Old pair with no time between them is skipped.
    assert!(rates.len() == 2);
    assert!(rates[0].region_type == RegionType::Eden);
    assert!(rates[0].rate_mb_per_s == 12.0);
    assert!(rates[1].region_type == RegionType::Old);
    assert!(rates[1].rate_mb_per_s == 4.0);
}

#[test]
fn test_format_overhead() {
    assert!(format_overhead(Some(0.004), 0.01) == "~0");
    assert!(format_overhead(Some(1.2345), 0.01) == "1.23");
    assert!(format_overhead(Some(0.01), 0.01) == "0.01");
    assert!(format_overhead(None, 0.01) == "n/a");
}

#[test]
fn test_uncommit_efficiency() {
    let mut e = SizingActivityEvent::new(SizingType::TimeBasedUncommit);
    assert!(uncommit_efficiency(&e) == 0.0);
    e.uncommit_regions = Some(3);
    e.inactive_regions = Some(0);
    assert!(uncommit_efficiency(&e) == 0.0);
    e.inactive_regions = Some(4);
    assert!(uncommit_efficiency(&e) == 75.0);
}

#[test]
fn test_pause_summary() {
    let text = "\
[1.000s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.000ms
[2.000s][info][gc] GC(1) Pause Young (Normal) (G1 Evacuation Pause) 30M->6M(256M) 5.000ms
[3.000s][info][gc] GC(2) Pause Remark 40M->40M(256M) 1.000ms
[11.000s][info][gc] GC(3) Pause Young (Concurrent Start) (G1 Humongous Allocation) 40M->20M(256M) 12.000ms
";
    let log = crate::logfile::parse_log(text, None).unwrap();
    let rows = pause_summary(&log);
    assert!(rows.len() == 3);
    assert!(rows[0].name == "Concurrent Start G1 Humongous Allocation");
    assert!(rows[1].name == "Young G1 Evacuation Pause");
    assert!(rows[1].count == 2);
    assert!(rows[1].min_ms == 3.0 && rows[1].max_ms == 5.0 && rows[1].total_ms == 8.0);
    // Runtime after rebasing is 10s.
    assert!(format_overhead(rows[1].overhead_pct, 0.01) == "0.08");
    assert!(rows[2].name == "Remark");
}
