// End-to-end tests against the sample logs in ../tests/gclog.

use crate::{
    cumulative_reclaimed, order_logfiles, parse_log, pause_summary, read_logfiles, region_rates,
    sizing_summary, uncommit_efficiency, Category, CollectorFamily, Dialect, GcLogError,
    Generation, HeapPauseEvent, ParsedLog, RegionType, SizingActivityEvent, SizingType,
};

fn parse_files(files: &[&str]) -> ParsedLog {
    let mut files = files
        .iter()
        .map(|f| format!("../tests/gclog/{f}"))
        .collect::<Vec<String>>();
    order_logfiles(&mut files, "gc-sizing");
    parse_log(&read_logfiles(&files).unwrap(), None).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_traditional_g1() {
    let log = parse_files(&["g1-traditional.log"]);
    let info = &log.format_info;
    assert!(info.dialect == Dialect::TraditionalElapsedSeconds);
    assert!(!info.has_pid_tid);
    assert!(info.collector_family == CollectorFamily::RegionBased);
    assert!(info.jdk_version.as_deref() == Some("17.0.8+7-LTS"));
    assert!(info.region_size_mb == Some(1));
    assert!(!info.has_sizing_data);
    assert!(!info.uncommit_only);

    let pauses = log.heap_pauses().collect::<Vec<(f64, &HeapPauseEvent)>>();
    let names = pauses.iter().map(|(_, p)| p.pause_name.as_str()).collect::<Vec<&str>>();
    assert!(
        names
            == vec![
                "Young G1 Evacuation Pause",
                "Concurrent Start G1 Humongous Allocation",
                "Remark",
                "Cleanup",
                "Mixed G1 Evacuation Pause",
                "Full SystemGC"
            ]
    );
    let before = pauses.iter().map(|(_, p)| p.total_heap_before_mb).collect::<Vec<u64>>();
    assert!(before == vec![0, 256, 256, 256, 256, 128]);
    assert!(pauses[0].0 == 0.0);
    assert!(close(pauses[5].0, 4.997));

    // Archive regions are not counted.
    assert!(log.count(Category::RegionTransition) == 12);

    let scaling = log.scaling_events().collect::<Vec<_>>();
    assert!(scaling.len() == 5);
    assert!(scaling[0].0 == 0.0);
    assert!(close(scaling[0].1.scaling_factor, 2.0));
    assert!(scaling[1].1.scaling_factor == f64::INFINITY);

    assert!(log.require(Category::Scaling).is_ok());
    assert!(matches!(
        log.require(Category::SizingActivity),
        Err(GcLogError::MissingCategory(Category::SizingActivity))
    ));
    assert!(log.stats.discarded == 0);
}

#[test]
fn test_traditional_g1_metrics() {
    let log = parse_files(&["g1-traditional.log"]);

    let rows = pause_summary(&log);
    assert!(rows.len() == 6);
    assert!(rows[0].name == "Full SystemGC");
    assert!(rows[5].name == "Cleanup");

    let rates = region_rates(log.region_transitions(), 1);
    let eden = rates
        .iter()
        .filter(|r| r.region_type == RegionType::Eden)
        .collect::<Vec<_>>();
    assert!(eden.len() == 2);
    assert!(close(eden[0].rate_mb_per_s, 20.0 / 1.002));
    assert!(rates[0].region_type == RegionType::Eden);
    assert!(rates.last().unwrap().region_type == RegionType::Humongous);
}

#[test]
fn test_structured_g1_with_sizing_log() {
    // The sizing log is named first but must be parsed last.
    let log = parse_files(&["g1-structured-gc-sizing.log", "g1-structured.log"]);
    let info = &log.format_info;
    assert!(info.dialect == Dialect::StructuredTimestampPidTid);
    assert!(info.has_pid_tid);
    assert!(info.collector_family == CollectorFamily::RegionBased);
    assert!(info.jdk_version.as_deref() == Some("21.0.2+13-LTS"));
    assert!(info.region_size_mb == Some(2));
    assert!(info.has_sizing_data);
    assert!(info.uncommit_only);

    // The earliest record is the sizing initialization.
    let first = log.events.iter().map(|e| e.timestamp).fold(f64::INFINITY, f64::min);
    assert!(first == 0.0);
    // A decision whose shrink amount comes later still sorts before the lines after it.
    assert!(log.events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    let pauses = log.heap_pauses().collect::<Vec<(f64, &HeapPauseEvent)>>();
    assert!(close(pauses[0].0, 0.994));
    assert!(close(pauses[1].0 - pauses[0].0, 2.5));

    assert!(log.count(Category::SizingActivity) == 21);
    assert!(log.stats.abandoned_evaluations == 1);

    let records = log.sizing_activity().map(|(_, s)| s).collect::<Vec<&SizingActivityEvent>>();
    let shrinks = records
        .iter()
        .filter(|s| s.sizing_type == SizingType::TimeBasedEvaluationShrink)
        .collect::<Vec<_>>();
    assert!(shrinks.len() == 2);
    assert!(shrinks[0].shrink_mb == Some(16.0));
    assert!(shrinks[0].inactive_regions == Some(10));
    assert!(shrinks[0].requested_regions == Some(4));
    assert!(shrinks[0].total_empty_regions == Some(40));
    assert!(shrinks[1].shrink_mb == Some(12.0));
    assert!(shrinks[1].inactive_regions == Some(6));

    let uncommit = records
        .iter()
        .find(|s| s.sizing_type == SizingType::TimeBasedUncommit)
        .unwrap();
    assert!(uncommit.uncommit_regions == Some(8));
    assert!(uncommit.uncommit_mb == Some(16.0));
    assert!(uncommit.total_empty_regions == Some(12));
    assert!(uncommit.requested_regions == Some(10));
    assert!(uncommit_efficiency(uncommit) == 80.0);

    let no_action = records
        .iter()
        .find(|s| s.sizing_type == SizingType::TimeBasedEvaluationNoUncommit)
        .unwrap();
    assert!(no_action.inactive_regions == Some(2));
    assert!(no_action.total_empty_regions == Some(32));
    assert!(no_action.heap_bytes == Some(201326592));

    let details = records
        .iter()
        .find(|s| s.sizing_type == SizingType::HeapShrinkDetails)
        .unwrap();
    assert!(details.heap_size_mb == Some(180.0));
    assert!(details.inactive_regions == Some(6));

    let summary = sizing_summary(&log);
    assert!(summary.uncommit_count == 1);
    assert!(summary.no_action_count == 1);
    assert!(summary.total_reclaimed_mb == 16.0);
    assert!(summary.sizing_mode.as_deref() == Some("uncommit-only"));
    assert!(summary.interval_ms == Some(60000));
    assert!(summary.delay_ms == Some(300000));

    let reclaimed = cumulative_reclaimed(&log);
    assert!(reclaimed.len() == 1);
    assert!(reclaimed[0].cumulative_mb == 16.0);
}

#[test]
fn test_generational_zgc() {
    let log = parse_files(&["zgc-generational.log"]);
    assert!(log.format_info.collector_family == CollectorFamily::ConcurrentLowPause);
    assert!(log.count(Category::Pause) == 5);
    assert!(log.count(Category::ConcurrentPhase) == 4);
    assert!(log.count(Category::PageSizing) == 2);
    assert!(log.count(Category::CollectionCause) == 2);
    assert!(log.count(Category::HeapPause) == 0);

    let pauses = log.pauses().map(|(_, p)| p).collect::<Vec<_>>();
    assert!(pauses[2].pause_type.as_str() == "Mark Start (Major)");
    assert!(pauses[2].generation == Some(Generation::Young));
    assert!(pauses[3].generation == Some(Generation::Old));
    let phases = log
        .concurrent_phases()
        .map(|(_, p)| p.phase_type.as_str())
        .collect::<Vec<&str>>();
    assert!(phases == vec!["Mark", "Mark Free", "Relocate", "Mark"]);

    let rows = pause_summary(&log);
    assert!(rows.iter().any(|r| r.name == "Old Pause Mark End"));
}

#[test]
fn test_legacy_zgc() {
    let log = parse_files(&["zgc-legacy.log"]);
    assert!(log.format_info.collector_family == CollectorFamily::ConcurrentLowPause);
    assert!(log.format_info.jdk_version.as_deref() == Some("17.0.8+7-LTS"));
    assert!(log.count(Category::Pause) == 3);
    assert!(log.pauses().all(|(_, p)| p.generation.is_none()));
    assert!(log.count(Category::ConcurrentPhase) == 2);
    let causes = log.collection_causes().map(|(_, c)| c).collect::<Vec<_>>();
    assert!(causes.len() == 1);
    assert!(causes[0].cause.as_str() == "Warmup");
    assert!(causes[0].duration_s.is_none());
    let rows = pause_summary(&log);
    assert!(rows[0].name == "Pause Mark End");
}
