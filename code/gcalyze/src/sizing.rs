/// Heap sizing activity: the records themselves, the totals of the time-based policy, or the
/// running total of reclaimed memory.
///
/// The collector logs only every tenth "no uncommit needed" evaluation, so the summary's no-action
/// count is the logged count times the configured weight.  The record listing is not weighted.
use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use gclog::{ParsedLog, ReclaimedPoint, SizingActivityEvent, SizingSummary};
use gcutils::AnalysisConfig;
use std::collections::HashMap;
use std::io;

struct Record {
    timestamp: f64,
    sizing: SizingActivityEvent,
}

pub fn print_records(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    log: &ParsedLog,
) -> Result<()> {
    let (formatters, aliases) = record_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(RECORD_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = log
        .sizing_activity()
        .map(|(timestamp, s)| Record {
            timestamp,
            sizing: s.clone(),
        })
        .collect::<Vec<Record>>();
    format::format_data(output, &fields, &formatters, &opts, data, &false)
}

pub fn print_summary(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    cfg: &AnalysisConfig,
    log: &ParsedLog,
) -> Result<()> {
    let (formatters, aliases) = summary_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(SUMMARY_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = vec![gclog::sizing_summary(log)];
    format::format_data(output, &fields, &formatters, &opts, data, &cfg.no_action_weight)
}

pub fn print_cumulative(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    log: &ParsedLog,
) -> Result<()> {
    let (formatters, aliases) = cumulative_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(CUMULATIVE_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = gclog::cumulative_reclaimed(log);
    format::format_data(output, &fields, &formatters, &opts, data, &false)
}

pub fn fmt_help(summary: bool, cumulative: bool) -> format::Help {
    let (fields, aliases, defaults) = if summary {
        let (f, a) = summary_formatters();
        (f.into_keys().collect::<Vec<String>>(), a, SUMMARY_DEFAULTS)
    } else if cumulative {
        let (f, a) = cumulative_formatters();
        (f.into_keys().collect::<Vec<String>>(), a, CUMULATIVE_DEFAULTS)
    } else {
        let (f, a) = record_formatters();
        (f.into_keys().collect::<Vec<String>>(), a, RECORD_DEFAULTS)
    };
    format::Help {
        fields,
        aliases: aliases.into_iter().collect::<Vec<(String, Vec<String>)>>(),
        defaults: defaults.to_string(),
    }
}

fn names(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

fn opt<T: ToString>(x: &Option<T>) -> String {
    match x {
        Some(x) => x.to_string(),
        None => "".to_string(),
    }
}

// Records

const RECORD_DEFAULTS: &str = "time,type,regions,mb";

type RecordDatum<'a> = &'a Record;
type LogCtx<'a> = &'a bool;

fn record_formatters() -> (
    HashMap<String, &'static dyn Fn(RecordDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(RecordDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_time);
    formatters.insert("type".to_string(), &format_type);
    formatters.insert("mode".to_string(), &format_mode);
    formatters.insert("interval".to_string(), &format_interval);
    formatters.insert("delay".to_string(), &format_delay);
    formatters.insert("inactive".to_string(), &format_inactive);
    formatters.insert("required".to_string(), &format_required);
    formatters.insert("requested".to_string(), &format_requested);
    formatters.insert("empty".to_string(), &format_empty);
    formatters.insert("uncommit-regions".to_string(), &format_uncommit_regions);
    formatters.insert("uncommit-mb".to_string(), &format_uncommit_mb);
    formatters.insert("shrink-mb".to_string(), &format_shrink_mb);
    formatters.insert("heap-mb".to_string(), &format_heap_mb);
    formatters.insert("heap-bytes".to_string(), &format_heap_bytes);
    formatters.insert("min-heap-bytes".to_string(), &format_min_heap_bytes);
    formatters.insert("region".to_string(), &format_region);
    formatters.insert("last-access".to_string(), &format_last_access);
    formatters.insert("transition".to_string(), &format_transition);
    formatters.insert("efficiency".to_string(), &format_efficiency);

    aliases.insert(
        "regions".to_string(),
        names(&["inactive", "requested", "empty", "uncommit-regions"]),
    );
    aliases.insert(
        "mb".to_string(),
        names(&["uncommit-mb", "shrink-mb", "heap-mb"]),
    );
    aliases.insert(
        "policy".to_string(),
        names(&["mode", "interval", "delay", "required"]),
    );
    aliases.insert(
        "all".to_string(),
        names(&[
            "time",
            "type",
            "mode",
            "interval",
            "delay",
            "inactive",
            "required",
            "requested",
            "empty",
            "uncommit-regions",
            "uncommit-mb",
            "shrink-mb",
            "heap-mb",
            "heap-bytes",
            "min-heap-bytes",
            "region",
            "last-access",
            "transition",
            "efficiency",
        ]),
    );

    (formatters, aliases)
}

fn format_time(d: RecordDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_type(d: RecordDatum, _: LogCtx) -> String {
    d.sizing.sizing_type.to_string()
}

fn format_mode(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.sizing_mode)
}

fn format_interval(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.interval_ms)
}

fn format_delay(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.delay_ms)
}

fn format_inactive(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.inactive_regions)
}

fn format_required(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.inactive_required)
}

fn format_requested(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.requested_regions)
}

fn format_empty(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.total_empty_regions)
}

fn format_uncommit_regions(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.uncommit_regions)
}

fn format_uncommit_mb(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.uncommit_mb)
}

fn format_shrink_mb(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.shrink_mb)
}

fn format_heap_mb(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.heap_size_mb)
}

fn format_heap_bytes(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.heap_bytes)
}

fn format_min_heap_bytes(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.min_heap_bytes)
}

fn format_region(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.region_id)
}

fn format_last_access(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.last_access_ms)
}

fn format_transition(d: RecordDatum, _: LogCtx) -> String {
    opt(&d.sizing.transition_state)
}

// Only meaningful for uncommit records.
fn format_efficiency(d: RecordDatum, _: LogCtx) -> String {
    if d.sizing.sizing_type == gclog::SizingType::TimeBasedUncommit {
        format!("{:.1}", gclog::uncommit_efficiency(&d.sizing))
    } else {
        "".to_string()
    }
}

// Summary

const SUMMARY_DEFAULTS: &str = "all";

type SummaryDatum<'a> = &'a SizingSummary;

// The number of evaluations a logged no-action record stands for.
type WeightCtx<'a> = &'a usize;

fn summary_formatters() -> (
    HashMap<String, &'static dyn Fn(SummaryDatum, WeightCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(SummaryDatum, WeightCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("uncommits".to_string(), &format_uncommits);
    formatters.insert("no-action".to_string(), &format_no_action);
    formatters.insert("no-action-logged".to_string(), &format_no_action_logged);
    formatters.insert("reclaimed".to_string(), &format_reclaimed);
    formatters.insert("mode".to_string(), &format_summary_mode);
    formatters.insert("interval".to_string(), &format_summary_interval);
    formatters.insert("delay".to_string(), &format_summary_delay);

    aliases.insert(
        "all".to_string(),
        names(&["uncommits", "no-action", "reclaimed", "mode", "interval", "delay"]),
    );

    (formatters, aliases)
}

fn format_uncommits(d: SummaryDatum, _: WeightCtx) -> String {
    d.uncommit_count.to_string()
}

fn format_no_action(d: SummaryDatum, weight: WeightCtx) -> String {
    d.no_action_count.saturating_mul(*weight).to_string()
}

fn format_no_action_logged(d: SummaryDatum, _: WeightCtx) -> String {
    d.no_action_count.to_string()
}

fn format_reclaimed(d: SummaryDatum, _: WeightCtx) -> String {
    format!("{:.1}", d.total_reclaimed_mb)
}

fn format_summary_mode(d: SummaryDatum, _: WeightCtx) -> String {
    opt(&d.sizing_mode)
}

fn format_summary_interval(d: SummaryDatum, _: WeightCtx) -> String {
    opt(&d.interval_ms)
}

fn format_summary_delay(d: SummaryDatum, _: WeightCtx) -> String {
    opt(&d.delay_ms)
}

// Cumulative

const CUMULATIVE_DEFAULTS: &str = "all";

type PointDatum<'a> = &'a ReclaimedPoint;

fn cumulative_formatters() -> (
    HashMap<String, &'static dyn Fn(PointDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(PointDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_point_time);
    formatters.insert("uncommit-mb".to_string(), &format_point_uncommit);
    formatters.insert("cumulative-mb".to_string(), &format_point_cumulative);
    aliases.insert(
        "all".to_string(),
        names(&["time", "uncommit-mb", "cumulative-mb"]),
    );
    (formatters, aliases)
}

fn format_point_time(d: PointDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_point_uncommit(d: PointDatum, _: LogCtx) -> String {
    format!("{:.1}", d.uncommit_mb)
}

fn format_point_cumulative(d: PointDatum, _: LogCtx) -> String {
    format!("{:.1}", d.cumulative_mb)
}

#[cfg(test)]
fn structured_log() -> ParsedLog {
    let mut files = vec![
        "../tests/gclog/g1-structured-gc-sizing.log".to_string(),
        "../tests/gclog/g1-structured.log".to_string(),
    ];
    gclog::order_logfiles(&mut files, gcutils::DEFAULT_SIZING_LOG_MARKER);
    gclog::parse_log(&gclog::read_logfiles(&files).unwrap(), None).unwrap()
}

#[test]
fn test_sizing_summary_weighted() {
    let log = structured_log();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("uncommits,no-action,no-action-logged,reclaimed,mode,csv".to_string()),
    };
    print_summary(&mut out, &print_args, &Default::default(), &log).unwrap();
    assert!(String::from_utf8(out).unwrap() == "1,10,1,16.0,uncommit-only\n");
}

#[test]
fn test_sizing_summary_huge_weight() {
    let log = structured_log();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("no-action,no-action-logged,csv".to_string()),
    };
    let cfg = AnalysisConfig {
        no_action_weight: usize::MAX,
        ..Default::default()
    };
    print_summary(&mut out, &print_args, &cfg, &log).unwrap();
    assert!(String::from_utf8(out).unwrap() == format!("{},1\n", usize::MAX));
}

#[test]
fn test_sizing_uncommit_efficiency() {
    let log = structured_log();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("type,uncommit-regions,efficiency,csv".to_string()),
    };
    print_records(&mut out, &print_args, &log).unwrap();
    let out = String::from_utf8(out).unwrap();
    let uncommit = out
        .lines()
        .find(|l| l.starts_with("time_based_uncommit,"))
        .unwrap();
    assert!(uncommit == "time_based_uncommit,8,80.0");
}
