/// The records of the low-pause collector, one table per kind of record.  The generation column is
/// empty for logs from the non-generational collector.
use crate::format;
use crate::{PrintArgs, ZgcKind};

use anyhow::Result;
use gclog::{
    CollectionCauseEvent, ConcurrentPhaseEvent, Generation, PageSizingEvent, ParsedLog, PauseEvent,
};
use std::collections::HashMap;
use std::io;

struct Item<T> {
    timestamp: f64,
    record: T,
}

fn items<'a, T: Clone + 'a>(xs: impl Iterator<Item = (f64, &'a T)>) -> Vec<Item<T>> {
    xs.map(|(timestamp, record)| Item {
        timestamp,
        record: record.clone(),
    })
    .collect()
}

pub fn print(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    kind: ZgcKind,
    log: &ParsedLog,
) -> Result<()> {
    let defaults = FMT_DEFAULTS;
    let spec = print_args.fmt.as_deref().unwrap_or(defaults);
    match kind {
        ZgcKind::Pause => {
            let (formatters, aliases) = pause_formatters();
            let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
            let opts = format::standard_options(&others);
            let data = items(log.pauses());
            format::format_data(output, &fields, &formatters, &opts, data, &false)
        }
        ZgcKind::Concurrent => {
            let (formatters, aliases) = concurrent_formatters();
            let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
            let opts = format::standard_options(&others);
            let data = items(log.concurrent_phases());
            format::format_data(output, &fields, &formatters, &opts, data, &false)
        }
        ZgcKind::Pages => {
            let (formatters, aliases) = page_formatters();
            let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
            let opts = format::standard_options(&others);
            let data = items(log.page_sizing());
            format::format_data(output, &fields, &formatters, &opts, data, &false)
        }
        ZgcKind::Cause => {
            let (formatters, aliases) = cause_formatters();
            let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
            let opts = format::standard_options(&others);
            let data = items(log.collection_causes());
            format::format_data(output, &fields, &formatters, &opts, data, &false)
        }
    }
}

pub fn fmt_help(kind: ZgcKind) -> format::Help {
    let (fields, aliases) = match kind {
        ZgcKind::Pause => {
            let (f, a) = pause_formatters();
            (f.into_keys().collect::<Vec<String>>(), a)
        }
        ZgcKind::Concurrent => {
            let (f, a) = concurrent_formatters();
            (f.into_keys().collect::<Vec<String>>(), a)
        }
        ZgcKind::Pages => {
            let (f, a) = page_formatters();
            (f.into_keys().collect::<Vec<String>>(), a)
        }
        ZgcKind::Cause => {
            let (f, a) = cause_formatters();
            (f.into_keys().collect::<Vec<String>>(), a)
        }
    };
    format::Help {
        fields,
        aliases: aliases.into_iter().collect::<Vec<(String, Vec<String>)>>(),
        defaults: FMT_DEFAULTS.to_string(),
    }
}

const FMT_DEFAULTS: &str = "all";

type LogCtx<'a> = &'a bool;

fn names(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

fn format_generation(g: Option<Generation>) -> String {
    match g {
        Some(g) => g.to_string(),
        None => "".to_string(),
    }
}

// Pauses

type PauseDatum<'a> = &'a Item<PauseEvent>;

fn pause_formatters() -> (
    HashMap<String, &'static dyn Fn(PauseDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(PauseDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_pause_time);
    formatters.insert("gc".to_string(), &format_pause_gc);
    formatters.insert("generation".to_string(), &format_pause_generation);
    formatters.insert("type".to_string(), &format_pause_type);
    formatters.insert("duration".to_string(), &format_pause_duration);
    aliases.insert(
        "all".to_string(),
        names(&["time", "gc", "generation", "type", "duration"]),
    );
    (formatters, aliases)
}

fn format_pause_time(d: PauseDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_pause_gc(d: PauseDatum, _: LogCtx) -> String {
    d.record.gc_id.to_string()
}

fn format_pause_generation(d: PauseDatum, _: LogCtx) -> String {
    format_generation(d.record.generation)
}

fn format_pause_type(d: PauseDatum, _: LogCtx) -> String {
    d.record.pause_type.to_string()
}

fn format_pause_duration(d: PauseDatum, _: LogCtx) -> String {
    format!("{:.3}", d.record.duration_ms)
}

// Concurrent phases

type PhaseDatum<'a> = &'a Item<ConcurrentPhaseEvent>;

fn concurrent_formatters() -> (
    HashMap<String, &'static dyn Fn(PhaseDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(PhaseDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_phase_time);
    formatters.insert("gc".to_string(), &format_phase_gc);
    formatters.insert("generation".to_string(), &format_phase_generation);
    formatters.insert("type".to_string(), &format_phase_type);
    formatters.insert("duration".to_string(), &format_phase_duration);
    aliases.insert(
        "all".to_string(),
        names(&["time", "gc", "generation", "type", "duration"]),
    );
    (formatters, aliases)
}

fn format_phase_time(d: PhaseDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_phase_gc(d: PhaseDatum, _: LogCtx) -> String {
    d.record.gc_id.to_string()
}

fn format_phase_generation(d: PhaseDatum, _: LogCtx) -> String {
    format_generation(d.record.generation)
}

fn format_phase_type(d: PhaseDatum, _: LogCtx) -> String {
    d.record.phase_type.to_string()
}

fn format_phase_duration(d: PhaseDatum, _: LogCtx) -> String {
    format!("{:.3}", d.record.duration_ms)
}

// Page tables

type PageDatum<'a> = &'a Item<PageSizingEvent>;

fn page_formatters() -> (
    HashMap<String, &'static dyn Fn(PageDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(PageDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_page_time);
    formatters.insert("gc".to_string(), &format_page_gc);
    formatters.insert("generation".to_string(), &format_page_generation);
    formatters.insert("type".to_string(), &format_page_type);
    formatters.insert("candidates".to_string(), &format_page_candidates);
    formatters.insert("selected".to_string(), &format_page_selected);
    formatters.insert("in-place".to_string(), &format_page_in_place);
    formatters.insert("size".to_string(), &format_page_size);
    formatters.insert("empty".to_string(), &format_page_empty);
    formatters.insert("relocated".to_string(), &format_page_relocated);
    aliases.insert(
        "all".to_string(),
        names(&[
            "time",
            "gc",
            "generation",
            "type",
            "candidates",
            "selected",
            "in-place",
            "size",
            "empty",
            "relocated",
        ]),
    );
    aliases.insert("memory".to_string(), names(&["size", "empty", "relocated"]));
    (formatters, aliases)
}

fn format_page_time(d: PageDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_page_gc(d: PageDatum, _: LogCtx) -> String {
    d.record.gc_id.to_string()
}

fn format_page_generation(d: PageDatum, _: LogCtx) -> String {
    format_generation(d.record.generation)
}

fn format_page_type(d: PageDatum, _: LogCtx) -> String {
    d.record.page_type.to_string()
}

fn format_page_candidates(d: PageDatum, _: LogCtx) -> String {
    d.record.candidates.to_string()
}

fn format_page_selected(d: PageDatum, _: LogCtx) -> String {
    d.record.selected.to_string()
}

fn format_page_in_place(d: PageDatum, _: LogCtx) -> String {
    d.record.in_place.to_string()
}

fn format_page_size(d: PageDatum, _: LogCtx) -> String {
    format!("{}", d.record.size_mb)
}

fn format_page_empty(d: PageDatum, _: LogCtx) -> String {
    format!("{}", d.record.empty_mb)
}

fn format_page_relocated(d: PageDatum, _: LogCtx) -> String {
    format!("{}", d.record.relocated_mb)
}

// Collection causes

type CauseDatum<'a> = &'a Item<CollectionCauseEvent>;

fn cause_formatters() -> (
    HashMap<String, &'static dyn Fn(CauseDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(CauseDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_cause_time);
    formatters.insert("gc".to_string(), &format_cause_gc);
    formatters.insert("collection".to_string(), &format_cause_collection);
    formatters.insert("cause".to_string(), &format_cause_cause);
    formatters.insert("before".to_string(), &format_cause_before);
    formatters.insert("before-pct".to_string(), &format_cause_before_pct);
    formatters.insert("after".to_string(), &format_cause_after);
    formatters.insert("after-pct".to_string(), &format_cause_after_pct);
    formatters.insert("duration".to_string(), &format_cause_duration);
    aliases.insert(
        "all".to_string(),
        names(&[
            "time",
            "gc",
            "collection",
            "cause",
            "before",
            "before-pct",
            "after",
            "after-pct",
            "duration",
        ]),
    );
    (formatters, aliases)
}

fn format_cause_time(d: CauseDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_cause_gc(d: CauseDatum, _: LogCtx) -> String {
    d.record.gc_id.to_string()
}

fn format_cause_collection(d: CauseDatum, _: LogCtx) -> String {
    d.record.collection_type.to_string()
}

fn format_cause_cause(d: CauseDatum, _: LogCtx) -> String {
    d.record.cause.to_string()
}

fn format_cause_before(d: CauseDatum, _: LogCtx) -> String {
    d.record.before_mb.to_string()
}

fn format_cause_before_pct(d: CauseDatum, _: LogCtx) -> String {
    d.record.before_pct.to_string()
}

fn format_cause_after(d: CauseDatum, _: LogCtx) -> String {
    d.record.after_mb.to_string()
}

fn format_cause_after_pct(d: CauseDatum, _: LogCtx) -> String {
    d.record.after_pct.to_string()
}

// Legacy logs don't give the duration of the collection.
fn format_cause_duration(d: CauseDatum, _: LogCtx) -> String {
    match d.record.duration_s {
        Some(s) => format!("{:.3}", s),
        None => "".to_string(),
    }
}

#[test]
fn test_zgc_pauses() {
    let log = gclog::parse_log(
        &std::fs::read_to_string("../tests/gclog/zgc-legacy.log").unwrap(),
        None,
    )
    .unwrap();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("generation,type,csv".to_string()),
    };
    print(&mut out, &print_args, ZgcKind::Pause, &log).unwrap();
    let out = String::from_utf8(out).unwrap();
    let lines = out.lines().collect::<Vec<&str>>();
    assert!(lines.len() == 3);
    assert!(lines[0] == ",Mark Start");
}

#[test]
fn test_zgc_causes() {
    let log = gclog::parse_log(
        &std::fs::read_to_string("../tests/gclog/zgc-legacy.log").unwrap(),
        None,
    )
    .unwrap();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("collection,cause,duration,json".to_string()),
    };
    print(&mut out, &print_args, ZgcKind::Cause, &log).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert!(v[0]["collection"] == "Garbage Collection");
    assert!(v[0]["cause"] == "Warmup");
    assert!(v[0]["duration"] == "");
}
