use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use gclog::{HeapPauseEvent, ParsedLog};
use std::collections::HashMap;
use std::io;

struct Item {
    timestamp: f64,
    pause: HeapPauseEvent,
}

pub fn print(output: &mut dyn io::Write, print_args: &PrintArgs, log: &ParsedLog) -> Result<()> {
    let (formatters, aliases) = my_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = log
        .heap_pauses()
        .map(|(timestamp, p)| Item {
            timestamp,
            pause: p.clone(),
        })
        .collect::<Vec<Item>>();
    format::format_data(output, &fields, &formatters, &opts, data, &false)
}

pub fn fmt_help() -> format::Help {
    let (formatters, aliases) = my_formatters();
    format::Help {
        fields: formatters.keys().cloned().collect::<Vec<String>>(),
        aliases: aliases
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<(String, Vec<String>)>>(),
        defaults: FMT_DEFAULTS.to_string(),
    }
}

const FMT_DEFAULTS: &str = "std,capacity";

fn my_formatters() -> (
    HashMap<String, &'static dyn Fn(LogDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(LogDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_time);
    formatters.insert("gc".to_string(), &format_gc);
    formatters.insert("name".to_string(), &format_name);
    formatters.insert("heap-before".to_string(), &format_heap_before);
    formatters.insert("heap-after".to_string(), &format_heap_after);
    formatters.insert("capacity-before".to_string(), &format_capacity_before);
    formatters.insert("capacity-after".to_string(), &format_capacity_after);
    formatters.insert("duration".to_string(), &format_duration);

    aliases.insert(
        "std".to_string(),
        vec![
            "time".to_string(),
            "gc".to_string(),
            "name".to_string(),
            "heap-before".to_string(),
            "heap-after".to_string(),
            "duration".to_string(),
        ],
    );
    aliases.insert(
        "capacity".to_string(),
        vec!["capacity-before".to_string(), "capacity-after".to_string()],
    );
    aliases.insert(
        "all".to_string(),
        vec![
            "time".to_string(),
            "gc".to_string(),
            "name".to_string(),
            "heap-before".to_string(),
            "heap-after".to_string(),
            "capacity-before".to_string(),
            "capacity-after".to_string(),
            "duration".to_string(),
        ],
    );

    (formatters, aliases)
}

type LogDatum<'a> = &'a Item;
type LogCtx<'a> = &'a bool;

fn format_time(d: LogDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_gc(d: LogDatum, _: LogCtx) -> String {
    match d.pause.gc_id {
        Some(id) => id.to_string(),
        None => "".to_string(),
    }
}

fn format_name(d: LogDatum, _: LogCtx) -> String {
    d.pause.pause_name.to_string()
}

fn format_heap_before(d: LogDatum, _: LogCtx) -> String {
    d.pause.heap_before_mb.to_string()
}

fn format_heap_after(d: LogDatum, _: LogCtx) -> String {
    d.pause.heap_after_mb.to_string()
}

// The capacity before a pause is the capacity after the previous one.
fn format_capacity_before(d: LogDatum, _: LogCtx) -> String {
    d.pause.total_heap_before_mb.to_string()
}

fn format_capacity_after(d: LogDatum, _: LogCtx) -> String {
    d.pause.total_heap_after_mb.to_string()
}

fn format_duration(d: LogDatum, _: LogCtx) -> String {
    format!("{:.3}", d.pause.duration_ms)
}

#[test]
fn test_pauses_csv() {
    let text = "\
[1.000s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.250ms
[1.500s][info][gc] GC(1) Pause Remark 40M->40M(128M) 1.000ms
";
    let log = gclog::parse_log(text, None).unwrap();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("time,name,capacity,csv".to_string()),
    };
    print(&mut out, &print_args, &log).unwrap();
    assert!(
        String::from_utf8(out).unwrap()
            == "0.000,Young G1 Evacuation Pause,0,256\n0.500,Remark,256,128\n"
    );
}
