use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use gclog::{Dialect, FormatInfo, ParsedLog};
use std::collections::HashMap;
use std::io;

struct Item {
    info: FormatInfo,
    events: usize,
}

pub fn print(output: &mut dyn io::Write, print_args: &PrintArgs, log: &ParsedLog) -> Result<()> {
    let (formatters, aliases) = my_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let mut opts = format::standard_options(&others);
    // `metadata` defaults to a single line of named csv.
    if !opts.fixed && !opts.csv && !opts.json {
        opts.csv = true;
        opts.named = true;
        opts.header = false;
    }
    let data = vec![Item {
        info: log.format_info.clone(),
        events: log.events.len() + log.scaling.len(),
    }];
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

const FMT_DEFAULTS: &str = "all";

fn my_formatters() -> (
    HashMap<String, &'static dyn Fn(LogDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(LogDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("dialect".to_string(), &format_dialect);
    formatters.insert("pidtid".to_string(), &format_pidtid);
    formatters.insert("collector".to_string(), &format_collector);
    formatters.insert("jdk".to_string(), &format_jdk);
    formatters.insert("region-size".to_string(), &format_region_size);
    formatters.insert("sizing".to_string(), &format_sizing);
    formatters.insert("uncommit-only".to_string(), &format_uncommit_only);
    formatters.insert("events".to_string(), &format_events);

    aliases.insert(
        "all".to_string(),
        vec![
            "dialect".to_string(),
            "pidtid".to_string(),
            "collector".to_string(),
            "jdk".to_string(),
            "region-size".to_string(),
            "sizing".to_string(),
            "uncommit-only".to_string(),
            "events".to_string(),
        ],
    );

    (formatters, aliases)
}

type LogDatum<'a> = &'a Item;
type LogCtx<'a> = &'a bool;

fn format_dialect(d: LogDatum, _: LogCtx) -> String {
    match d.info.dialect {
        Dialect::TraditionalElapsedSeconds => "uptime".to_string(),
        Dialect::StructuredTimestampPidTid => "wallclock".to_string(),
    }
}

fn format_pidtid(d: LogDatum, _: LogCtx) -> String {
    yes_no(d.info.has_pid_tid)
}

fn format_collector(d: LogDatum, _: LogCtx) -> String {
    match d.info.collector_family {
        gclog::CollectorFamily::RegionBased => "G1".to_string(),
        gclog::CollectorFamily::ConcurrentLowPause => "ZGC".to_string(),
        gclog::CollectorFamily::Unknown => "unknown".to_string(),
    }
}

fn format_jdk(d: LogDatum, _: LogCtx) -> String {
    d.info.jdk_version.clone().unwrap_or_else(|| "unknown".to_string())
}

fn format_region_size(d: LogDatum, _: LogCtx) -> String {
    match d.info.region_size_mb {
        Some(mb) => format!("{mb}M"),
        None => "unknown".to_string(),
    }
}

fn format_sizing(d: LogDatum, _: LogCtx) -> String {
    yes_no(d.info.has_sizing_data)
}

fn format_uncommit_only(d: LogDatum, _: LogCtx) -> String {
    yes_no(d.info.uncommit_only)
}

fn format_events(d: LogDatum, _: LogCtx) -> String {
    d.events.to_string()
}

fn yes_no(b: bool) -> String {
    let s = if b { "yes" } else { "no" };
    s.to_string()
}

#[test]
fn test_metadata_defaults() {
    let text = "\
[0.004s][info][gc,init] Version: 17.0.8+7-LTS (release)
[0.005s][info][gc] Using G1
[1.000s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.000ms
";
    let log = gclog::parse_log(text, None).unwrap();
    let mut out = Vec::new();
    print(&mut out, &Default::default(), &log).unwrap();
    assert!(
        String::from_utf8(out).unwrap()
            == "dialect=uptime,pidtid=no,collector=G1,jdk=17.0.8+7-LTS,region-size=unknown,\
                sizing=no,uncommit-only=no,events=1\n"
    );
}
