/// Region counts by region type, either as the raw samples (one per type per collection) or as
/// occupancy rates between consecutive samples of a type.
use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use gclog::{ParsedLog, RegionRate, RegionTransitionEvent};
use std::collections::HashMap;
use std::io;

struct Sample {
    timestamp: f64,
    transition: RegionTransitionEvent,
}

pub fn print_samples(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    log: &ParsedLog,
) -> Result<()> {
    let (formatters, aliases) = sample_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(SAMPLE_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = log
        .region_transitions()
        .map(|(timestamp, r)| Sample {
            timestamp,
            transition: r.clone(),
        })
        .collect::<Vec<Sample>>();
    format::format_data(output, &fields, &formatters, &opts, data, &false)
}

pub fn print_rates(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    region_size_mb: u64,
    log: &ParsedLog,
) -> Result<()> {
    let (formatters, aliases) = rate_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(RATE_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = gclog::region_rates(log.region_transitions(), region_size_mb);
    format::format_data(output, &fields, &formatters, &opts, data, &false)
}

pub fn fmt_help(rates: bool) -> format::Help {
    let (fields, aliases, defaults) = if rates {
        let (formatters, aliases) = rate_formatters();
        (formatters.into_keys().collect::<Vec<String>>(), aliases, RATE_DEFAULTS)
    } else {
        let (formatters, aliases) = sample_formatters();
        (formatters.into_keys().collect::<Vec<String>>(), aliases, SAMPLE_DEFAULTS)
    };
    format::Help {
        fields,
        aliases: aliases.into_iter().collect::<Vec<(String, Vec<String>)>>(),
        defaults: defaults.to_string(),
    }
}

const SAMPLE_DEFAULTS: &str = "all";

fn sample_formatters() -> (
    HashMap<String, &'static dyn Fn(SampleDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(SampleDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_sample_time);
    formatters.insert("gc".to_string(), &format_gc);
    formatters.insert("type".to_string(), &format_sample_type);
    formatters.insert("before".to_string(), &format_before);
    formatters.insert("after".to_string(), &format_after);

    aliases.insert(
        "all".to_string(),
        vec![
            "time".to_string(),
            "gc".to_string(),
            "type".to_string(),
            "before".to_string(),
            "after".to_string(),
        ],
    );

    (formatters, aliases)
}

const RATE_DEFAULTS: &str = "all";

fn rate_formatters() -> (
    HashMap<String, &'static dyn Fn(RateDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(RateDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_rate_time);
    formatters.insert("type".to_string(), &format_rate_type);
    formatters.insert("rate".to_string(), &format_rate);

    aliases.insert(
        "all".to_string(),
        vec!["time".to_string(), "type".to_string(), "rate".to_string()],
    );

    (formatters, aliases)
}

type SampleDatum<'a> = &'a Sample;
type RateDatum<'a> = &'a RegionRate;
type LogCtx<'a> = &'a bool;

fn format_sample_time(d: SampleDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_gc(d: SampleDatum, _: LogCtx) -> String {
    d.transition.gc_id.to_string()
}

fn format_sample_type(d: SampleDatum, _: LogCtx) -> String {
    d.transition.region_type.to_string()
}

fn format_before(d: SampleDatum, _: LogCtx) -> String {
    d.transition.before_count.to_string()
}

fn format_after(d: SampleDatum, _: LogCtx) -> String {
    d.transition.after_count.to_string()
}

fn format_rate_time(d: RateDatum, _: LogCtx) -> String {
    format!("{:.3}", d.timestamp)
}

fn format_rate_type(d: RateDatum, _: LogCtx) -> String {
    d.region_type.to_string()
}

fn format_rate(d: RateDatum, _: LogCtx) -> String {
    format!("{:.2}", d.rate_mb_per_s)
}

#[test]
fn test_region_rates_csv() {
    let text = "\
[1.000s][info][gc,heap] GC(0) Eden regions: 10->0(12)
[1.000s][info][gc,heap] GC(0) Old regions: 2->4
[3.000s][info][gc,heap] GC(1) Eden regions: 12->0(12)
[3.000s][info][gc,heap] GC(1) Old regions: 4->5
";
    let log = gclog::parse_log(text, None).unwrap();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("all,csv,header".to_string()),
    };
    print_rates(&mut out, &print_args, 2, &log).unwrap();
    assert!(
        String::from_utf8(out).unwrap() == "time,type,rate\n2.000,Eden,12.00\n2.000,Old,1.00\n"
    );
}
