use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use gclog::{ParsedLog, PauseSummaryRow};
use gcutils::AnalysisConfig;
use std::collections::HashMap;
use std::io;

pub fn print(
    output: &mut dyn io::Write,
    print_args: &PrintArgs,
    cfg: &AnalysisConfig,
    log: &ParsedLog,
) -> Result<()> {
    let (formatters, aliases) = my_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = gclog::pause_summary(log);
    format::format_data(
        output,
        &fields,
        &formatters,
        &opts,
        data,
        &cfg.overhead_threshold_pct,
    )
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
    formatters.insert("name".to_string(), &format_name);
    formatters.insert("count".to_string(), &format_count);
    formatters.insert("min".to_string(), &format_min);
    formatters.insert("max".to_string(), &format_max);
    formatters.insert("avg".to_string(), &format_avg);
    formatters.insert("total".to_string(), &format_total);
    formatters.insert("overhead".to_string(), &format_overhead);

    aliases.insert(
        "all".to_string(),
        vec![
            "name".to_string(),
            "count".to_string(),
            "min".to_string(),
            "max".to_string(),
            "avg".to_string(),
            "total".to_string(),
            "overhead".to_string(),
        ],
    );

    (formatters, aliases)
}

type LogDatum<'a> = &'a PauseSummaryRow;

// The overhead threshold, in percent.
type LogCtx<'a> = &'a f64;

fn format_name(d: LogDatum, _: LogCtx) -> String {
    d.name.clone()
}

fn format_count(d: LogDatum, _: LogCtx) -> String {
    d.count.to_string()
}

fn format_min(d: LogDatum, _: LogCtx) -> String {
    format!("{:.3}", d.min_ms)
}

fn format_max(d: LogDatum, _: LogCtx) -> String {
    format!("{:.3}", d.max_ms)
}

fn format_avg(d: LogDatum, _: LogCtx) -> String {
    format!("{:.3}", d.total_ms / d.count as f64)
}

fn format_total(d: LogDatum, _: LogCtx) -> String {
    format!("{:.3}", d.total_ms)
}

fn format_overhead(d: LogDatum, threshold: LogCtx) -> String {
    gclog::format_overhead(d.overhead_pct, *threshold)
}

#[test]
fn test_summary_overhead() {
    let text = "\
[1.000s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.000ms
[51.000s][info][gc] GC(1) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 5.000ms
[51.000s][info][gc] GC(2) Pause Remark 40M->40M(256M) 0.001ms
";
    let log = gclog::parse_log(text, None).unwrap();
    let mut out = Vec::new();
    let print_args = PrintArgs {
        fmt: Some("name,count,avg,overhead,csv".to_string()),
    };
    print(&mut out, &print_args, &Default::default(), &log).unwrap();
    assert!(
        String::from_utf8(out).unwrap()
            == "Young G1 Evacuation Pause,2,4.000,0.02\nRemark,1,0.001,~0\n"
    );
}
