use crate::format;
use crate::PrintArgs;

use anyhow::Result;
use gclog::{ParsedLog, ScalingEvent};
use std::collections::HashMap;
use std::io;

struct Item {
    timestamp: f64,
    scaling: ScalingEvent,
}

pub fn print(output: &mut dyn io::Write, print_args: &PrintArgs, log: &ParsedLog) -> Result<()> {
    let (formatters, aliases) = my_formatters();
    let spec = print_args.fmt.as_deref().unwrap_or(FMT_DEFAULTS);
    let (fields, others) = format::parse_fields(spec, &formatters, &aliases)?;
    let opts = format::standard_options(&others);
    let data = log
        .scaling_events()
        .map(|(timestamp, s)| Item {
            timestamp,
            scaling: s.clone(),
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

const FMT_DEFAULTS: &str = "all";

fn my_formatters() -> (
    HashMap<String, &'static dyn Fn(LogDatum, LogCtx) -> String>,
    HashMap<String, Vec<String>>,
) {
    let mut formatters: HashMap<String, &'static dyn Fn(LogDatum, LogCtx) -> String> =
        HashMap::new();
    let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
    formatters.insert("time".to_string(), &format_time);
    formatters.insert("gc".to_string(), &format_gc);
    formatters.insert("user".to_string(), &format_user);
    formatters.insert("sys".to_string(), &format_sys);
    formatters.insert("real".to_string(), &format_real);
    formatters.insert("factor".to_string(), &format_factor);

    aliases.insert(
        "all".to_string(),
        vec![
            "time".to_string(),
            "gc".to_string(),
            "user".to_string(),
            "sys".to_string(),
            "real".to_string(),
            "factor".to_string(),
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
    d.scaling.gc_id.to_string()
}

fn format_user(d: LogDatum, _: LogCtx) -> String {
    format!("{:.2}", d.scaling.user_s)
}

fn format_sys(d: LogDatum, _: LogCtx) -> String {
    format!("{:.2}", d.scaling.sys_s)
}

fn format_real(d: LogDatum, _: LogCtx) -> String {
    format!("{:.2}", d.scaling.real_s)
}

// Infinite when the collection took no measurable real time.
fn format_factor(d: LogDatum, _: LogCtx) -> String {
    if d.scaling.scaling_factor.is_finite() {
        format!("{:.2}", d.scaling.scaling_factor)
    } else {
        "inf".to_string()
    }
}

#[test]
fn test_scaling_fixed() {
    let text = "\
[2.000s][info][gc,cpu] GC(3) User=0.04s Sys=0.02s Real=0.03s
[2.500s][info][gc,cpu] GC(4) User=0.01s Sys=0.00s Real=0.00s
";
    let log = gclog::parse_log(text, None).unwrap();
    let mut out = Vec::new();
    print(&mut out, &Default::default(), &log).unwrap();
    assert!(
        String::from_utf8(out).unwrap()
            == "\
time   gc  user  sys   real  factor
0.000  3   0.04  0.02  0.03  2.00
0.500  4   0.01  0.00  0.00  inf
"
    );
}
