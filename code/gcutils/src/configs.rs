/// Read analysis settings from a json file.
///
/// File format:
///
/// An object { ... } with the following named fields and value types, all optional:
///
///   region-size-mb - integer, the region size to assume when the log itself never prints
///      "Heap Region Size: NM".  A size found in the log always wins.
///   sizing-log-marker - string, the file name substring that identifies a supplementary heap
///      sizing log; such files are parsed after the primary logs.  Default "gc-sizing".
///   no-action-weight - integer, the number of evaluations a single logged "no uncommit needed"
///      entry stands for in sizing summaries.  Default 10.
///   overhead-threshold-pct - number, pause overhead below this is printed as "~0".
///      Default 0.01.
///
/// Any field name starting with '#' is reserved for arbitrary comments.  Other unknown fields are
/// errors, since they are most likely misspellings.
use anyhow::{bail, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path;

pub const DEFAULT_SIZING_LOG_MARKER: &str = "gc-sizing";
pub const DEFAULT_NO_ACTION_WEIGHT: usize = 10;
pub const DEFAULT_OVERHEAD_THRESHOLD_PCT: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub region_size_mb: Option<u64>,
    pub sizing_log_marker: String,
    pub no_action_weight: usize,
    pub overhead_threshold_pct: f64,
}

impl Default for AnalysisConfig {
    fn default() -> AnalysisConfig {
        AnalysisConfig {
            region_size_mb: None,
            sizing_log_marker: DEFAULT_SIZING_LOG_MARKER.to_string(),
            no_action_weight: DEFAULT_NO_ACTION_WEIGHT,
            overhead_threshold_pct: DEFAULT_OVERHEAD_THRESHOLD_PCT,
        }
    }
}

/// The settings are edited by hand and all fields are optional, so the generic JSON parser is
/// used and the fields are decoded explicitly.

pub fn read_analysis_config(filename: &str) -> Result<AnalysisConfig> {
    let file = File::open(path::Path::new(filename))?;
    let reader = BufReader::new(file);
    let v = serde_json::from_reader(reader)?;
    decode_analysis_config(&v)
}

pub fn decode_analysis_config(v: &Value) -> Result<AnalysisConfig> {
    let Value::Object(fields) = v else {
        bail!("Expected an object value")
    };
    for name in fields.keys() {
        match name.as_str() {
            "region-size-mb" | "sizing-log-marker" | "no-action-weight"
            | "overhead-threshold-pct" => {}
            s if s.starts_with('#') => {}
            s => bail!("Unknown field '{s}'"),
        }
    }
    let mut cfg: AnalysisConfig = Default::default();
    if let Some(n) = grab_u64_opt(fields, "region-size-mb")? {
        if n == 0 {
            bail!("The field 'region-size-mb' must be positive")
        }
        cfg.region_size_mb = Some(n);
    }
    if let Some(s) = grab_string_opt(fields, "sizing-log-marker")? {
        if s.is_empty() {
            bail!("The field 'sizing-log-marker' must not be empty")
        }
        cfg.sizing_log_marker = s;
    }
    if let Some(n) = grab_u64_opt(fields, "no-action-weight")? {
        cfg.no_action_weight = n as usize;
    }
    if let Some(x) = grab_f64_opt(fields, "overhead-threshold-pct")? {
        if x < 0.0 {
            bail!("The field 'overhead-threshold-pct' must not be negative")
        }
        cfg.overhead_threshold_pct = x;
    }
    Ok(cfg)
}

fn grab_string_opt(fields: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match fields.get(name) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => bail!("Field '{name}' must be a string"),
        None => Ok(None),
    }
}

fn grab_u64_opt(fields: &Map<String, Value>, name: &str) -> Result<Option<u64>> {
    match fields.get(name) {
        Some(Value::Number(n)) => {
            if let Some(k) = n.as_u64() {
                Ok(Some(k))
            } else {
                bail!("Field '{name}' must be a non-negative integer")
            }
        }
        Some(_) => bail!("Field '{name}' must be a number"),
        None => Ok(None),
    }
}

fn grab_f64_opt(fields: &Map<String, Value>, name: &str) -> Result<Option<f64>> {
    match fields.get(name) {
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => bail!("Field '{name}' must be a number"),
        None => Ok(None),
    }
}

// Error conditions in the file itself are tested here on in-memory values, the reading of a file
// is tested against the sample configuration.

#[test]
fn test_config_file() {
    let cfg = read_analysis_config("../tests/gclog/analysis-config.json").unwrap();
    assert!(cfg.region_size_mb == Some(4));
    assert!(cfg.sizing_log_marker == "sizing");
    assert!(cfg.no_action_weight == 1);
    assert!(cfg.overhead_threshold_pct == 0.05);
}

#[test]
fn test_config_defaults() {
    let cfg = decode_analysis_config(&serde_json::json!({"#note": "nothing here"})).unwrap();
    assert!(cfg.region_size_mb.is_none());
    assert!(cfg.sizing_log_marker == DEFAULT_SIZING_LOG_MARKER);
    assert!(cfg.no_action_weight == DEFAULT_NO_ACTION_WEIGHT);
    assert!(cfg.overhead_threshold_pct == DEFAULT_OVERHEAD_THRESHOLD_PCT);
}

#[test]
fn test_config_errors() {
    assert!(decode_analysis_config(&serde_json::json!([])).is_err());
    assert!(decode_analysis_config(&serde_json::json!({"region-size": 1})).is_err());
    assert!(decode_analysis_config(&serde_json::json!({"region-size-mb": 0})).is_err());
    assert!(decode_analysis_config(&serde_json::json!({"region-size-mb": "1M"})).is_err());
    assert!(decode_analysis_config(&serde_json::json!({"no-action-weight": -1})).is_err());
    assert!(decode_analysis_config(&serde_json::json!({"sizing-log-marker": ""})).is_err());
    assert!(decode_analysis_config(&serde_json::json!({"overhead-threshold-pct": -0.5})).is_err());
}
