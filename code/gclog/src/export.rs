/// The JSON document for a parsed log:
///
///   { "format_info": { ... },
///     "heap_pauses": [ { "timestamp": ..., <fields> }, ... ],
///     "scaling": [ ... ], ... }
///
/// with one array per record kind, always present, possibly empty.  Field names are those of the
/// record structs.  Non-finite numbers (a scaling factor with zero real time) come out as null.
use crate::logfile::ParsedLog;

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct Stamped<'a, T: Serialize> {
    timestamp: f64,
    #[serde(flatten)]
    record: &'a T,
}

fn stamped<'a, T: Serialize + 'a>(xs: impl Iterator<Item = (f64, &'a T)>) -> Vec<Stamped<'a, T>> {
    xs.map(|(timestamp, record)| Stamped { timestamp, record })
        .collect()
}

pub fn export_value(log: &ParsedLog) -> Result<Value, serde_json::Error> {
    let mut doc = serde_json::Map::new();
    doc.insert(
        "format_info".to_string(),
        serde_json::to_value(&log.format_info)?,
    );
    doc.insert("heap_pauses".to_string(), serde_json::to_value(stamped(log.heap_pauses()))?);
    doc.insert("scaling".to_string(), serde_json::to_value(stamped(log.scaling_events()))?);
    doc.insert(
        "region_transitions".to_string(),
        serde_json::to_value(stamped(log.region_transitions()))?,
    );
    doc.insert(
        "sizing_activity".to_string(),
        serde_json::to_value(stamped(log.sizing_activity()))?,
    );
    doc.insert("pauses".to_string(), serde_json::to_value(stamped(log.pauses()))?);
    doc.insert(
        "concurrent_phases".to_string(),
        serde_json::to_value(stamped(log.concurrent_phases()))?,
    );
    doc.insert("page_sizing".to_string(), serde_json::to_value(stamped(log.page_sizing()))?);
    doc.insert(
        "collection_causes".to_string(),
        serde_json::to_value(stamped(log.collection_causes()))?,
    );
    Ok(Value::Object(doc))
}

pub fn export_json(log: &ParsedLog) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&export_value(log)?)
}

#[test]
fn test_export() {
    let text = "\
[0.004s][info][gc,init] Heap Region Size: 1M
[1.000s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.000ms
[1.000s][info][gc,cpu] GC(0) User=0.01s Sys=0.00s Real=0.00s
";
    let log = crate::logfile::parse_log(text, None).unwrap();
    let v = export_value(&log).unwrap();
    assert!(v["format_info"]["region_size_mb"] == 1);
    assert!(v["format_info"]["dialect"] == "traditional-elapsed-seconds");
    assert!(v["format_info"]["collector_family"] == "region-based");
    let p = &v["heap_pauses"][0];
    assert!(p["timestamp"] == 0.0);
    assert!(p["pause_name"] == "Young G1 Evacuation Pause");
    assert!(p["total_heap_before_mb"] == 0);
    assert!(v["scaling"][0]["scaling_factor"].is_null());
    assert!(v["pauses"].as_array().unwrap().is_empty());
    assert!(v["sizing_activity"].as_array().unwrap().is_empty());
}
