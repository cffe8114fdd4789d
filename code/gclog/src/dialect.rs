/// Log dialects and collector families.
///
/// A unified JVM log line starts with a list of bracketed decorations.  Two layouts are in use:
///
///   [0.123s][info][gc] GC(0) Pause Young ...
///   [2025-07-01T12:34:56.789+0000][12345][12367][info][gc] GC(0) Pause Young ...
///
/// The first carries the uptime, the second the wall clock followed by process and thread id.  A
/// buffer is scanned once for the second layout; if it appears anywhere, the whole buffer is taken
/// to be in that layout.  (Logs don't mix layouts, and the catenation of files of different layouts
/// isn't supported.)
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    TraditionalElapsedSeconds,
    StructuredTimestampPidTid,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectorFamily {
    Unknown,
    /// G1
    RegionBased,
    /// ZGC
    ConcurrentLowPause,
}

static ELAPSED_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+\.\d+)s\]").unwrap());

static STRUCTURED_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([0-9T:\-\.+Z]+)\]\[(\d+)\]\[(\d+)\]\[([^\]]+)\]\[gc[^\]]*\]").unwrap()
});

static REGION_BASED_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"Using G1").unwrap(),
        Regex::new(r"garbage-first heap").unwrap(),
    ]
});

static LOW_PAUSE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"Using The Z Garbage Collector").unwrap(),
        Regex::new(r"Initializing The Z Garbage Collector").unwrap(),
    ]
});

/// Scan the buffer for the structured decoration layout.

pub fn detect_dialect(text: &str) -> Dialect {
    if text.lines().any(|l| STRUCTURED_PREFIX.is_match(l)) {
        Dialect::StructuredTimestampPidTid
    } else {
        Dialect::TraditionalElapsedSeconds
    }
}

impl Dialect {
    /// The raw timestamp token of a line, if the line carries the decorations of this dialect.
    pub fn timestamp_token<'a>(&self, line: &'a str) -> Option<&'a str> {
        let re = match self {
            Dialect::TraditionalElapsedSeconds => &*ELAPSED_PREFIX,
            Dialect::StructuredTimestampPidTid => &*STRUCTURED_PREFIX,
        };
        re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
    }

    pub fn has_pid_tid(&self) -> bool {
        *self == Dialect::StructuredTimestampPidTid
    }
}

/// The collector family named by a line, if it is one of the initialization lines that name it.
/// These lines produce no event.

pub fn collector_marker(line: &str) -> Option<CollectorFamily> {
    if REGION_BASED_MARKERS.iter().any(|re| re.is_match(line)) {
        Some(CollectorFamily::RegionBased)
    } else if LOW_PAUSE_MARKERS.iter().any(|re| re.is_match(line)) {
        Some(CollectorFamily::ConcurrentLowPause)
    } else {
        None
    }
}

#[test]
fn test_detect_dialect() {
    let traditional = "[0.005s][info][gc,init] Version: 17.0.8+7-LTS (release)\n\
                       [0.123s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 24M->4M(256M) 3.456ms\n";
    assert!(detect_dialect(traditional) == Dialect::TraditionalElapsedSeconds);

    let structured = "some preamble\n\
                      [2025-07-01T12:34:56.789+0000][4242][4243][info][gc,init] Version: 21.0.2+13-LTS\n";
    assert!(detect_dialect(structured) == Dialect::StructuredTimestampPidTid);

    let padded = "[2025-07-01T12:34:56.789Z][4242][4243][info][gc          ] GC(1) Pause Remark 30M->30M(256M) 1.200ms";
    assert!(detect_dialect(padded) == Dialect::StructuredTimestampPidTid);
}

#[test]
fn test_timestamp_token() {
    let d = Dialect::TraditionalElapsedSeconds;
    assert!(d.timestamp_token("[12.500s][info][gc] GC(3) Eden regions: 5->0(6)") == Some("12.500"));
    assert!(d.timestamp_token("GC(3) Eden regions: 5->0(6)").is_none());

    let d = Dialect::StructuredTimestampPidTid;
    assert!(
        d.timestamp_token("[2025-07-01T12:34:56.789+0000][4242][4243][info][gc,heap] GC(3) Eden regions: 5->0(6)")
            == Some("2025-07-01T12:34:56.789+0000")
    );
    assert!(d.timestamp_token("[12.500s][info][gc] GC(3) Eden regions: 5->0(6)").is_none());
}

#[test]
fn test_collector_marker() {
    assert!(collector_marker("[0.006s][info][gc] Using G1") == Some(CollectorFamily::RegionBased));
    assert!(
        collector_marker(" garbage-first heap   total 262144K, used 4096K")
            == Some(CollectorFamily::RegionBased)
    );
    assert!(
        collector_marker("[0.010s][info][gc,init] Initializing The Z Garbage Collector")
            == Some(CollectorFamily::ConcurrentLowPause)
    );
    assert!(collector_marker("[0.010s][info][gc,init] Heap Region Size: 1M").is_none());
}
