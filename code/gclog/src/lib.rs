/// A JVM garbage collector log is a semi-structured log: each line carries a list of bracketed
/// decorations (the time, possibly the process and thread, the level and the tags) followed by a
/// free-text message.  Only a small fraction of the messages are of interest, and those come in a
/// number of loosely specified shapes that have changed between collector versions.
///
/// Two collector families are understood:
///
/// - the region-based collector (G1), logging heap pauses with occupancy before and after, CPU time
///   per collection, region counts by region type, and optionally the detailed decisions of its
///   time-based heap sizing policy
///
/// - the concurrent low-pause collector (ZGC), in both its generational and its legacy layout,
///   logging pauses, concurrent phases, page relocation tables and collection causes
///
/// This library has as its fundamental task to turn a complete log buffer into typed record streams
/// and metadata about the log.  The task breaks down into:
///
/// - Detect the decoration dialect of the buffer (dialect.rs) and convert timestamp tokens to
///   seconds (gcutils).
///
/// - Classify each line against a table of line grammars (grammar.rs) and extract a record from the
///   captures (extract.rs).
///
/// - Reconstruct heap sizing evaluations, which are logged as sequences of lines, into summary
///   records (sizing.rs).
///
/// - Rebase the timestamps of each stream so that it starts at zero (normalize.rs).
///
/// - Compute derived quantities (metrics.rs) and export the whole as JSON (export.rs).
///
/// There is an important invariant on the produced streams:
///
/// - records appear in log order, and a record is never modified after it has been produced
mod dialect;
mod error;
mod events;
mod export;
mod extract;
mod grammar;
mod logfile;
mod metrics;
mod normalize;
mod sizing;

// The decoration layout of a log, and the collector that wrote it.

pub use dialect::CollectorFamily;
pub use dialect::Dialect;

// Scan a buffer for the decoration layout.

pub use dialect::detect_dialect;

// Typed failure outcomes of parsing.

pub use error::GcLogError;

// The record types.  Every record is a LogEvent: a timestamp and one of the event kinds.

pub use events::Category;
pub use events::CollectionCauseEvent;
pub use events::ConcurrentPhaseEvent;
pub use events::EventKind;
pub use events::Generation;
pub use events::HeapPauseEvent;
pub use events::LogEvent;
pub use events::PageSizingEvent;
pub use events::PauseEvent;
pub use events::RegionTransitionEvent;
pub use events::RegionType;
pub use events::ScalingEvent;
pub use events::SizingActivityEvent;
pub use events::SizingType;
pub use events::ALL_CATEGORIES;
pub use events::ALL_REGION_TYPES;

// Assemble the grouping name of a region-based pause.

pub use extract::compose_pause_name;

// Classify one line.  Mostly useful for testing grammars against new log output.

pub use grammar::classify;
pub use grammar::Classified;
pub use grammar::Grammar;

// The result of running a grammar's extractor.

pub use extract::Extracted;

// Parse a complete log buffer into record streams and metadata.

pub use logfile::parse_log;
pub use logfile::FormatInfo;
pub use logfile::ParseStats;
pub use logfile::ParsedLog;

// Order log files so that supplementary sizing logs come last, and read and catenate them.

pub use logfile::order_logfiles;
pub use logfile::read_logfiles;

// Derived quantities.

pub use metrics::cumulative_reclaimed;
pub use metrics::format_overhead;
pub use metrics::pause_summary;
pub use metrics::region_rates;
pub use metrics::sizing_summary;
pub use metrics::uncommit_efficiency;
pub use metrics::PauseSummaryRow;
pub use metrics::ReclaimedPoint;
pub use metrics::RegionRate;
pub use metrics::SizingSummary;

// Subtract the earliest timestamp of a batch from all records in it.

pub use normalize::rebase;

// The heap sizing sequence reconstructor, for callers that classify lines themselves.

pub use sizing::SequenceReconstructor;
pub use sizing::SizingLine;

// The JSON document for a parsed log.

pub use export::export_json;
pub use export::export_value;

#[cfg(test)]
mod test_logs;
