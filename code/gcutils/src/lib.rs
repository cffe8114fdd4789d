// Misc utilities useful to both gclog and gcalyze.

mod configs;
mod dates;

// Analysis settings, and the reader for the settings file.

pub use configs::AnalysisConfig;
pub use configs::read_analysis_config;
pub use configs::decode_analysis_config;
pub use configs::DEFAULT_NO_ACTION_WEIGHT;
pub use configs::DEFAULT_OVERHEAD_THRESHOLD_PCT;
pub use configs::DEFAULT_SIZING_LOG_MARKER;

// Convert a timestamp token (uptime or wall clock) to seconds.  Never fails: an unparseable token
// yields TIMESTAMP_SENTINEL.

pub use dates::parse_timestamp;
pub use dates::parse_uptime;
pub use dates::parse_wallclock;
pub use dates::TIMESTAMP_SENTINEL;
