use crate::events::Category;

use std::io;
use thiserror::Error;

/// Batch-level outcomes of parsing.  Lines that match nothing and tokens that don't convert never
/// get this far; they are skipped (and counted) by the parser.

#[derive(Debug, Error)]
pub enum GcLogError {
    #[error("No garbage collector events found, the log format is probably not recognized")]
    NoEvents,

    #[error("No {0} records found in the log")]
    MissingCategory(Category),

    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}
