//! Error type shared by the pipeline, its collaborators and the CLI shell.
//!
//! Every failure the presentation layer may want to explain gets its own
//! variant. Arithmetic gaps in derived columns are *not* errors; they travel as
//! `None` inside `MergedRecord`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The remote indicator source was unreachable or answered with a failure.
    #[error("failed to fetch indicator {indicator}: {message}")]
    UpstreamFetch { indicator: String, message: String },

    /// A source row could not be turned into a well-formed reading.
    #[error("malformed record in {source_name} (line {line}): {message}")]
    MalformedRecord {
        source_name: String,
        line: usize,
        message: String,
    },

    /// Two readings map to the same calendar-matrix cell.
    #[error("duplicate reading for {date} hour {hour:02}")]
    DuplicateKey { date: NaiveDate, hour: u32 },

    /// Two samples of one indicator share the same instant.
    #[error("duplicate sample for {indicator} at {timestamp}")]
    DuplicateTimestamp { indicator: String, timestamp: String },

    /// The sun does not cross the rise/set altitude on this date.
    #[error("no {event} on {date} at this latitude")]
    NoEvent { date: NaiveDate, event: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on '{path}': {message}")]
    Io { path: String, message: String },
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Process exit code used by the `heatmap` binary.
    ///
    /// - 2: bad invocation or configuration
    /// - 3: input data violates a structural invariant
    /// - 4: upstream or ephemeris failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Io { .. } => 2,
            Self::MalformedRecord { .. } | Self::DuplicateKey { .. } | Self::DuplicateTimestamp { .. } => 3,
            Self::UpstreamFetch { .. } | Self::NoEvent { .. } => 4,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
