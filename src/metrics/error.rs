use std::time::Duration;

use thiserror::Error;

/// Why a sampling tick produced no usable snapshot.
///
/// Carried inside the published source state so the UI can distinguish a
/// missing tool from a denied one without string matching.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SampleError {
    #[error("{tool} not found on this system")]
    SourceUnavailable { tool: String },

    #[error("{tool} did not finish within {:.1}s", waited.as_secs_f64())]
    SourceTimeout { tool: String, waited: Duration },

    #[error("{tool} requires elevated privileges")]
    PermissionDenied { tool: String },

    #[error("{tool} exited with status {code:?}: {detail}")]
    CommandFailed {
        tool: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("failed to launch {tool}: {message}")]
    Spawn { tool: String, message: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SampleError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// A structural or semantic defect in otherwise captured tool output.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("no recognizable statistics in source output")]
    MissingStats,

    #[error("required field {0:?} is missing")]
    MissingKey(&'static str),

    #[error("field {key:?} holds unreadable value {value:?}")]
    BadNumber { key: &'static str, value: String },

    #[error("field {key:?} is out of range: {value}")]
    OutOfRange { key: &'static str, value: f64 },

    #[error("allocated memory {allocated} B below in-use memory {in_use} B")]
    AllocBelowInUse { allocated: u64, in_use: u64 },
}
