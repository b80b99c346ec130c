//! Error taxonomy shared by the core components.

use std::path::PathBuf;

use chrono::NaiveDate;
use timefill_ai::SelectionError;

/// Broad category of a [`TimefillError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input or configuration; surfaced immediately, never retried
    Input,
    /// A third-party service failed
    Upstream,
    /// Reported and computed values disagree; logged, never fatal
    DataInconsistency,
    /// Model selection had nothing to choose from
    NoCandidates,
}

/// Errors produced by core operations.
#[derive(Debug, thiserror::Error)]
pub enum TimefillError {
    #[error("unrecognized date phrase '{phrase}': cannot parse '{remainder}'")]
    UnrecognizedPhrase { phrase: String, remainder: String },

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("missing required key {key} in {}", path.display())]
    MissingConfigKey { key: String, path: PathBuf },

    #[error("cannot read configuration {}: {reason}", path.display())]
    UnreadableConfig { path: PathBuf, reason: String },

    #[error("cannot read {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("{operation} failed for {context}")]
    Upstream {
        operation: &'static str,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("entry {entry_id} reports {reported}s but spans {computed}s")]
    DataInconsistency {
        entry_id: String,
        reported: i64,
        computed: i64,
    },

    #[error(transparent)]
    NoCandidates(#[from] SelectionError),
}

impl TimefillError {
    /// Wrap a collaborator failure with the operation and interval it belongs to
    #[must_use]
    pub fn upstream(operation: &'static str, context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Upstream {
            operation,
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnrecognizedPhrase { .. }
            | Self::InvalidRange { .. }
            | Self::MissingConfigKey { .. }
            | Self::UnreadableConfig { .. }
            | Self::UnreadableFile { .. }
            | Self::MissingInput(_) => ErrorKind::Input,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::DataInconsistency { .. } => ErrorKind::DataInconsistency,
            Self::NoCandidates(_) => ErrorKind::NoCandidates,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, TimefillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = TimefillError::MissingConfigKey {
            key: "GEMINI_API_KEY".to_string(),
            path: PathBuf::from("_API_KEYS"),
        };
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(err.to_string(), "missing required key GEMINI_API_KEY in _API_KEYS");

        let err = TimefillError::from(SelectionError::NoCandidates);
        assert_eq!(err.kind(), ErrorKind::NoCandidates);
    }

    #[test]
    fn test_upstream_keeps_source_chain() {
        let cause = anyhow::anyhow!("HTTP 400").context("Clockify reports API error");
        let err = TimefillError::upstream("detailed report", "2025-02-01..2025-02-28", cause);

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(
            err.to_string(),
            "detailed report failed for 2025-02-01..2025-02-28"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Clockify reports API error"));
    }
}
