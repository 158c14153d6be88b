//! Error types for rhythm configuration and generation.
//!
//! Every failure in this crate is a configuration problem: an unsupported
//! metre, tables that do not fit the tree, or a tree that cannot be walked to
//! the end of the bar. None of them are retried.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported time signature: {0}")]
    UnsupportedTimeSignature(String),

    #[error("unknown duration label: {0}")]
    UnknownDurationLabel(String),

    #[error("{label} ({duration} quarter notes) does not align to a subdivision of {time_signature}")]
    MisalignedTactus {
        label: String,
        duration: f64,
        time_signature: String,
    },

    #[error("requested duration level {requested}, but the metre only reaches level {available}")]
    TreeTooDeep { requested: usize, available: usize },

    #[error("cannot insert a {divisions}-tuplet at level {level}: lowest level is {lowest_level}")]
    InsufficientDepth {
        divisions: u32,
        level: usize,
        lowest_level: usize,
    },

    #[error("invalid table `{table}`: {reason}")]
    InvalidTable { table: &'static str, reason: String },

    #[error("score vector has no positive mass")]
    DegenerateScores,

    #[error("no duration candidates left at {accumulated} of {target} quarter notes")]
    ExhaustedTree { accumulated: f64, target: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub(crate) fn table(table: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            table,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = ConfigError::InsufficientDepth {
            divisions: 5,
            level: 3,
            lowest_level: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("5-tuplet"));
        assert!(msg.contains("level 3"));
    }

    #[test]
    fn table_helper_builds_invalid_table() {
        let err = ConfigError::table("probability_dot", "too short");
        assert!(matches!(
            err,
            ConfigError::InvalidTable {
                table: "probability_dot",
                ..
            }
        ));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConfigError = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
