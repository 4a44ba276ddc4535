// Error taxonomy for ingestion, storage and configuration
use thiserror::Error;

/// Why a line was rejected. Recoverable: the line is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line is empty")]
    Empty,
    #[error("missing '/' between group and signal")]
    MissingGroupSeparator,
    #[error("group name is empty")]
    EmptyGroup,
    #[error("group name contains '[' or ']'")]
    InvalidGroupCharacter,
    #[error("signal name is empty")]
    EmptySignal,
    #[error("signal name contains '/' or ']'")]
    InvalidSignalCharacter,
    #[error("missing '[unit]' after signal")]
    MissingUnit,
    #[error("unit is empty")]
    EmptyUnit,
    #[error("missing ':' after unit")]
    MissingValueSeparator,
    #[error("value {0:?} is not a decimal number")]
    InvalidValue(String),
    #[error("value {0:?} is not finite")]
    NonFiniteValue(String),
}

/// Bytes from the source that are not valid UTF-8. Recoverable: the line is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid UTF-8 at byte {valid_up_to} of a {len}-byte line")]
pub struct DecodeError {
    pub valid_up_to: usize,
    pub len: usize,
}

/// Transport failure. Fatal to the ingestion loop only.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open source {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read from source: {0}")]
    Io(#[from] std::io::Error),
}

/// A sample the store refuses. Nothing is written when this is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("timestamp {0} is not finite")]
    NonFiniteTimestamp(f64),
    #[error("value {0} is not finite")]
    NonFiniteValue(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
}
