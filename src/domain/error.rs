//! Domain error types.

/// A single trade row that could not be turned into a typed record.
///
/// Never aborts a batch: the engine turns it into a parse-failure finding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("{field} is empty")]
    MissingField { field: &'static str },

    #[error("invalid timestamp in {field}: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("invalid number in {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid flag in {field}: {value:?}")]
    InvalidFlag { field: &'static str, value: String },

    #[error("malformed row: {reason}")]
    Malformed { reason: String },
}

/// Top-level error type for tradeaudit.
#[derive(Debug, thiserror::Error)]
pub enum TradeAuditError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("cannot read {source_name}: {reason}")]
    Source { source_name: String, reason: String },

    #[error("{batch} is missing required column {column}")]
    MissingColumn { batch: String, column: String },

    #[error("{batch} lacks the exit-reason columns ({missing}) required by strict schema policy")]
    IncompleteSchema { batch: String, missing: String },

    #[error("strategy registry: {reason}")]
    Registry { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradeAuditError> for std::process::ExitCode {
    fn from(err: &TradeAuditError) -> Self {
        let code: u8 = match err {
            TradeAuditError::Io(_) => 1,
            TradeAuditError::ConfigParse { .. }
            | TradeAuditError::ConfigMissing { .. }
            | TradeAuditError::ConfigInvalid { .. } => 2,
            TradeAuditError::Source { .. } => 3,
            TradeAuditError::MissingColumn { .. } | TradeAuditError::IncompleteSchema { .. } => 4,
            TradeAuditError::Registry { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
