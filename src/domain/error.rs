//! Domain error types.

/// Top-level error type for autotrader.
#[derive(Debug, thiserror::Error)]
pub enum AutotraderError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("broker error: {reason}")]
    Broker { reason: String },

    #[error("{symbol} does not exist in portfolio")]
    UnknownSymbol { symbol: String },

    #[error("columns not found in stock frame: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("trade not ready: {reason}")]
    TradeNotReady { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AutotraderError {
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        AutotraderError::InvalidOrder {
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        AutotraderError::Data {
            reason: reason.into(),
        }
    }
}

impl AutotraderError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            AutotraderError::Io(_) | AutotraderError::Json(_) => 1,
            AutotraderError::ConfigParse { .. }
            | AutotraderError::ConfigMissing { .. }
            | AutotraderError::ConfigInvalid { .. } => 2,
            AutotraderError::Broker { .. } => 3,
            AutotraderError::InvalidOrder { .. }
            | AutotraderError::TradeNotReady { .. }
            | AutotraderError::UnknownSymbol { .. } => 4,
            AutotraderError::Data { .. }
            | AutotraderError::NoData { .. }
            | AutotraderError::MissingColumns { .. } => 5,
        }
    }
}

impl From<&AutotraderError> for std::process::ExitCode {
    fn from(err: &AutotraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
