use std::path::PathBuf;

/// Failures the pipeline can surface to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The exchange symbol directory could not be read.
    DirectoryUnavailable(String),
    /// A page request for one symbol failed (transport, status or payload).
    FetchFailed { symbol: String, reason: String },
    /// A raw kline row did not have the expected shape.
    SchemaMismatch(String),
    /// The warehouse rejected a table load.
    UploadFailed { table: String, reason: String },
    /// A tabular input was missing or malformed.
    InputLoadFailed { path: PathBuf, reason: String },
    /// The local kline checkpoint could not be written.
    CheckpointFailed { path: PathBuf, reason: String },
    InvalidConfig(String),
}

impl PipelineError {
    pub fn fetch_failed(symbol: &str, reason: impl Into<String>) -> Self {
        PipelineError::FetchFailed {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn upload_failed(table: &str, reason: impl Into<String>) -> Self {
        PipelineError::UploadFailed {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    pub fn input_load_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::InputLoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether skip mode may drop the affected symbol and carry on.
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            PipelineError::FetchFailed { .. } | PipelineError::SchemaMismatch(_)
        )
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::DirectoryUnavailable(msg) => {
                write!(f, "symbol directory unavailable: {msg}")
            }
            PipelineError::FetchFailed { symbol, reason } => {
                write!(f, "fetch failed for {symbol}: {reason}")
            }
            PipelineError::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
            PipelineError::UploadFailed { table, reason } => {
                write!(f, "upload of table {table} failed: {reason}")
            }
            PipelineError::InputLoadFailed { path, reason } => {
                write!(f, "failed to load input {}: {reason}", path.display())
            }
            PipelineError::CheckpointFailed { path, reason } => {
                write!(f, "failed to write checkpoint {}: {reason}", path.display())
            }
            PipelineError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn display_names_the_offending_symbol() {
        let err = PipelineError::fetch_failed("BTCUSDT", "status 500");
        assert_eq!(err.to_string(), "fetch failed for BTCUSDT: status 500");
        assert!(err.is_symbol_scoped());
    }

    #[test]
    fn upload_failures_are_not_symbol_scoped() {
        let err = PipelineError::upload_failed("users", "connection refused");
        assert!(!err.is_symbol_scoped());
        assert!(err.to_string().contains("users"));
    }
}
