use thiserror::Error;

pub type QueryGateResult<T> = Result<T, QueryGateError>;

/// Error taxonomy for the pipeline. A blocked filter verdict is a normal
/// terminal outcome, not an error, and does not appear here.
#[derive(Debug, Error)]
pub enum QueryGateError {
    /// Malformed or missing input, rejected before the pipeline starts.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Authorization-ledger call failure: revert, timeout, transport.
    /// Terminal for `validate`, absorbed for `log_record`.
    #[error("ledger call failed: {0}")]
    Ledger(String),

    /// Response-generation backend failure. Terminal.
    #[error("response generation failed: {0}")]
    Generation(String),

    /// Content-store failure. Always non-fatal at pipeline level.
    #[error("archive store failed: {0}")]
    Archive(String),

    #[error("internal error: {0}")]
    Internal(String),
}
