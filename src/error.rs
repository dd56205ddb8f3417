use thiserror::Error;

/// Errors raised by the engine.
///
/// Every variant except `Io`/`Json` is a caller or configuration mistake:
/// nothing inside the crate retries, and operations validate their inputs
/// before touching any weight.
#[derive(Debug, Error)]
pub enum Error {
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fails with `DimensionMismatch` unless `got == expected`.
pub(crate) fn check_dim(context: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::DimensionMismatch { context, expected, got });
    }
    Ok(())
}
