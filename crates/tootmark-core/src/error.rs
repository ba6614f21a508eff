use thiserror::Error;

/// Failure reported by one of the pluggable collaborators (sanitizer or
/// BBCode engine). The formatter itself never surfaces these; it logs them
/// and falls back to the output of the previous stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("sanitizer failed: {0}")]
    Sanitize(String),
    #[error("invalid parameter {param:?} for [{tag}]")]
    InvalidParam { tag: String, param: String },
    #[error("[/{tag}] closes across an open [{open}]")]
    UnbalancedTag { tag: String, open: String },
}
