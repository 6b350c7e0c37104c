use std::error::Error;
use std::fmt;

/// Errors produced while building or running a re-solve.
///
/// The four variants mirror the shape of failure a caller of this engine
/// actually needs to distinguish: a bad argument it passed in, a tensor
/// invariant that the engine itself violated, a failure surfaced by the
/// external value oracle, and a non-fatal numerical anomaly worth logging
/// but not aborting on.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// A caller-supplied argument was out of range or internally inconsistent,
    /// e.g. a range that doesn't sum to a positive mass, or a board with the
    /// wrong number of cards for its street.
    InvalidInput(String),
    /// An internal tensor-shape or data invariant was violated. Seeing this
    /// means the lookahead was built incorrectly, not that the caller passed
    /// bad input.
    InvariantViolation(String),
    /// The external next-street value oracle failed or returned a
    /// malformed value.
    OracleFailure(String),
    /// A non-fatal numerical anomaly (e.g. a near-zero range mass during
    /// normalization) that the caller may want to know about.
    NumericWarning(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            ResolveError::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            ResolveError::OracleFailure(msg) => write!(f, "oracle failure: {msg}"),
            ResolveError::NumericWarning(msg) => write!(f, "numeric warning: {msg}"),
        }
    }
}

impl Error for ResolveError {}

pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_variants() {
        assert_eq!(
            ResolveError::InvalidInput("bad range".into()).to_string(),
            "invalid input: bad range"
        );
        assert_eq!(
            ResolveError::InvariantViolation("bad shape".into()).to_string(),
            "invariant violation: bad shape"
        );
    }
}
