#![forbid(unsafe_code)]

//! Error types for container operations.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Index out of range | `get`/`insert`/`remove`/`replace`/`with_mut` past the end | `Err(OutOfRange)`, no mutation, no events |
//! | Unbalanced `end_batch` | No matching `begin_batch` | Silent no-op |
//! | Unknown subscription | `unsubscribe` with a stale or zero id | Returns `false` |
//! | Bad env config | Unparseable `OBSERVABLE_SEQ_*` value | `Err(InvalidConfig)` |

/// Errors from container operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// An index was outside the valid range for the operation.
    ///
    /// `len` is the sequence length observed under the lock when the
    /// operation was rejected.
    OutOfRange { index: usize, len: usize },
    /// A configuration value could not be parsed.
    InvalidConfig(String),
}

impl std::fmt::Display for ContainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for sequence of length {len}")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ContainerError {}

/// Result alias for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_display() {
        let err = ContainerError::OutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "index 7 out of range for sequence of length 3"
        );
    }

    #[test]
    fn invalid_config_display() {
        let err = ContainerError::InvalidConfig("bad dispatch policy".into());
        assert!(err.to_string().contains("bad dispatch policy"));
    }

    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_error(&ContainerError::OutOfRange { index: 0, len: 0 });
    }
}
