//! Error types for preprocessing runs
//!
//!     Every failure in this crate is fatal for the run that raised it: a guarded
//!     source that cannot be parsed cannot be trusted, so errors propagate straight
//!     to the caller. The one exception, removal of a generated side file, is
//!     handled where it happens and never reaches this type.

use std::fmt;

/// Result type for preprocessing operations
pub type CondimentResult<T> = Result<T, CondimentError>;

/// Errors raised by a preprocessing run
#[derive(Debug, Clone, PartialEq)]
pub enum CondimentError {
    /// A guard line passed the textual pre-filter but its condition does not parse
    MalformedGuard {
        line: usize,
        condition: String,
        message: String,
    },

    /// A guard condition parsed but could not be evaluated
    GuardEvaluation {
        line: usize,
        condition: String,
        message: String,
    },

    /// `#exclude` without a matching `#endexclude` (strict mode only)
    UnterminatedExclude { line: usize },

    /// No input path was given and the host could not name its caller
    MissingInput,

    /// IO error reading the source or writing the destination
    Io(String),

    /// The host failed to inject flags or run the generated file
    Host(HostError),
}

impl fmt::Display for CondimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CondimentError::MalformedGuard {
                line,
                condition,
                message,
            } => write!(
                f,
                "Malformed guard at line {}: `{}`: {}",
                line, condition, message
            ),
            CondimentError::GuardEvaluation {
                line,
                condition,
                message,
            } => write!(
                f,
                "Cannot evaluate guard at line {}: `{}`: {}",
                line, condition, message
            ),
            CondimentError::UnterminatedExclude { line } => {
                write!(f, "#exclude at line {} has no matching #endexclude", line)
            }
            CondimentError::MissingInput => {
                write!(f, "No input file given and the caller could not be determined")
            }
            CondimentError::Io(msg) => write!(f, "IO error: {}", msg),
            CondimentError::Host(err) => write!(f, "Host error: {}", err),
        }
    }
}

impl std::error::Error for CondimentError {}

impl From<std::io::Error> for CondimentError {
    fn from(err: std::io::Error) -> Self {
        CondimentError::Io(err.to_string())
    }
}

impl From<HostError> for CondimentError {
    fn from(err: HostError) -> Self {
        CondimentError::Host(err)
    }
}

/// Errors raised by a [`Host`](crate::condiment::install::Host) implementation
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The generated file could not be started
    Spawn { command: String, message: String },

    /// The generated file ran but exited unsuccessfully
    ExitStatus { command: String, code: Option<i32> },

    /// Flags could not be bound into the caller
    Inject(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Spawn { command, message } => {
                write!(f, "failed to run `{}`: {}", command, message)
            }
            HostError::ExitStatus { command, code } => match code {
                Some(code) => write!(f, "`{}` exited with status {}", command, code),
                None => write!(f, "`{}` was terminated by a signal", command),
            },
            HostError::Inject(msg) => write!(f, "failed to inject flags: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::Inject(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_guard_names_line_and_condition() {
        let err = CondimentError::MalformedGuard {
            line: 3,
            condition: "WITH_A ==".to_string(),
            message: "unexpected end of condition".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed guard at line 3: `WITH_A ==`: unexpected end of condition"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CondimentError = io.into();
        assert_eq!(err, CondimentError::Io("gone".to_string()));
    }

    #[test]
    fn exit_status_without_code_mentions_signal() {
        let err = HostError::ExitStatus {
            command: "python3 _ft_app.py".to_string(),
            code: None,
        };
        assert!(err.to_string().contains("signal"));
    }
}
