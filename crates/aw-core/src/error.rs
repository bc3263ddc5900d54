use derive_more::From;
use orion_error::prelude::*;
use orion_error::{ErrorCode, StructError, UvsReason};

// ---------------------------------------------------------------------------
// Engine-boundary errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CoreReason {
    #[error("security violation")]
    Security,
    #[error("evaluation budget exceeded")]
    Budget,
    #[error("evaluation error")]
    Eval,
    #[error("policy error")]
    Policy,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Security => 1001,
            Self::Budget => 1002,
            Self::Eval => 1003,
            Self::Policy => 1004,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Evaluation errors
// ---------------------------------------------------------------------------

/// Coarse class of an [`EvalError`]. Security and budget errors are
/// terminal and must propagate; plain evaluation errors indicate a
/// malformed policy and fail closed on the access-check path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Security,
    Budget,
    Eval,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("denylisted segment `{segment}` in path `{path}`")]
    DenylistedSegment { path: String, segment: String },

    #[error("operation `{name}` is not in the sandbox allow-list")]
    OperationNotAllowed { name: String },

    #[error("expression depth exceeds the maximum of {max}")]
    RecursionExceeded { max: usize },

    #[error("operation budget exhausted after {max} visited nodes")]
    OperationBudget { max: u64 },

    #[error("evaluation timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    Timeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("unknown permission check `{0}`")]
    UnknownCheck(String),

    #[error("operation `{name}` is already registered; custom operations may not replace it")]
    DuplicateOperation { name: String },

    #[error("wildcard in `{path}` reached a {found}, not an array")]
    WildcardOnNonArray { path: String, found: &'static str },

    #[error("operation `{name}`: {message}")]
    Operation { name: String, message: String },
}

impl EvalError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EvalError::DenylistedSegment { .. } | EvalError::OperationNotAllowed { .. } => {
                ErrorClass::Security
            }
            EvalError::RecursionExceeded { .. }
            | EvalError::OperationBudget { .. }
            | EvalError::Timeout { .. } => ErrorClass::Budget,
            EvalError::UnknownOperation(_)
            | EvalError::UnknownCheck(_)
            | EvalError::DuplicateOperation { .. }
            | EvalError::WildcardOnNonArray { .. }
            | EvalError::Operation { .. } => ErrorClass::Eval,
        }
    }

    /// Terminal errors must propagate; silently defaulting one would turn a
    /// detected attack or bug into an authorization bypass.
    pub fn is_terminal(&self) -> bool {
        self.class() != ErrorClass::Eval
    }

    /// Shorthand for operation-level type and arity failures.
    pub fn operation(name: &str, message: impl Into<String>) -> Self {
        EvalError::Operation {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

impl From<EvalError> for CoreError {
    fn from(e: EvalError) -> Self {
        let reason = match e.class() {
            ErrorClass::Security => CoreReason::Security,
            ErrorClass::Budget => CoreReason::Budget,
            ErrorClass::Eval => CoreReason::Eval,
        };
        StructError::from(reason).with_detail(e.to_string())
    }
}
