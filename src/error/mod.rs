use serde::{Deserialize, Serialize};
use std::fmt;
use reqwest::StatusCode;
use thiserror::Error;

mod utils;
pub use utils::*;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Overflow error: {0}")]
    Overflow(String),

    #[error("Chain error at {step}: {message}")]
    Chain {
        step: String,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),

    #[error("Division by zero: {0}")]
    DivideByZero(String),

    #[error("Timeout at {step} after {elapsed_ms}ms")]
    Timeout {
        step: String,
        elapsed_ms: u64,
    },

    #[error("Wizard error: {kind} - {message}")]
    Wizard {
        kind: WizardErrorKind,
        message: String,
    },

    #[error("Duplicate request: {0}")]
    DuplicateRequest(String),

    #[error("Solana RPC error: {0}")]
    SolanaRpc(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {status} - {message}")]
    HttpError {
        status: StatusCode,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classification of a failed deployment, carried inside results and API bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    Overflow,
    Chain,
    Storage,
    UnsupportedExchange,
    DivideByZero,
    Timeout,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardErrorKind {
    UnmetPrecondition,
    InvalidInput,
    Busy,
    InvalidTransition,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "ValidationError"),
            Self::Overflow => write!(f, "OverflowError"),
            Self::Chain => write!(f, "ChainError"),
            Self::Storage => write!(f, "StorageError"),
            Self::UnsupportedExchange => write!(f, "UnsupportedExchangeError"),
            Self::DivideByZero => write!(f, "DivideByZeroError"),
            Self::Timeout => write!(f, "TimeoutError"),
            Self::Internal => write!(f, "InternalError"),
        }
    }
}

impl fmt::Display for WizardErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmetPrecondition => write!(f, "Unmet precondition"),
            Self::InvalidInput => write!(f, "Invalid input"),
            Self::Busy => write!(f, "Deployment in progress"),
            Self::InvalidTransition => write!(f, "Invalid transition"),
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;

impl LaunchError {
    pub fn validation(message: impl Into<String>) -> Self {
        LaunchError::Validation(message.into())
    }

    pub fn chain(step: impl Into<String>, message: impl Into<String>) -> Self {
        LaunchError::Chain {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn wizard(kind: WizardErrorKind, message: impl Into<String>) -> Self {
        LaunchError::Wizard {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LaunchError::Validation(_) | LaunchError::Wizard { .. } => ErrorKind::Validation,
            LaunchError::Overflow(_) => ErrorKind::Overflow,
            LaunchError::Chain { .. }
            | LaunchError::SolanaRpc(_)
            | LaunchError::NetworkError(_)
            | LaunchError::HttpError { .. } => ErrorKind::Chain,
            LaunchError::Storage(_) => ErrorKind::Storage,
            LaunchError::UnsupportedExchange(_) => ErrorKind::UnsupportedExchange,
            LaunchError::DivideByZero(_) => ErrorKind::DivideByZero,
            LaunchError::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Internal,
        }
    }

    /// Step name for errors that are attributable to one deployment step.
    pub fn step(&self) -> Option<&str> {
        match self {
            LaunchError::Chain { step, .. } | LaunchError::Timeout { step, .. } => Some(step),
            _ => None,
        }
    }

    /// True for input problems the user fixes and resubmits; nothing was sent to the ledger.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::Overflow
                | ErrorKind::UnsupportedExchange
                | ErrorKind::DivideByZero
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LaunchError::NetworkError(_) | LaunchError::Timeout { .. }
        ) || matches!(self, LaunchError::HttpError { status, .. } if status.is_server_error())
    }
}

impl From<reqwest::Error> for LaunchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            LaunchError::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            LaunchError::NetworkError(err.to_string())
        }
    }
}

impl From<solana_rpc_client_api::client_error::Error> for LaunchError {
    fn from(err: solana_rpc_client_api::client_error::Error) -> Self {
        LaunchError::SolanaRpc(err.to_string())
    }
}
