//! Error kinds raised by the interception and tracing layers
//!
//! These are programmer errors: they surface synchronously at the call that
//! detects them (registration, composition or first logger use) and are never
//! retried. Errors raised by a wrapped business method are *not* represented
//! here; they travel through wrappers as the original `anyhow::Error`.

use thiserror::Error;

/// Errors raised by weavelog itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid selector kind: {0} (expected null, bool, string, list of strings or /pattern/)")]
    InvalidSelectorKind(String),

    #[error("invalid selector pattern /{pattern}/: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("around(): target is not a method")]
    MissingTarget,

    #[error("around(): scope is not defined")]
    MissingScope,

    #[error("around(): invalid hook type for `{0}`")]
    InvalidHookType(String),

    #[error("logger not initialized: call Logger::init() first")]
    LoggerNotInitialized,

    #[error("{class}.{method} is not a method")]
    NoSuchMethod { class: String, method: String },

    #[error("class `{0}` is not defined")]
    UnknownClass(String),

    #[error("application body has no string `name` field")]
    MissingApplicationName,
}

/// Result type for weavelog operations
pub type Result<T> = std::result::Result<T, Error>;
