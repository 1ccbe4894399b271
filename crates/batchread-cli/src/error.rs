//! CLI error type and exit codes.

use std::fmt::{self, Display, Formatter};

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<batchread_core::ReadError> for CliError {
    fn from(err: batchread_core::ReadError) -> Self {
        match err {
            batchread_core::ReadError::InvalidPattern { pattern, source } => {
                Self::validation(format!("invalid pattern '{pattern}': {source}"))
            }
            batchread_core::ReadError::InvalidReadMode { value } => {
                Self::validation(format!("invalid read mode '{value}'"))
            }
            other @ batchread_core::ReadError::ReadStart { .. } => Self::failure(other),
        }
    }
}
