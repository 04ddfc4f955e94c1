//! Manager error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Module '{name}' not found")]
    ModuleNotFound { name: String },

    #[error("Hook '{name}' not found")]
    HookNotFound { name: String },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("Hook '{hook}' failed with exit code {exit_code}")]
    HookFailed { hook: String, exit_code: i32 },

    #[error("Helm operation failed: {message}")]
    HelmFailed { message: String },

    #[error(transparent)]
    Core(#[from] modpack_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManagerError {
    /// Whether the queue consumer should keep the task at head and retry.
    ///
    /// Unknown names and malformed configs do not heal by themselves; hook,
    /// Helm and IO failures may.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ManagerError::HookFailed { .. } | ManagerError::HelmFailed { .. } | ManagerError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
