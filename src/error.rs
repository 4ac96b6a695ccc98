//! Error taxonomy for workspace operations.
//!
//! * [`ValidationError`]: rejected locally, the gateway is never called.
//! * [`GatewayError`]: the file-operations collaborator reported a failure.
//! * [`WorkspaceError::Unresolved`]: a path did not match any known entity.
//!
//! Everything is `Clone` so multi-item operations can keep one error per
//! item in their report.

use std::io;

use thiserror::Error;

/// Failure reported by a [`crate::gateway::FileGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Io(String),
}

impl From<io::Error> for GatewayError {
    fn from(err: io::Error) -> Self {
        let message = err.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => GatewayError::NotFound(message),
            io::ErrorKind::AlreadyExists => GatewayError::AlreadyExists(message),
            io::ErrorKind::PermissionDenied => GatewayError::PermissionDenied(message),
            _ => GatewayError::Io(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cannot move {source_path} into itself or one of its descendants")]
    InvalidDropTarget { source_path: String },
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("an item named {0:?} already exists here")]
    NameTaken(String),
    #[error("{0} is outside the workspace")]
    OutsideWorkspace(String),
    #[error("workspace name must not be empty")]
    EmptySnapshotName,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("no such item in the workspace: {0}")]
    Unresolved(String),
    #[error("a workspace load is in progress")]
    Busy,
    #[error("no saved workspace named {0:?}")]
    SnapshotNotFound(String),
    #[error("{0} is not a folder")]
    NotAFolder(String),
}

impl WorkspaceError {
    /// Errors that the UI rejects silently (drag/drop gestures).
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            WorkspaceError::Validation(ValidationError::InvalidDropTarget { .. })
        )
    }
}

pub type Result<T, E = WorkspaceError> = std::result::Result<T, E>;
