//! Markdown workspace explorer.
//!
//! A multi-root file tree whose sibling order is user-defined, with
//! drag/drop moves, rename, delete and create kept consistent across the
//! flat entity store, the order map and the open editor tabs, plus named
//! workspaces that snapshot and replay all of it.
//!
//! The engine ([`workspace::Workspace`]) talks to the disk only through the
//! [`gateway::FileGateway`] trait; the terminal front end in the binary is a
//! read-only subscriber that feeds gestures back into it.

pub mod config;
pub mod core;
pub mod error;
pub mod gateway;
pub mod persist;
pub mod workspace;

pub use error::{GatewayError, ValidationError, WorkspaceError};
pub use gateway::FileGateway;
pub use workspace::Workspace;
