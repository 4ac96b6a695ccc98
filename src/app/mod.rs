//! Terminal front end: view state, input handling and command execution.

pub mod event;
pub mod handler;
pub mod runtime;
pub mod state;
