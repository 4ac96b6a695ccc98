//! UI / rendering layer, everything that touches Ratatui widgets.
//!
//! Widgets read the workspace and view state; they never mutate either.

pub mod layout;
pub mod popup;
pub mod theme;
pub mod tree_widget;
