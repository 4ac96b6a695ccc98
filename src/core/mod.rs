//! Pure explorer model – paths, entities, ordering, tree construction and
//! selection.
//!
//! Nothing in this module does I/O or depends on any rendering crate.

pub mod entity;
pub mod naming;
pub mod order;
pub mod path;
pub mod selection;
pub mod tree;
