//! Database repositories.

pub mod action;

pub use action::{ActionRepository, SqlxActionRepository};
