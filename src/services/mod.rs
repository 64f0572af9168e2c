//! Service composition.

pub mod container;

pub use container::ServiceContainer;
