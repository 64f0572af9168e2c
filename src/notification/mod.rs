//! Execution event fan-out.

pub mod events;

pub use events::{ExecutionEvent, ExecutionEventBroadcaster};
