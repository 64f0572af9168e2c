//! Database models.

pub mod action;

pub use action::{ActionDraft, ActionPatch, ActionType, ActionUpdate, ScheduledAction};
