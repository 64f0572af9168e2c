//! Calendar boundary.
//!
//! The engine only needs to know which event, if any, covers a given
//! instant; parsing calendar files and keeping the event set current is the
//! collaborator's concern behind [`CalendarProvider`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single calendar event with an absolute interval.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalendarEvent {
    pub id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarEvent {
    /// Whether the event's interval contains the given instant
    /// (`start <= at <= end`, boundaries inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Read-only view over the calendar.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// The unique event whose interval contains `at`, if any.
    async fn current_event(&self, at: DateTime<Utc>) -> Option<CalendarEvent>;

    /// All known events.
    async fn list_events(&self) -> Vec<CalendarEvent>;
}

/// In-memory calendar backed by a replaceable event set.
///
/// The process default: callers (or tests) load events through
/// [`InMemoryCalendar::replace`].
#[derive(Default)]
pub struct InMemoryCalendar {
    events: RwLock<Vec<CalendarEvent>>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }

    /// Replace the whole event set.
    pub fn replace(&self, events: Vec<CalendarEvent>) {
        *self.events.write() = events;
    }
}

#[async_trait]
impl CalendarProvider for InMemoryCalendar {
    async fn current_event(&self, at: DateTime<Utc>) -> Option<CalendarEvent> {
        self.events
            .read()
            .iter()
            .find(|event| event.contains(at))
            .cloned()
    }

    async fn list_events(&self) -> Vec<CalendarEvent> {
        self.events.read().clone()
    }
}
