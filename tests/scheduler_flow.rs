//! End-to-end scheduling flows against an in-memory store, a recording
//! media controller, and tokio's paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use playcue::calendar::InMemoryCalendar;
use playcue::database::models::action::parse_time_of_day;
use playcue::database::models::{ActionDraft, ActionType};
use playcue::database::repositories::{ActionRepository, SqlxActionRepository};
use playcue::media::{MediaControlResult, MediaController};
use playcue::notification::{ExecutionEvent, ExecutionEventBroadcaster};
use playcue::scheduler::timing::next_daily_occurrence;
use playcue::scheduler::{ActionExecutor, Scheduler};
use tokio_util::sync::CancellationToken;

/// Counts controller invocations and always succeeds.
#[derive(Default)]
struct CountingController {
    calls: AtomicUsize,
}

#[async_trait]
impl MediaController for CountingController {
    async fn control(&self, _action: ActionType, _target: Option<&str>) -> MediaControlResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        MediaControlResult::ok("ok")
    }
}

struct Harness {
    scheduler: Arc<Scheduler>,
    store: Arc<SqlxActionRepository>,
    media: Arc<CountingController>,
    events: broadcast::Receiver<ExecutionEvent>,
}

async fn harness() -> Harness {
    // Establish the SQLite connection and run migrations with the clock
    // running. Under `start_paused`, tokio auto-advances virtual time past
    // the pool's acquire timeout before the `spawn_blocking` connection task
    // finishes, so eager connection setup must happen while time flows; the
    // clock is re-paused before the scheduler logic under test runs.
    tokio::time::resume();
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    tokio::time::pause();

    let store = Arc::new(SqlxActionRepository::new(
        pool.clone(),
        pool,
        chrono_tz::UTC,
    ));
    let media = Arc::new(CountingController::default());
    let broadcaster = ExecutionEventBroadcaster::new();
    let events = broadcaster.subscribe();
    let executor = Arc::new(ActionExecutor::new(
        store.clone(),
        media.clone(),
        Arc::new(InMemoryCalendar::new()),
        broadcaster,
    ));
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        executor,
        chrono_tz::UTC,
        CancellationToken::new(),
    ));

    Harness {
        scheduler,
        store,
        media,
        events,
    }
}

fn one_time_draft(action_type: ActionType, date: i64) -> ActionDraft {
    ActionDraft {
        event_id: None,
        event_name: Some("evening film".to_string()),
        action_type,
        time: "00:00".to_string(),
        date: Some(date),
        is_daily: false,
        is_active: None,
        timezone: None,
        max_retries: None,
        next_run: None,
    }
}

fn daily_draft(time: &str) -> ActionDraft {
    ActionDraft {
        event_id: None,
        event_name: Some("morning show".to_string()),
        action_type: ActionType::Play,
        time: time.to_string(),
        date: None,
        is_daily: true,
        is_active: None,
        timezone: None,
        max_retries: None,
        next_run: None,
    }
}

/// A daily time string a couple of hours ahead of the wall clock.
fn upcoming_daily_time() -> String {
    (Utc::now() + chrono::Duration::hours(2))
        .format("%H:%M:%S")
        .to_string()
}

/// Wait until the registry has the expected entry count, advancing the
/// paused clock in small steps.
async fn wait_for_entry_count(scheduler: &Arc<Scheduler>, expected: usize) {
    for _ in 0..100 {
        if scheduler.entry_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "registry never reached {} entries (now {})",
        expected,
        scheduler.entry_count()
    );
}

#[tokio::test(start_paused = true)]
async fn one_time_action_fires_once_and_retires() {
    let mut h = harness().await;

    let action = h
        .scheduler
        .schedule(one_time_draft(
            ActionType::Stop,
            Utc::now().timestamp() + 10,
        ))
        .await
        .unwrap();
    assert_eq!(h.scheduler.entry_count(), 1);

    // The paused clock advances straight to the timer deadline.
    let event = h.events.recv().await.unwrap();
    match event {
        ExecutionEvent::Executed { action: fired, result } => {
            assert_eq!(fired.id, action.id);
            assert!(result.success);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(h.media.calls.load(Ordering::SeqCst), 1);

    // The entry retires from the registry; the store record remains with
    // last_run populated.
    wait_for_entry_count(&h.scheduler, 0).await;
    let stored = h.store.get(&action.id).await.unwrap();
    assert!(stored.last_run.is_some());

    // No second firing.
    let extra = tokio::time::timeout(Duration::from_secs(3600), h.events.recv()).await;
    assert!(extra.is_err(), "one-time action fired twice");
}

#[tokio::test(start_paused = true)]
async fn past_one_time_action_never_fires() {
    let mut h = harness().await;

    h.scheduler
        .schedule(one_time_draft(
            ActionType::Play,
            Utc::now().timestamp() - 60,
        ))
        .await
        .unwrap();

    assert_eq!(h.scheduler.entry_count(), 0);

    let fired = tokio::time::timeout(Duration::from_secs(3600), h.events.recv()).await;
    assert!(fired.is_err(), "past action executed retroactively");
    assert_eq!(h.media.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn daily_action_executes_and_rearms() {
    let mut h = harness().await;

    let time = upcoming_daily_time();
    let action = h.scheduler.schedule(daily_draft(&time)).await.unwrap();

    // The cached next_run matches the next-occurrence algorithm.
    let expected = next_daily_occurrence(
        parse_time_of_day(&time).unwrap(),
        chrono_tz::UTC,
        Utc::now(),
    );
    assert_eq!(action.next_run, Some(expected.timestamp()));

    let event = h.events.recv().await.unwrap();
    assert!(matches!(event, ExecutionEvent::Executed { .. }));
    assert_eq!(h.media.calls.load(Ordering::SeqCst), 1);

    // Success updates last_run and pushes next_run a day out.
    let stored = h.store.get(&action.id).await.unwrap();
    let last_run = stored.last_run.expect("last_run recorded");
    assert_eq!(stored.next_run, Some(last_run + 24 * 3600));

    // The daily entry stays armed.
    assert_eq!(h.scheduler.entry_count(), 1);

    // No further firing within the next hour.
    let extra = tokio::time::timeout(Duration::from_secs(3600), h.events.recv()).await;
    assert!(extra.is_err());

    // The fixed 24-hour re-arm produces the next day's execution.
    let event = tokio::time::timeout(Duration::from_secs(25 * 3600), h.events.recv())
        .await
        .expect("daily action did not re-fire")
        .unwrap();
    assert!(matches!(event, ExecutionEvent::Executed { .. }));
    assert_eq!(h.media.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn deleted_actions_never_fire() {
    let mut h = harness().await;

    let one_time = h
        .scheduler
        .schedule(one_time_draft(
            ActionType::Play,
            Utc::now().timestamp() + 3600,
        ))
        .await
        .unwrap();
    let daily = h
        .scheduler
        .schedule(daily_draft(&upcoming_daily_time()))
        .await
        .unwrap();
    assert_eq!(h.scheduler.entry_count(), 2);

    h.scheduler.remove(&one_time.id).await.unwrap();
    h.scheduler.remove(&daily.id).await.unwrap();
    assert_eq!(h.scheduler.entry_count(), 0);

    // Advance well past both would-have-fired instants.
    let fired = tokio::time::timeout(Duration::from_secs(4 * 3600), h.events.recv()).await;
    assert!(fired.is_err(), "deleted action still fired");
    assert_eq!(h.media.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn paused_action_skips_and_resume_rearms() {
    let mut h = harness().await;

    let time = upcoming_daily_time();
    let action = h.scheduler.schedule(daily_draft(&time)).await.unwrap();

    h.scheduler.pause(&action.id).await.unwrap();
    assert_eq!(h.scheduler.entry_count(), 0);

    // Advance past the original fire instant: nothing happens.
    let fired = tokio::time::timeout(Duration::from_secs(3 * 3600), h.events.recv()).await;
    assert!(fired.is_err(), "paused action fired");
    assert_eq!(h.media.calls.load(Ordering::SeqCst), 0);

    // Resume re-arms on the next reconciliation and fires exactly once.
    let resumed = h.scheduler.resume(&action.id).await.unwrap();
    assert!(resumed.is_active);
    assert_eq!(h.scheduler.entry_count(), 1);

    let event = tokio::time::timeout(Duration::from_secs(25 * 3600), h.events.recv())
        .await
        .expect("resumed action did not fire")
        .unwrap();
    assert!(matches!(event, ExecutionEvent::Executed { .. }));
    assert_eq!(h.media.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn reconcile_twice_yields_identical_registry() {
    let h = harness().await;

    h.scheduler
        .schedule(daily_draft(&upcoming_daily_time()))
        .await
        .unwrap();
    h.scheduler
        .schedule(one_time_draft(
            ActionType::Stop,
            Utc::now().timestamp() + 7200,
        ))
        .await
        .unwrap();

    h.scheduler.reconcile().await.unwrap();
    let first: Vec<_> = h
        .scheduler
        .registry_snapshot()
        .into_iter()
        .map(|e| (e.schedule_id, e.kind, e.scheduled_at))
        .collect();

    h.scheduler.reconcile().await.unwrap();
    let second: Vec<_> = h
        .scheduler
        .registry_snapshot()
        .into_iter()
        .map(|e| (e.schedule_id, e.kind, e.scheduled_at))
        .collect();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}
