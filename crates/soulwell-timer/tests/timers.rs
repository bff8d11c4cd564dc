//! Integration tests for room-owned timers.
//!
//! All async tests run on a paused clock: `advance` moves time forward
//! and any sleep that is due resolves immediately.

use std::time::Duration;

use soulwell_timer::Timers;
use tokio::sync::mpsc;
use tokio::time::advance;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Grace(u64),
    Turn,
}

#[derive(Debug, PartialEq, Eq)]
struct Fired(Key, u64);

/// Lets spawned timer tasks run after the clock moved.
async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

fn schedule(timers: &mut Timers<Key>, key: Key, secs: u64, tx: &mpsc::Sender<Fired>) -> u64 {
    let k = key.clone();
    timers.schedule(key, Duration::from_secs(secs), tx.clone(), move |g| Fired(k, g))
}

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_fires_after_delay() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut timers = Timers::new();
    let g = schedule(&mut timers, Key::Turn, 30, &tx);

    advance(Duration::from_secs(29)).await;
    settle().await;
    assert!(rx.try_recv().is_err(), "not due yet");

    advance(Duration::from_secs(1)).await;
    let fired = rx.recv().await.unwrap();
    assert_eq!(fired, Fired(Key::Turn, g));
    assert!(timers.claim(&Key::Turn, g));
    assert!(!timers.is_pending(&Key::Turn));
}

#[tokio::test(start_paused = true)]
async fn test_independent_keys_fire_independently() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut timers = Timers::new();
    let g1 = schedule(&mut timers, Key::Grace(1), 10, &tx);
    let g2 = schedule(&mut timers, Key::Grace(2), 20, &tx);
    assert_eq!(timers.len(), 2);

    advance(Duration::from_secs(10)).await;
    assert_eq!(rx.recv().await.unwrap(), Fired(Key::Grace(1), g1));
    advance(Duration::from_secs(10)).await;
    assert_eq!(rx.recv().await.unwrap(), Fired(Key::Grace(2), g2));
}

// =========================================================================
// Cancellation and staleness
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut timers = Timers::new();
    schedule(&mut timers, Key::Grace(1), 5, &tx);
    assert!(timers.cancel(&Key::Grace(1)));
    assert!(!timers.cancel(&Key::Grace(1)));

    advance(Duration::from_secs(60)).await;
    settle().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_rescheduling_replaces_and_bumps_generation() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut timers = Timers::new();
    let first = schedule(&mut timers, Key::Turn, 5, &tx);
    let second = schedule(&mut timers, Key::Turn, 10, &tx);
    assert!(second > first);
    assert!(!timers.is_current(&Key::Turn, first));
    assert_eq!(timers.len(), 1);

    advance(Duration::from_secs(10)).await;
    assert_eq!(rx.recv().await.unwrap(), Fired(Key::Turn, second));
    settle().await;
    assert!(rx.try_recv().is_err(), "replaced timer was aborted");
}

#[tokio::test(start_paused = true)]
async fn test_claim_rejects_stale_generation() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut timers = Timers::new();
    let g = schedule(&mut timers, Key::Turn, 1, &tx);

    advance(Duration::from_secs(1)).await;
    let Fired(key, fired) = rx.recv().await.unwrap();
    // the room restarted the timer before it processed the firing
    schedule(&mut timers, Key::Turn, 1, &tx);

    assert_eq!(fired, g);
    assert!(!timers.claim(&key, fired));
    assert!(timers.is_pending(&Key::Turn));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_where_filters_by_key() {
    let (tx, _rx) = mpsc::channel(8);
    let mut timers = Timers::new();
    schedule(&mut timers, Key::Grace(1), 5, &tx);
    schedule(&mut timers, Key::Grace(2), 5, &tx);
    schedule(&mut timers, Key::Turn, 5, &tx);

    timers.cancel_where(|k| matches!(k, Key::Grace(_)));
    assert_eq!(timers.len(), 1);
    assert!(timers.is_pending(&Key::Turn));
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_pending_timers() {
    let (tx, mut rx) = mpsc::channel(8);
    {
        let mut timers = Timers::new();
        schedule(&mut timers, Key::Turn, 1, &tx);
    }
    advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_spawn_posts_task_output() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut timers: Timers<Key> = Timers::new();
    let g = timers.spawn(Key::Turn, tx, |g| async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        g * 10
    });

    advance(Duration::from_millis(300)).await;
    assert_eq!(rx.recv().await.unwrap(), g * 10);
}
