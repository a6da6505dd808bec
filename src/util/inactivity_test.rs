use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::*;

fn monitor() -> (InactivityMonitor, Arc<AtomicU32>) {
    let logouts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&logouts);
    let monitor = InactivityMonitor::spawn(
        IdleTimeouts::new(Duration::from_secs(25), Duration::from_secs(30)),
        move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );
    (monitor, logouts)
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[test]
fn default_timeouts_are_25_and_30_minutes() {
    let timeouts = IdleTimeouts::default();
    assert_eq!(timeouts.warn_after, Duration::from_secs(1500));
    assert_eq!(timeouts.logout_after, Duration::from_secs(1800));
}

#[tokio::test(start_paused = true)]
async fn idle_session_warns_then_logs_out_once() {
    let (monitor, logouts) = monitor();
    assert_eq!(monitor.status(), IdleStatus::Active);

    advance(26).await;
    assert_eq!(monitor.status(), IdleStatus::Warning);
    assert_eq!(logouts.load(Ordering::SeqCst), 0);

    advance(5).await;
    assert_eq!(monitor.status(), IdleStatus::LoggedOut);
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert!(monitor.is_finished());

    advance(60).await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn activity_restarts_both_timers() {
    let (monitor, logouts) = monitor();

    advance(20).await;
    monitor.touch();
    advance(10).await;
    assert_eq!(monitor.status(), IdleStatus::Active);

    advance(16).await;
    assert_eq!(monitor.status(), IdleStatus::Warning);

    monitor.touch();
    advance(1).await;
    assert_eq!(monitor.status(), IdleStatus::Active);

    advance(28).await;
    assert_eq!(logouts.load(Ordering::SeqCst), 0);
    advance(3).await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_monitor_never_logs_out() {
    let (monitor, logouts) = monitor();
    drop(monitor);

    advance(120).await;
    assert_eq!(logouts.load(Ordering::SeqCst), 0);
}
