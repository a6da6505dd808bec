//! Idle auto-logout.
//!
//! DESIGN
//! ======
//! A background task watches the last-activity instant published by
//! [`InactivityMonitor::touch`]. After `warn_after` without activity the
//! status moves to [`IdleStatus::Warning`]; after `logout_after` the logout
//! callback runs once and the task ends. Activity before that point resets
//! both deadlines. Dropping the monitor stops the task.

#[cfg(test)]
#[path = "inactivity_test.rs"]
mod inactivity_test;

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

pub const DEFAULT_IDLE_WARN: Duration = Duration::from_secs(25 * 60);
pub const DEFAULT_IDLE_LOGOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimeouts {
    pub warn_after: Duration,
    pub logout_after: Duration,
}

impl IdleTimeouts {
    #[must_use]
    pub const fn new(warn_after: Duration, logout_after: Duration) -> Self {
        Self { warn_after, logout_after }
    }
}

impl Default for IdleTimeouts {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_WARN, DEFAULT_IDLE_LOGOUT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStatus {
    Active,
    /// Logout is imminent unless activity arrives.
    Warning,
    LoggedOut,
}

pub struct InactivityMonitor {
    activity: watch::Sender<Instant>,
    status: watch::Receiver<IdleStatus>,
    task: JoinHandle<()>,
}

impl InactivityMonitor {
    /// Start watching for inactivity from now.
    pub fn spawn<F, Fut>(timeouts: IdleTimeouts, on_logout: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (activity, activity_rx) = watch::channel(Instant::now());
        let (status_tx, status) = watch::channel(IdleStatus::Active);
        let task = tokio::spawn(watch_idle(timeouts, activity_rx, status_tx, on_logout));
        Self { activity, status, task }
    }

    /// Record user activity. No effect once logged out.
    pub fn touch(&self) {
        self.activity.send_replace(Instant::now());
    }

    #[must_use]
    pub fn status(&self) -> IdleStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IdleStatus> {
        self.status.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_idle<F, Fut>(
    timeouts: IdleTimeouts,
    mut activity: watch::Receiver<Instant>,
    status: watch::Sender<IdleStatus>,
    on_logout: F,
) where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let last = *activity.borrow_and_update();
        set_status(&status, IdleStatus::Active);

        tokio::select! {
            changed = activity.changed() => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
            () = sleep_until(last + timeouts.warn_after) => {}
        }

        let remaining = timeouts.logout_after.saturating_sub(timeouts.warn_after);
        tracing::info!(remaining_secs = remaining.as_secs(), "idle warning");
        set_status(&status, IdleStatus::Warning);

        tokio::select! {
            changed = activity.changed() => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
            () = sleep_until(last + timeouts.logout_after) => {}
        }
        break;
    }

    tracing::info!(idle_secs = timeouts.logout_after.as_secs(), "idle timeout reached; logging out");
    set_status(&status, IdleStatus::LoggedOut);
    on_logout().await;
}

fn set_status(status: &watch::Sender<IdleStatus>, next: IdleStatus) {
    status.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}
