use std::time::Duration;

use super::*;
use crate::state::tokens::MemoryTokenStore;

fn manager_with(tokens: Option<TokenPair>) -> SessionManager {
    let store = match tokens {
        Some(tokens) => MemoryTokenStore::with_tokens(tokens),
        None => MemoryTokenStore::new(),
    };
    SessionManager::new(Arc::new(store))
}

#[test]
fn only_one_refresh_slot_at_a_time() {
    let manager = manager_with(None);

    let guard = manager.try_begin_refresh().expect("slot should be free");
    assert!(manager.is_refreshing());
    assert!(manager.try_begin_refresh().is_none());

    drop(guard);
    assert!(!manager.is_refreshing());
    assert!(manager.try_begin_refresh().is_some());
}

#[test]
fn token_accessors_read_the_stored_pair() {
    let manager = manager_with(Some(TokenPair::new("a1", "r1")));
    assert_eq!(manager.access_token().unwrap().as_deref(), Some("a1"));
    assert_eq!(manager.refresh_token().unwrap().as_deref(), Some("r1"));

    manager.replace_tokens(&TokenPair::new("a2", "r2")).unwrap();
    assert_eq!(manager.tokens().unwrap(), Some(TokenPair::new("a2", "r2")));
}

#[test]
fn expire_and_end_session_clear_both_tokens() {
    let manager = manager_with(Some(TokenPair::new("a1", "r1")));
    manager.expire();
    assert_eq!(manager.tokens().unwrap(), None);

    manager.store_tokens(&TokenPair::new("a2", "r2")).unwrap();
    manager.end_session();
    assert_eq!(manager.access_token().unwrap(), None);
    assert_eq!(manager.refresh_token().unwrap(), None);
}

#[test]
fn mutations_are_announced_in_order() {
    let manager = manager_with(None);
    let mut events = manager.subscribe();

    manager.store_tokens(&TokenPair::new("a", "r")).unwrap();
    manager.replace_tokens(&TokenPair::new("a2", "r2")).unwrap();
    manager.expire();
    manager.end_session();

    assert_eq!(events.try_recv().unwrap(), SessionEvent::Started);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedOut);
}

#[tokio::test]
async fn wait_for_refresh_returns_immediately_when_idle() {
    let manager = manager_with(None);
    tokio::time::timeout(Duration::from_millis(50), manager.wait_for_refresh())
        .await
        .expect("idle manager should not block");
}

#[tokio::test]
async fn wait_for_refresh_resumes_when_guard_drops() {
    let manager = Arc::new(manager_with(None));

    let holder = Arc::clone(&manager);
    let (claimed_tx, claimed_rx) = tokio::sync::oneshot::channel();
    let refresher = tokio::spawn(async move {
        let guard = holder.try_begin_refresh().expect("slot should be free");
        claimed_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        holder.replace_tokens(&TokenPair::new("fresh", "fresh-r")).unwrap();
        drop(guard);
    });

    claimed_rx.await.unwrap();
    assert!(manager.is_refreshing());
    manager.wait_for_refresh().await;
    assert!(!manager.is_refreshing());
    assert_eq!(manager.access_token().unwrap().as_deref(), Some("fresh"));
    refresher.await.unwrap();
}
