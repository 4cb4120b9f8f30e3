//! Dependency collector for fragment invalidation.
//!
//! Uses `tokio::task_local!` to track which entities a fragment was rendered
//! from. Services call [`record`] while loading data; the fragment cache
//! wraps rendering in [`with_collector`] and registers the result.

use std::cell::RefCell;
use std::collections::HashSet;

use super::keys::EntityKey;

tokio::task_local! {
    static DEPS: RefCell<HashSet<EntityKey>>;
}

/// Record an entity dependency. Ignored when no collector is active.
pub fn record(entity: EntityKey) {
    let _ = DEPS.try_with(|deps| {
        deps.borrow_mut().insert(entity);
    });
}

/// Snapshot of the dependencies recorded so far in the current scope.
pub fn collect() -> HashSet<EntityKey> {
    DEPS.try_with(|deps| deps.borrow().clone())
        .unwrap_or_default()
}

/// Run `f` with a fresh collector and return its output together with
/// every dependency recorded while it ran.
pub async fn with_collector<F, R>(f: F) -> (R, HashSet<EntityKey>)
where
    F: std::future::Future<Output = R>,
{
    DEPS.scope(RefCell::new(HashSet::new()), async move {
        let result = f.await;
        (result, collect())
    })
    .await
}
