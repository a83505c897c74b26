//! Shared navigation entry point.
//!
//! The session store lives behind an async mutex. A navigation holds the lock
//! for its whole evaluation, so a second navigation issued while a profile
//! fetch is in flight waits and then sees the validated session.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use octoops_client::SessionStore;

use crate::guard::{NavigationDecision, NavigationGuard};

/// Guard redirects followed per navigation before giving up.
const MAX_HOPS: usize = 4;

/// Outcome of one navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub requested: String,
    /// Decision for the requested path (before following redirects).
    pub decision: NavigationDecision,
    /// Where the console ended up; `None` when nothing could be shown.
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SharedNavigator {
    guard: Arc<NavigationGuard>,
    store: Arc<Mutex<SessionStore>>,
    location: Arc<Mutex<Option<String>>>,
}

impl SharedNavigator {
    pub fn new(guard: NavigationGuard, store: SessionStore) -> Self {
        Self {
            guard: Arc::new(guard),
            store: Arc::new(Mutex::new(store)),
            location: Arc::new(Mutex::new(None)),
        }
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    /// Exclusive access to the session store (login, logout, queries).
    pub async fn lock(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().await
    }

    pub async fn location(&self) -> Option<String> {
        self.location.lock().await.clone()
    }

    /// Run the guard for `to` and follow its redirects to a shown route.
    pub async fn navigate(&self, to: &str) -> Navigation {
        let mut store = self.store.lock().await;
        let from = self.location().await;

        let decision = self.guard.evaluate(to, from.as_deref(), &mut store).await;
        let mut current = decision.clone();
        let mut previous = to.to_string();
        let mut location = None;

        for _ in 0..=MAX_HOPS {
            match current {
                NavigationDecision::Allow { path, .. } => {
                    location = Some(path);
                    break;
                }
                NavigationDecision::NotFound { .. } => break,
                NavigationDecision::Redirect { to: next, .. } => {
                    current = self.guard.evaluate(&next, Some(&previous), &mut store).await;
                    previous = next;
                }
            }
        }
        drop(store);

        match &location {
            Some(path) => *self.location.lock().await = Some(path.clone()),
            None if !matches!(decision, NavigationDecision::NotFound { .. }) => {
                tracing::warn!(to, "navigation did not settle on a route");
            }
            None => {}
        }

        Navigation {
            requested: to.to_string(),
            decision,
            location,
        }
    }
}
