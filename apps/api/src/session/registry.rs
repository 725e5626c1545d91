use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::session::runtime::SessionHandle;

pub const DEFAULT_SESSION_LINGER: Duration = Duration::from_secs(300);

/// Live sessions keyed by interview id.
///
/// A session is evicted `linger` after it finishes; from then on only its
/// archived report is available.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    linger: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_linger(DEFAULT_SESSION_LINGER)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_linger(linger: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            linger,
        }
    }

    pub async fn insert(&self, handle: SessionHandle) {
        let id = handle.id();
        let finished = handle.finished();
        self.sessions.write().await.insert(id, handle);

        let registry = self.clone();
        tokio::spawn(async move {
            finished.await;
            tokio::time::sleep(registry.linger).await;
            if registry.remove(id).await.is_some() {
                debug!(interview_id = %id, "finished session evicted");
            }
        });
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::Clock;
    use crate::session::controller::{Collaborators, EngineSettings};
    use crate::session::models::{Interview, InterviewMode, TerminationReason};
    use crate::session::runtime::spawn_session;
    use crate::session::testing::{
        complete_profile, sample_questions, FakeScorer, RecordingObserver,
    };

    fn spawn(observer: Arc<RecordingObserver>) -> SessionHandle {
        let interview = Interview::new(Uuid::new_v4(), InterviewMode::Proctored, complete_profile());
        spawn_session(
            interview,
            Collaborators {
                scorer: Arc::new(FakeScorer::scoring(50)),
                observer,
            },
            EngineSettings::default(),
            Clock::default(),
        )
    }

    #[tokio::test]
    async fn test_registered_session_is_reachable() {
        let registry = SessionRegistry::new();
        let handle = spawn(Arc::new(RecordingObserver::default()));
        let id = handle.id();

        registry.insert(handle).await;
        assert_eq!(registry.len().await, 1);

        let found = registry.get(id).await.unwrap();
        assert_eq!(found.snapshot().await.unwrap().interview.id, id);
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_sessions_are_evicted_after_linger() {
        let registry = SessionRegistry::with_linger(Duration::from_secs(30));
        let observer = Arc::new(RecordingObserver::default());

        let mut ids = Vec::new();
        for _ in 0..3 {
            let handle = spawn(observer.clone());
            ids.push(handle.id());
            registry.insert(handle).await;
        }
        let running = spawn(observer.clone());
        let running_id = running.id();
        registry.insert(running).await;

        for id in &ids {
            let handle = registry.get(*id).await.unwrap();
            handle.start(sample_questions()).await.unwrap();
            handle
                .terminate(TerminationReason::Requested { note: None })
                .await
                .unwrap();
        }

        // Still live during the linger window.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(registry.len().await, 4);
        let report = registry.get(ids[0]).await.unwrap().snapshot().await.unwrap().report;
        assert!(report.is_some());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(registry.len().await, 1);
        for id in &ids {
            assert!(registry.get(*id).await.is_none());
        }
        assert!(registry.get(running_id).await.is_some());

        // The archive received every report before eviction.
        let archived: Vec<Uuid> = observer.reports().iter().map(|r| r.interview_id).collect();
        assert_eq!(archived.len(), 3);
        assert!(ids.iter().all(|id| archived.contains(id)));
    }
}
