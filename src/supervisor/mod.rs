//! Task supervisor: one tracked tokio task per in-flight generation
//!
//! The accepting call path never waits on a unit; handles stay observable so
//! tests can join deterministically and a panicked unit does not vanish
//! silently. All cross-unit coordination flows through the store and the
//! ledger, never through the supervisor itself.

use std::future::Future;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

/// Spawns and tracks orchestration units
#[derive(Default)]
pub struct TaskSupervisor {
    tasks: DashMap<Uuid, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn one detached unit of work for a generation. Handles of units
    /// that already ran to completion are dropped here, so the map tracks
    /// in-flight work instead of growing with every generation accepted.
    pub fn spawn<F>(&self, id: Uuid, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|_, handle| !handle.is_finished());
        debug!(generation_id = %id, "Spawning orchestration unit");
        self.tasks.insert(id, tokio::spawn(future));
    }

    /// Await one unit to completion. Returns false when no unit is (still)
    /// tracked under that id.
    pub async fn wait(&self, id: Uuid) -> bool {
        let Some((_, handle)) = self.tasks.remove(&id) else {
            return false;
        };
        if let Err(e) = handle.await {
            error!(generation_id = %id, error = %e, "Orchestration unit panicked");
        }
        true
    }

    /// Await every currently tracked unit; used by tests and shutdown.
    pub async fn wait_all(&self) {
        let ids: Vec<Uuid> = self.tasks.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.wait(id).await;
        }
    }

    /// Number of tracked units
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }
}
