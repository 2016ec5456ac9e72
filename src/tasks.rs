//! In-process asynchronous task tracking.
//!
//! Uploads are decoupled from document processing through a fire-and-forget
//! registry: enqueueing returns an opaque task id immediately and the job runs
//! on the runtime's worker pool. Each task transitions exactly once from
//! `Pending` to a terminal state; polling after that returns the same snapshot
//! on every call.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Lifecycle states of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Job accepted but not yet finished.
    Pending,
    /// Job finished and produced a result payload.
    Success,
    /// Job failed; the result payload carries the error message.
    Failure,
}

impl TaskStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone)]
struct TaskRecord {
    status: TaskStatus,
    result: Option<Value>,
}

/// Point-in-time view of a task returned to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    /// Identifier assigned when the task was enqueued.
    pub task_id: String,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Result payload; `None` until the task reaches a terminal state.
    pub result: Option<Value>,
}

/// Registry tracking background jobs by opaque id.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<HashMap<Uuid, TaskRecord>>>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a job and return its task id without waiting for completion.
    ///
    /// A job resolving to `Ok(payload)` marks the task `Success` with that
    /// payload; `Err(message)` marks it `Failure` with `{"error": message}`.
    pub fn spawn<F>(&self, job: F) -> Uuid
    where
        F: Future<Output = Result<Value, String>> + Send + 'static,
    {
        let task_id = Uuid::new_v4();
        {
            let inner = self.inner.clone();
            // Reserve the Pending record before the job can run.
            let registry = self.clone();
            tokio::spawn(async move {
                {
                    let mut guard = inner.write().await;
                    guard.insert(
                        task_id,
                        TaskRecord {
                            status: TaskStatus::Pending,
                            result: None,
                        },
                    );
                }
                let outcome = job.await;
                match outcome {
                    Ok(payload) => {
                        registry
                            .complete(task_id, TaskStatus::Success, Some(payload))
                            .await;
                    }
                    Err(message) => {
                        tracing::warn!(task_id = %task_id, error = %message, "Task failed");
                        registry
                            .complete(
                                task_id,
                                TaskStatus::Failure,
                                Some(json!({ "error": message })),
                            )
                            .await;
                    }
                }
            });
        }
        task_id
    }

    /// Look up the current snapshot for a task id.
    ///
    /// Unknown ids resolve to a `Pending` snapshot with no result: the spawn
    /// may not have inserted its record yet, so a poll racing the insert must
    /// not fail.
    pub async fn snapshot(&self, task_id: Uuid) -> TaskSnapshot {
        let guard = self.inner.read().await;
        match guard.get(&task_id) {
            Some(record) => TaskSnapshot {
                task_id: task_id.to_string(),
                status: record.status,
                result: record.result.clone(),
            },
            None => TaskSnapshot {
                task_id: task_id.to_string(),
                status: TaskStatus::Pending,
                result: None,
            },
        }
    }

    async fn complete(&self, task_id: Uuid, status: TaskStatus, result: Option<Value>) {
        debug_assert!(status.is_terminal());
        let mut guard = self.inner.write().await;
        let record = guard.entry(task_id).or_insert(TaskRecord {
            status: TaskStatus::Pending,
            result: None,
        });
        // Transitions are monotonic: a terminal record never changes again.
        if record.status.is_terminal() {
            return;
        }
        record.status = status;
        record.result = result;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn await_terminal(registry: &TaskRegistry, task_id: Uuid) -> TaskSnapshot {
        for _ in 0..100 {
            let snapshot = registry.snapshot(task_id).await;
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task never reached a terminal state");
    }

    #[tokio::test]
    async fn successful_job_reports_payload() {
        let registry = TaskRegistry::new();
        let task_id = registry.spawn(async { Ok(json!({ "summary": "done" })) });

        let snapshot = await_terminal(&registry, task_id).await;
        assert_eq!(snapshot.status, TaskStatus::Success);
        assert_eq!(snapshot.result, Some(json!({ "summary": "done" })));
    }

    #[tokio::test]
    async fn failed_job_reports_error_payload() {
        let registry = TaskRegistry::new();
        let task_id = registry.spawn(async { Err("Empty document".to_string()) });

        let snapshot = await_terminal(&registry, task_id).await;
        assert_eq!(snapshot.status, TaskStatus::Failure);
        assert_eq!(snapshot.result, Some(json!({ "error": "Empty document" })));
    }

    #[tokio::test]
    async fn terminal_snapshot_is_stable_across_polls() {
        let registry = TaskRegistry::new();
        let task_id = registry.spawn(async { Ok(json!({ "tags": ["Invoice"] })) });

        let first = await_terminal(&registry, task_id).await;
        for _ in 0..5 {
            let again = registry.snapshot(task_id).await;
            assert_eq!(again.status, first.status);
            assert_eq!(again.result, first.result);
        }
    }

    #[tokio::test]
    async fn terminal_state_never_transitions_again() {
        let registry = TaskRegistry::new();
        let task_id = Uuid::new_v4();
        registry
            .complete(task_id, TaskStatus::Success, Some(json!({ "ok": true })))
            .await;
        registry
            .complete(
                task_id,
                TaskStatus::Failure,
                Some(json!({ "error": "late" })),
            )
            .await;

        let snapshot = registry.snapshot(task_id).await;
        assert_eq!(snapshot.status, TaskStatus::Success);
        assert_eq!(snapshot.result, Some(json!({ "ok": true })));
    }

    #[tokio::test]
    async fn unknown_id_polls_as_pending() {
        let registry = TaskRegistry::new();
        let snapshot = registry.snapshot(Uuid::new_v4()).await;
        assert_eq!(snapshot.status, TaskStatus::Pending);
        assert!(snapshot.result.is_none());
    }
}
