use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Scan,
    Clean,
    RefreshMetadata,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Scan => "scan",
            TaskKind::Clean => "clean",
            TaskKind::RefreshMetadata => "refresh-metadata",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub kind: TaskKind,
    pub library: String,
    pub state: TaskState,
    pub message: Option<String>,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
}

enum TaskEvent {
    Started {
        id: String,
        at: u64,
    },
    Finished {
        id: String,
        result: Result<String, String>,
        at: u64,
    },
}

/// Runs blocking library jobs in the background, at most
/// `max_concurrent` at a time. Outcomes are kept for the last `history`
/// tasks, newest first.
#[derive(Clone)]
pub struct TaskRunner {
    semaphore: Arc<Semaphore>,
    records: Arc<RwLock<VecDeque<TaskRecord>>>,
    history: usize,
    events: mpsc::UnboundedSender<TaskEvent>,
}

impl TaskRunner {
    /// Must be called from within a tokio runtime: the collector task is
    /// spawned here.
    pub fn new(max_concurrent: usize, history: usize) -> Self {
        let records = Arc::new(RwLock::new(VecDeque::new()));
        let (events, receiver) = mpsc::unbounded_channel();
        let history = history.max(1);
        tokio::spawn(collect(receiver, Arc::clone(&records), history));
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            records,
            history,
            events,
        }
    }

    /// Queues `job` and returns its task id right away.
    pub fn submit<F>(&self, kind: TaskKind, library: &str, job: F) -> String
    where
        F: FnOnce() -> Result<String, String> + Send + 'static,
    {
        let id = Uuid::new_v4().to_string();
        {
            let mut records = self.records.write();
            records.push_front(TaskRecord {
                id: id.clone(),
                kind,
                library: library.to_string(),
                state: TaskState::Queued,
                message: None,
                started_at: None,
                finished_at: None,
            });
            evict_finished(&mut records, self.history);
        }

        let semaphore = Arc::clone(&self.semaphore);
        let events = self.events.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    let _ = events.send(TaskEvent::Finished {
                        id: task_id,
                        result: Err(err.to_string()),
                        at: now_secs(),
                    });
                    return;
                }
            };
            let _ = events.send(TaskEvent::Started {
                id: task_id.clone(),
                at: now_secs(),
            });
            let result = match tokio::task::spawn_blocking(job).await {
                Ok(result) => result,
                Err(err) => Err(format!("task join error: {}", err)),
            };
            let _ = events.send(TaskEvent::Finished {
                id: task_id,
                result,
                at: now_secs(),
            });
        });
        id
    }

    pub fn records(&self) -> Vec<TaskRecord> {
        self.records.read().iter().cloned().collect()
    }

    pub fn running(&self) -> usize {
        self.records
            .read()
            .iter()
            .filter(|record| record.state == TaskState::Running)
            .count()
    }
}

async fn collect(
    mut receiver: mpsc::UnboundedReceiver<TaskEvent>,
    records: Arc<RwLock<VecDeque<TaskRecord>>>,
    history: usize,
) {
    while let Some(event) = receiver.recv().await {
        match event {
            TaskEvent::Started { id, at } => {
                let mut records = records.write();
                if let Some(record) = records.iter_mut().find(|record| record.id == id) {
                    record.state = TaskState::Running;
                    record.started_at = Some(at);
                    info!("Task {} started: {} {}", id, record.kind.as_str(), record.library);
                }
            }
            TaskEvent::Finished { id, result, at } => {
                match &result {
                    Ok(message) => info!("Task {} finished: {}", id, message),
                    Err(err) => warn!("Task {} failed: {}", id, err),
                }
                let mut records = records.write();
                if let Some(record) = records.iter_mut().find(|record| record.id == id) {
                    let (state, message) = match result {
                        Ok(message) => (TaskState::Succeeded, message),
                        Err(err) => (TaskState::Failed, err),
                    };
                    record.state = state;
                    record.message = Some(message);
                    record.finished_at = Some(at);
                }
                evict_finished(&mut records, history);
            }
        }
    }
}

/// Drops the oldest finished records until at most `history` remain.
/// Queued and running tasks are never dropped.
fn evict_finished(records: &mut VecDeque<TaskRecord>, history: usize) {
    while records.len() > history {
        match records.iter().rposition(|record| record.finished_at.is_some()) {
            Some(index) => {
                records.remove(index);
            }
            None => break,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn wait_finished(runner: &TaskRunner, id: &str) -> TaskRecord {
        for _ in 0..200 {
            let record = runner.records().into_iter().find(|record| record.id == id);
            if let Some(record) = record {
                if record.finished_at.is_some() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish", id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn outcomes_are_recorded() {
        let runner = TaskRunner::new(2, 10);
        let ok = runner.submit(TaskKind::Scan, "music", || Ok("registered 3 files".to_string()));
        let failed = runner.submit(TaskKind::Clean, "music", || Err("disk gone".to_string()));

        let ok = wait_finished(&runner, &ok).await;
        assert_eq!(ok.state, TaskState::Succeeded);
        assert_eq!(ok.message.as_deref(), Some("registered 3 files"));
        assert!(ok.started_at.is_some());

        let failed = wait_finished(&runner, &failed).await;
        assert_eq!(failed.state, TaskState::Failed);
        assert_eq!(failed.message.as_deref(), Some("disk gone"));
        assert_eq!(failed.kind, TaskKind::Clean);
        assert_eq!(runner.running(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrency_is_bounded() {
        let runner = TaskRunner::new(1, 10);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut ids = Vec::new();
        for _ in 0..3 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            ids.push(runner.submit(TaskKind::RefreshMetadata, "music", move || {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(String::new())
            }));
        }
        for id in &ids {
            wait_finished(&runner, id).await;
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn history_is_capped_once_tasks_finish() {
        let runner = TaskRunner::new(2, 2);
        for index in 0..3 {
            runner.submit(TaskKind::Scan, &format!("lib-{}", index), || Ok(String::new()));
        }
        // Nothing has run yet, so nothing may be evicted.
        assert_eq!(runner.records().len(), 3);

        for _ in 0..200 {
            let records = runner.records();
            if records.len() == 2 && records.iter().all(|record| record.finished_at.is_some()) {
                assert!(records.iter().all(|record| record.state == TaskState::Succeeded));
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("history was not capped: {:?}", runner.records());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn running_tasks_survive_a_full_history() {
        let runner = TaskRunner::new(2, 1);
        let (release, blocked) = std::sync::mpsc::channel::<()>();
        let slow = runner.submit(TaskKind::Scan, "slow", move || {
            let _ = blocked.recv();
            Ok("done".to_string())
        });
        runner.submit(TaskKind::Clean, "fast-1", || Ok(String::new()));
        runner.submit(TaskKind::Clean, "fast-2", || Ok(String::new()));

        let mut settled = false;
        for _ in 0..200 {
            let records = runner.records();
            let slow_running = records
                .iter()
                .any(|record| record.id == slow && record.state == TaskState::Running);
            let others_done = records
                .iter()
                .filter(|record| record.id != slow)
                .all(|record| record.finished_at.is_some());
            if slow_running && others_done && records.len() == 1 {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(settled, "unexpected records: {:?}", runner.records());
        assert_eq!(runner.running(), 1);

        release.send(()).unwrap();
        let record = wait_finished(&runner, &slow).await;
        assert_eq!(record.state, TaskState::Succeeded);
        assert_eq!(record.message.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn records_serialize_with_wire_names() {
        let runner = TaskRunner::new(1, 10);
        let _permit = Arc::clone(&runner.semaphore).acquire_owned().await.unwrap();
        runner.submit(TaskKind::RefreshMetadata, "music", || Ok(String::new()));

        let value = serde_json::to_value(&runner.records()[0]).unwrap();
        assert_eq!(value["kind"], "refresh-metadata");
        assert_eq!(value["state"], "queued");
        assert_eq!(value["library"], "music");
        assert!(value["finished_at"].is_null());
    }
}
