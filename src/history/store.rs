//! In-memory task history with optional JSON file persistence

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::models::Task;
use crate::error::{EstimatorError, Result};

const HISTORY_FILE: &str = "tasks.json";

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    task: Task,
}

/// Task history store
///
/// Listing order is newest first. Each insert takes the next sequence
/// number; an import places its first row on top.
pub struct TaskStore {
    tasks: DashMap<String, Entry>,
    next_seq: AtomicU64,
    file: Option<PathBuf>,
    /// Serializes snapshot-and-write so the file always holds the latest state
    write_lock: Mutex<()>,
}

impl TaskStore {
    /// Store without persistence
    pub fn in_memory() -> Self {
        Self {
            tasks: DashMap::new(),
            next_seq: AtomicU64::new(0),
            file: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Open the history kept in `data_dir`, creating the directory if needed.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let file = data_dir.join(HISTORY_FILE);

        let mut store = Self::in_memory();
        store.file = Some(file.clone());

        if tokio::fs::try_exists(&file).await? {
            let content = tokio::fs::read_to_string(&file).await?;
            let tasks: Vec<Task> = serde_json::from_str(&content)?;
            info!("Loaded {} tasks from {}", tasks.len(), file.display());
            store.push_front(tasks);
        }

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks, newest first.
    pub fn list(&self) -> Vec<Task> {
        let mut entries: Vec<Entry> = self.tasks.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries.into_iter().map(|e| e.task).collect()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.get(id).map(|e| e.task.clone())
    }

    /// Record one task and persist the history.
    pub async fn insert(&self, task: Task) -> Result<Task> {
        debug!("Recording task: id={}", task.id);
        self.push_front(vec![task.clone()]);
        self.persist().await?;
        Ok(task)
    }

    /// Record many tasks, keeping their order at the top of the history.
    pub async fn import(&self, tasks: Vec<Task>) -> Result<usize> {
        let count = tasks.len();
        self.push_front(tasks);
        self.persist().await?;
        info!("Imported {} tasks", count);
        Ok(count)
    }

    pub async fn remove(&self, id: &str) -> Result<Task> {
        let (_, entry) = self
            .tasks
            .remove(id)
            .ok_or_else(|| EstimatorError::TaskNotFound(id.to_string()))?;
        self.persist().await?;
        Ok(entry.task)
    }

    pub async fn clear(&self) -> Result<()> {
        self.tasks.clear();
        self.persist().await
    }

    fn push_front(&self, tasks: Vec<Task>) {
        let count = tasks.len() as u64;
        let base = self.next_seq.fetch_add(count, Ordering::SeqCst);
        for (offset, task) in tasks.into_iter().enumerate() {
            // First task gets the highest sequence number
            let seq = base + count - 1 - offset as u64;
            self.tasks.insert(task.id.clone(), Entry { seq, task });
        }
    }

    async fn persist(&self) -> Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        let tasks = self.list();
        let json = serde_json::to_vec_pretty(&tasks)?;

        // Readers never see a partially written file
        let tmp = file.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, file).await?;
        debug!("Saved {} tasks to {}", tasks.len(), file.display());
        Ok(())
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str) -> Task {
        Task::new(title, "descrição", "feature", 3, 3)
    }

    #[tokio::test]
    async fn test_newest_first() {
        let store = TaskStore::in_memory();
        store.insert(task("first")).await.unwrap();
        store.insert(task("second")).await.unwrap();
        store
            .import(vec![task("imported-a"), task("imported-b")])
            .await
            .unwrap();

        let titles: Vec<String> = store.list().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["imported-a", "imported-b", "second", "first"]);
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let store = TaskStore::in_memory();
        let saved = store.insert(task("a")).await.unwrap();
        assert_eq!(store.get(&saved.id).unwrap().title, "a");

        store.remove(&saved.id).await.unwrap();
        assert!(store.get(&saved.id).is_none());
        assert!(matches!(
            store.remove(&saved.id).await,
            Err(EstimatorError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = TaskStore::open(dir.path()).await.unwrap();
            store.insert(task("old")).await.unwrap();
            store.insert(task("new")).await.unwrap();
        }

        let reopened = TaskStore::open(dir.path()).await.unwrap();
        let titles: Vec<String> = reopened.list().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["new", "old"]);

        reopened.clear().await.unwrap();
        assert!(TaskStore::open(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_leave_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(TaskStore::open(dir.path()).await.unwrap());

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(task(&format!("task-{}", i))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = TaskStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len(), 32);
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }
}
