use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the storage watcher to the live view loop.
#[derive(Debug)]
pub enum StorageEvent {
    /// One or more watched key files changed on disk.
    Changed(Vec<PathBuf>),
}

/// Watches a storage directory for changes to specific key files.
pub struct StorageWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<StorageEvent>,
}

impl StorageWatcher {
    /// Start watching `dir` for writes to the given key files
    /// (file names such as `tasks.json`).
    pub fn start(dir: &Path, file_names: &[&str]) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let names: Vec<String> = file_names.iter().map(|s| s.to_string()).collect();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                // Temp files and the lock file never match a key file name
                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| {
                        p.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|name| names.iter().any(|k| k == name))
                    })
                    .collect();

                if !relevant.is_empty() {
                    let _ = tx.send(StorageEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(StorageWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending events.
    pub fn poll(&self) -> Vec<StorageEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Block up to `timeout` for the first event, then drain the rest.
    pub fn wait(&self, timeout: Duration) -> Vec<StorageEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut events = vec![first];
                events.extend(self.poll());
                events
            }
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::{FileStorage, Storage, TASKS_KEY, VISITED_KEY};
    use tempfile::TempDir;

    #[test]
    fn reports_writes_to_watched_key_only() {
        let tmp = TempDir::new().unwrap();
        let watcher = StorageWatcher::start(tmp.path(), &["tasks.json"]).unwrap();
        let storage = FileStorage::new(tmp.path());

        storage.set_item(VISITED_KEY, "true").unwrap();
        storage.set_item(TASKS_KEY, "[]").unwrap();

        let mut changed = Vec::new();
        for _ in 0..20 {
            for StorageEvent::Changed(paths) in watcher.wait(Duration::from_millis(100)) {
                changed.extend(paths);
            }
            if !changed.is_empty() {
                break;
            }
        }
        assert!(!changed.is_empty());
        assert!(changed.iter().all(|p| p.ends_with("tasks.json")));
    }
}
