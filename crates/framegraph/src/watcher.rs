//! File-system change detection for the pass directory

use notify::event::{MetadataKind, ModifyKind};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Non-blocking source-change query driving rebuilds
pub trait ChangeMonitor {
    /// Returns true if anything changed since the previous call
    ///
    /// Must return immediately; pending notifications are consumed.
    fn poll_changed(&mut self) -> bool;
}

#[derive(Debug, thiserror::Error)]
#[error("cannot watch '{}': {source}", .dir.display())]
pub struct WatchError {
    pub dir: PathBuf,
    #[source]
    pub source: notify::Error,
}

/// Recursive watch over a pass directory
///
/// Reports file and directory creation, removal, renames and content or
/// write-time changes. Unclassified events count as changes since some backends
/// emit nothing else. Access notifications are ignored so that reading the
/// sources during a rebuild does not schedule another one. The watch stops when
/// the value is dropped.
pub struct SourceWatcher {
    dir: PathBuf,
    _watcher: RecommendedWatcher,
    event_rx: mpsc::Receiver<notify::Event>,
}

impl SourceWatcher {
    /// Starts watching `dir` and everything below it
    ///
    /// # Arguments
    /// * `dir` - Directory to watch
    ///
    /// # Returns
    /// The watcher, or an error if the platform watch could not be installed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, WatchError> {
        let dir = dir.as_ref().to_path_buf();
        let fail = |source: notify::Error| WatchError { dir: dir.clone(), source };

        let (tx, event_rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => tracing::warn!("File watch error: {e}"),
        })
        .map_err(fail)?;
        watcher.watch(&dir, RecursiveMode::Recursive).map_err(fail)?;
        tracing::info!("Watching pass directory {}", dir.display());

        Ok(Self {
            dir,
            _watcher: watcher,
            event_rx,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for SourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWatcher").field("dir", &self.dir).finish_non_exhaustive()
    }
}

impl ChangeMonitor for SourceWatcher {
    fn poll_changed(&mut self) -> bool {
        let mut changed = false;
        // Drain everything so one burst of writes yields a single rebuild
        while let Ok(event) = self.event_rx.try_recv() {
            if is_source_change(&event.kind) {
                tracing::debug!("Source change: {:?} {:?}", event.kind, event.paths);
                changed = true;
            }
        }
        changed
    }
}

fn is_source_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Any | EventKind::Other => true,
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange};
    use std::time::{Duration, Instant};

    #[test]
    fn test_event_filter() {
        assert!(is_source_change(&EventKind::Create(CreateKind::File)));
        assert!(is_source_change(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_source_change(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime))));
        assert!(!is_source_change(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))));
        assert!(!is_source_change(&EventKind::Access(AccessKind::Read)));
    }

    #[test]
    fn test_unclassified_events_are_changes() {
        assert!(is_source_change(&EventKind::Any));
        assert!(is_source_change(&EventKind::Other));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = SourceWatcher::new(&missing).unwrap_err();
        assert_eq!(err.dir, missing);
    }

    #[test]
    fn test_detects_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = SourceWatcher::new(dir.path()).unwrap();
        assert!(!watcher.poll_changed());

        std::fs::write(dir.path().join("Opaque.pass"), "PassInput : Static").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut changed = false;
        while !changed && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
            changed = watcher.poll_changed();
        }
        assert!(changed);
    }
}
