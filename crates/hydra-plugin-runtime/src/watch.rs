//! Modification-time polling
//!
//! Watchers never touch the filesystem on their own; the reload scheduler
//! calls [`HotFile::poll`] and [`DirectoryWatcher::poll`] once per tick and
//! acts on what they report.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{trace, warn};

/// Result of polling a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// The mtime differs from the last observed one
    Changed,
    /// Same mtime as last time, or the change has not settled yet
    Unchanged,
    /// The path does not exist or cannot be read
    Missing,
}

/// Watches one file for mtime changes
#[derive(Debug)]
pub struct HotFile {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    settle: Option<Duration>,
}

impl HotFile {
    /// Start watching `path`, treating its current mtime as already seen
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path).ok();
        Self {
            path,
            last_modified,
            settle: None,
        }
    }

    /// Defer changes younger than `settle`
    pub fn with_settle(mut self, settle: Option<Duration>) -> Self {
        self.settle = settle;
        self
    }

    /// Watched path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compare the current mtime against the last observed one
    ///
    /// State is only updated when [`FileStatus::Changed`] is returned.
    pub fn poll(&mut self) -> FileStatus {
        let current = match modified(&self.path) {
            Ok(mtime) => mtime,
            Err(e) => {
                trace!(path = %self.path.display(), error = %e, "Watched file unavailable");
                return FileStatus::Missing;
            }
        };

        if self.last_modified == Some(current) || !settled(current, self.settle) {
            return FileStatus::Unchanged;
        }

        self.last_modified = Some(current);
        FileStatus::Changed
    }
}

/// Files that changed in a directory since the previous poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryChanges {
    /// Files seen for the first time
    pub added: BTreeSet<PathBuf>,
    /// Files whose mtime changed
    pub modified: BTreeSet<PathBuf>,
    /// Files that disappeared
    pub removed: BTreeSet<PathBuf>,
}

impl DirectoryChanges {
    /// True when nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Added and modified files in lexicographic order
    pub fn loadable(&self) -> impl Iterator<Item = &PathBuf> {
        let mut paths: Vec<&PathBuf> = self.added.iter().chain(&self.modified).collect();
        paths.sort();
        paths.into_iter()
    }
}

/// Watches the module files directly inside one directory
#[derive(Debug)]
pub struct DirectoryWatcher {
    dir: PathBuf,
    extensions: Vec<String>,
    settle: Option<Duration>,
    state: BTreeMap<PathBuf, SystemTime>,
}

impl DirectoryWatcher {
    /// Watch `dir` for files with one of `extensions`
    ///
    /// The directory starts out with no known files, so the first poll
    /// reports everything present as added.
    pub fn new<I, S>(dir: impl Into<PathBuf>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dir: dir.into(),
            extensions: extensions.into_iter().map(Into::into).collect(),
            settle: None,
            state: BTreeMap::new(),
        }
    }

    /// Defer changes younger than `settle`
    pub fn with_settle(mut self, settle: Option<Duration>) -> Self {
        self.settle = settle;
        self
    }

    /// Watched directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of tracked files
    pub fn tracked(&self) -> usize {
        self.state.len()
    }

    /// Forget all state and poll; every present file is reported as added
    pub fn rescan(&mut self) -> DirectoryChanges {
        self.state.clear();
        self.poll()
    }

    /// Diff the directory against the last poll
    pub fn poll(&mut self) -> DirectoryChanges {
        let listing = match self.list() {
            Ok(listing) => listing,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot read watched directory");
                return DirectoryChanges::default();
            }
        };

        let mut changes = DirectoryChanges::default();

        for (path, mtime) in &listing {
            match self.state.get(path) {
                Some(seen) if seen == mtime => {}
                _ if !settled(*mtime, self.settle) => {
                    trace!(path = %path.display(), "Deferring unsettled file");
                }
                Some(_) => {
                    self.state.insert(path.clone(), *mtime);
                    changes.modified.insert(path.clone());
                }
                None => {
                    self.state.insert(path.clone(), *mtime);
                    changes.added.insert(path.clone());
                }
            }
        }

        let gone: Vec<PathBuf> = self
            .state
            .keys()
            .filter(|path| !listing.contains_key(*path))
            .cloned()
            .collect();
        for path in gone {
            self.state.remove(&path);
            changes.removed.insert(path);
        }

        if !changes.is_empty() {
            trace!(
                dir = %self.dir.display(),
                added = changes.added.len(),
                modified = changes.modified.len(),
                removed = changes.removed.len(),
                "Directory changed"
            );
        }

        changes
    }

    fn list(&self) -> io::Result<BTreeMap<PathBuf, SystemTime>> {
        let mut listing = BTreeMap::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !self.recognized(&path) {
                continue;
            }
            // Files may vanish between listing and stat.
            let Ok(metadata) = std::fs::metadata(&path) else {
                continue;
            };
            if metadata.is_file() {
                listing.insert(path, metadata.modified()?);
            }
        }
        Ok(listing)
    }

    fn recognized(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|known| known == ext))
            .unwrap_or(false)
    }
}

fn modified(path: &Path) -> io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

fn settled(mtime: SystemTime, settle: Option<Duration>) -> bool {
    match settle {
        Some(window) => SystemTime::now()
            .duration_since(mtime)
            .map(|age| age >= window)
            .unwrap_or(false),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::touch;
    use std::fs;

    #[test]
    fn test_hot_file_detects_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libplugin.so");
        touch(&path, 10);

        let mut file = HotFile::new(&path);
        assert_eq!(file.poll(), FileStatus::Unchanged);

        touch(&path, 20);
        assert_eq!(file.poll(), FileStatus::Changed);
        assert_eq!(file.poll(), FileStatus::Unchanged);
    }

    #[test]
    fn test_hot_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libplugin.so");

        let mut file = HotFile::new(&path);
        assert_eq!(file.poll(), FileStatus::Missing);

        touch(&path, 10);
        assert_eq!(file.poll(), FileStatus::Changed);

        fs::remove_file(&path).unwrap();
        assert_eq!(file.poll(), FileStatus::Missing);

        // Restoring the same mtime is not a change.
        touch(&path, 10);
        assert_eq!(file.poll(), FileStatus::Unchanged);
    }

    #[test]
    fn test_hot_file_settle_defers_fresh_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libplugin.so");
        touch(&path, 10);

        let mut file = HotFile::new(&path).with_settle(Some(Duration::from_secs(3600)));
        fs::write(&path, b"rebuilt").unwrap();
        assert_eq!(file.poll(), FileStatus::Unchanged);

        touch(&path, 7200);
        assert_eq!(file.poll(), FileStatus::Changed);
    }

    #[test]
    fn test_directory_added_modified_removed() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.so");
        let b = dir.path().join("b.so");
        touch(&a, 10);
        touch(&b, 10);
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut watcher = DirectoryWatcher::new(dir.path(), ["so"]);
        let first = watcher.poll();
        assert_eq!(first.added, BTreeSet::from([a.clone(), b.clone()]));
        assert!(first.modified.is_empty());
        assert_eq!(watcher.tracked(), 2);

        assert!(watcher.poll().is_empty());

        touch(&a, 20);
        fs::remove_file(&b).unwrap();
        let second = watcher.poll();
        assert_eq!(second.modified, BTreeSet::from([a.clone()]));
        assert_eq!(second.removed, BTreeSet::from([b]));
        assert!(second.added.is_empty());
        assert_eq!(watcher.tracked(), 1);
    }

    #[test]
    fn test_directory_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested.so")).unwrap();

        let mut watcher = DirectoryWatcher::new(dir.path(), ["so"]);
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_directory_missing_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let watched = dir.path().join("endpoints");
        let mut watcher = DirectoryWatcher::new(&watched, ["so"]);

        assert!(watcher.poll().is_empty());

        fs::create_dir(&watched).unwrap();
        touch(&watched.join("hello.so"), 10);
        assert_eq!(watcher.poll().added.len(), 1);
    }

    #[test]
    fn test_directory_settle_defers_until_old_enough() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.so");
        fs::write(&fresh, b"half written").unwrap();

        let mut watcher =
            DirectoryWatcher::new(dir.path(), ["so"]).with_settle(Some(Duration::from_secs(3600)));
        assert!(watcher.poll().is_empty());
        assert_eq!(watcher.tracked(), 0);

        touch(&fresh, 7200);
        assert_eq!(watcher.poll().added, BTreeSet::from([fresh]));
    }

    #[test]
    fn test_rescan_reports_everything_as_added() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.so");
        touch(&a, 10);

        let mut watcher = DirectoryWatcher::new(dir.path(), ["so"]);
        watcher.poll();
        assert_eq!(watcher.rescan().added, BTreeSet::from([a]));
    }

    #[test]
    fn test_loadable_is_sorted() {
        let changes = DirectoryChanges {
            added: BTreeSet::from([PathBuf::from("/m/c.so")]),
            modified: BTreeSet::from([PathBuf::from("/m/a.so"), PathBuf::from("/m/d.so")]),
            removed: BTreeSet::new(),
        };

        let order: Vec<_> = changes.loadable().cloned().collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/m/a.so"),
                PathBuf::from("/m/c.so"),
                PathBuf::from("/m/d.so"),
            ]
        );
    }
}
