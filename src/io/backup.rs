//! Backup, write, and post-write validation with all-or-nothing semantics.
//!
//! Each application runs the state machine
//! `PENDING -> BACKED_UP -> WRITTEN -> VALIDATED -> COMMITTED`, or lands in
//! `ROLLED_BACK` on any failure. Rollback is owned by a drop guard, so a
//! panic or a deadline expiry between stages still releases every partial
//! write before returning.

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::analyzers::analyzer_for;
use crate::config::SplitConfig;
use crate::core::{ComponentSpec, StructuralTree};
use crate::errors::{Result, SplitError};
use crate::io::traits::FileSystem;

/// Stages of one split application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitStage {
    Pending,
    BackedUp,
    Written,
    Validated,
    Committed,
    RolledBack,
}

/// What a committed application produced.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Components with their final written paths filled in.
    pub components: Vec<ComponentSpec>,
    pub backup_created: bool,
    pub backup_path: Option<PathBuf>,
    /// True only when post-write validation actually ran and passed; false
    /// when `validate_syntax` is disabled.
    pub validation_passed: bool,
}

pub struct BackupManager<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> BackupManager<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Apply the winning partition: snapshot, write, validate, commit.
    ///
    /// On any error the filesystem is restored to its pre-operation state
    /// before this returns: written components are deleted and, if a backup
    /// exists and the original file is present on disk, the original content
    /// is written back from the snapshot.
    pub fn apply_split(
        &self,
        file_path: &Path,
        original: &str,
        tree: &StructuralTree,
        components: &[ComponentSpec],
        config: &SplitConfig,
    ) -> Result<ApplyOutcome> {
        log::debug!("applying split: stage {:?}", SplitStage::Pending);
        let output_dir = self.output_dir(file_path, config);

        let backup_path = if config.create_backup {
            Some(self.create_backup(file_path, original, &output_dir, config)?)
        } else {
            None
        };
        let backup_created = backup_path.is_some();
        if backup_created {
            log::debug!("stage {:?}: {:?}", SplitStage::BackedUp, backup_path);
        }

        let mut guard = RollbackGuard::new(self.fs);
        if backup_created && self.fs.exists(file_path) {
            guard.restore_on_rollback(file_path.to_path_buf(), original.to_string());
        }

        self.fs
            .create_dir_all(&output_dir)
            .map_err(|e| SplitError::write(&output_dir, e.to_string()))?;

        let mut written = Vec::with_capacity(components.len());
        for component in components {
            let target = output_dir.join(&component.file_name);
            let content = component.render(tree);
            self.fs
                .write(&target, &content)
                .map_err(|e| SplitError::write(&target, e.to_string()))?;
            guard.track(target.clone());
            let mut finished = component.clone();
            finished.path = Some(target);
            written.push(finished);
        }
        log::debug!("stage {:?}: {} components", SplitStage::Written, written.len());

        if config.validate_syntax {
            let analyzer = analyzer_for(tree.language);
            for component in &written {
                let target = output_dir.join(&component.file_name);
                let content = self
                    .fs
                    .read_to_string(&target)
                    .map_err(|e| SplitError::validation(&target, e.to_string()))?;
                analyzer
                    .check_syntax(&content)
                    .map_err(|e| SplitError::validation(&target, e.to_string()))?;
            }
            log::debug!("stage {:?}", SplitStage::Validated);
        }

        guard.commit();
        log::info!(
            "split committed: {} components in {}",
            written.len(),
            output_dir.display()
        );
        Ok(ApplyOutcome {
            components: written,
            backup_created,
            backup_path,
            validation_passed: config.validate_syntax,
        })
    }

    fn output_dir(&self, file_path: &Path, config: &SplitConfig) -> PathBuf {
        if let Some(dir) = &config.output_dir {
            return dir.clone();
        }
        match file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Write the timestamped snapshot. Failure here aborts the whole
    /// operation before any component write.
    fn create_backup(
        &self,
        file_path: &Path,
        original: &str,
        output_dir: &Path,
        config: &SplitConfig,
    ) -> Result<PathBuf> {
        let backup_dir = config
            .backup_dir
            .clone()
            .unwrap_or_else(|| output_dir.to_path_buf());
        self.fs
            .create_dir_all(&backup_dir)
            .map_err(|e| SplitError::backup(&backup_dir, e.to_string()))?;

        let stem = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("original");
        let timestamp = Utc::now().format("%Y%m%d%H%M%S");
        let backup_path = backup_dir.join(format!("{stem}.{timestamp}.bak"));
        self.fs
            .write(&backup_path, original)
            .map_err(|e| SplitError::backup(&backup_path, e.to_string()))?;
        Ok(backup_path)
    }
}

/// Deletes tracked writes (and restores the original content) on every exit
/// path that did not commit.
struct RollbackGuard<'a> {
    fs: &'a dyn FileSystem,
    written: Vec<PathBuf>,
    restore: Option<(PathBuf, String)>,
    committed: bool,
}

impl<'a> RollbackGuard<'a> {
    fn new(fs: &'a dyn FileSystem) -> Self {
        Self {
            fs,
            written: Vec::new(),
            restore: None,
            committed: false,
        }
    }

    fn track(&mut self, path: PathBuf) {
        self.written.push(path);
    }

    fn restore_on_rollback(&mut self, path: PathBuf, content: String) {
        self.restore = Some((path, content));
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.written {
            if let Err(e) = self.fs.remove_file(path) {
                log::warn!("rollback could not remove {}: {e}", path.display());
            }
        }
        if let Some((path, content)) = &self.restore {
            if let Err(e) = self.fs.write(path, content) {
                log::warn!("rollback could not restore {}: {e}", path.display());
            }
        }
        log::debug!("stage {:?}", SplitStage::RolledBack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Language;
    use std::io;
    use tempfile::TempDir;

    use crate::io::real::RealFileSystem;

    fn tree_and_components(source: &str) -> (StructuralTree, Vec<ComponentSpec>) {
        let tree = analyzer_for(Language::Rust).analyze(source).unwrap();
        let mut first = ComponentSpec::new("out_part1.rs");
        let mut second = ComponentSpec::new("out_part2.rs");
        // Units: fn a, gap, fn b.
        first.unit_ids = vec![0];
        second.unit_ids = vec![2];
        (tree, vec![first, second])
    }

    #[test]
    fn commit_writes_components_and_backup() {
        let dir = TempDir::new().unwrap();
        let fs = RealFileSystem::new();
        let (tree, components) = tree_and_components("fn a() {}\n\nfn b() {}\n");
        let config = SplitConfig {
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let outcome = BackupManager::new(&fs)
            .apply_split(Path::new("out.rs"), "fn a() {}\n\nfn b() {}\n", &tree, &components, &config)
            .unwrap();

        assert!(outcome.backup_created);
        assert!(outcome.validation_passed);
        assert!(dir.path().join("out_part1.rs").exists());
        assert!(dir.path().join("out_part2.rs").exists());
        let backup = outcome.backup_path.unwrap();
        assert!(backup.exists());
        assert_eq!(
            fs.read_to_string(&backup).unwrap(),
            "fn a() {}\n\nfn b() {}\n"
        );
    }

    #[test]
    fn disabled_validation_is_reported_as_not_passed() {
        let dir = TempDir::new().unwrap();
        let fs = RealFileSystem::new();
        let (tree, components) = tree_and_components("fn a() {}\n\nfn b() {}\n");
        let config = SplitConfig {
            output_dir: Some(dir.path().to_path_buf()),
            create_backup: false,
            validate_syntax: false,
            ..Default::default()
        };

        let outcome = BackupManager::new(&fs)
            .apply_split(
                Path::new("out.rs"),
                "fn a() {}\n\nfn b() {}\n",
                &tree,
                &components,
                &config,
            )
            .unwrap();

        assert!(!outcome.validation_passed);
        assert!(dir.path().join("out_part1.rs").exists());
    }

    #[test]
    fn validation_failure_rolls_back_all_components() {
        let dir = TempDir::new().unwrap();
        let fs = RealFileSystem::new();
        // A hand-built tree whose single section renders as invalid Rust, so
        // the post-write syntax check must trip and undo the write.
        let bad_tree = StructuralTree::new(Language::Rust, "fn a() {}\nfn broken( {\n", vec![]);
        let mut first = ComponentSpec::new("bad_part1.rs");
        first.unit_ids = vec![0];
        let config = SplitConfig {
            output_dir: Some(dir.path().to_path_buf()),
            create_backup: false,
            ..Default::default()
        };

        let err = BackupManager::new(&fs)
            .apply_split(
                Path::new("bad.rs"),
                bad_tree.source(),
                &bad_tree,
                &[first],
                &config,
            )
            .unwrap_err();
        assert!(matches!(err, SplitError::Validation { .. }));
        assert!(!dir.path().join("bad_part1.rs").exists());
    }

    #[test]
    fn write_failure_removes_prior_writes() {
        struct FailSecondWrite {
            inner: RealFileSystem,
            count: std::sync::atomic::AtomicUsize,
        }
        impl FileSystem for FailSecondWrite {
            fn read_to_string(&self, path: &Path) -> io::Result<String> {
                self.inner.read_to_string(path)
            }
            fn write(&self, path: &Path, content: &str) -> io::Result<()> {
                let n = self
                    .count
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 1 {
                    return Err(io::Error::other("injected fault"));
                }
                self.inner.write(path, content)
            }
            fn exists(&self, path: &Path) -> bool {
                self.inner.exists(path)
            }
            fn remove_file(&self, path: &Path) -> io::Result<()> {
                self.inner.remove_file(path)
            }
            fn create_dir_all(&self, path: &Path) -> io::Result<()> {
                self.inner.create_dir_all(path)
            }
        }

        let dir = TempDir::new().unwrap();
        let fs = FailSecondWrite {
            inner: RealFileSystem::new(),
            count: std::sync::atomic::AtomicUsize::new(0),
        };
        let (tree, components) = tree_and_components("fn a() {}\n\nfn b() {}\n");
        let config = SplitConfig {
            output_dir: Some(dir.path().to_path_buf()),
            create_backup: false,
            ..Default::default()
        };

        let err = BackupManager::new(&fs)
            .apply_split(
                Path::new("out.rs"),
                "fn a() {}\n\nfn b() {}\n",
                &tree,
                &components,
                &config,
            )
            .unwrap_err();
        assert!(matches!(err, SplitError::Write { .. }));
        assert!(!dir.path().join("out_part1.rs").exists());
        assert!(!dir.path().join("out_part2.rs").exists());
    }

    #[test]
    fn backup_failure_aborts_before_any_write() {
        struct NoBackupDir {
            inner: RealFileSystem,
        }
        impl FileSystem for NoBackupDir {
            fn read_to_string(&self, path: &Path) -> io::Result<String> {
                self.inner.read_to_string(path)
            }
            fn write(&self, path: &Path, content: &str) -> io::Result<()> {
                if path.extension().is_some_and(|e| e == "bak") {
                    return Err(io::Error::other("backup volume offline"));
                }
                self.inner.write(path, content)
            }
            fn exists(&self, path: &Path) -> bool {
                self.inner.exists(path)
            }
            fn remove_file(&self, path: &Path) -> io::Result<()> {
                self.inner.remove_file(path)
            }
            fn create_dir_all(&self, path: &Path) -> io::Result<()> {
                self.inner.create_dir_all(path)
            }
        }

        let dir = TempDir::new().unwrap();
        let fs = NoBackupDir {
            inner: RealFileSystem::new(),
        };
        let (tree, components) = tree_and_components("fn a() {}\n\nfn b() {}\n");
        let config = SplitConfig {
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let err = BackupManager::new(&fs)
            .apply_split(
                Path::new("out.rs"),
                "fn a() {}\n\nfn b() {}\n",
                &tree,
                &components,
                &config,
            )
            .unwrap_err();
        assert!(matches!(err, SplitError::Backup { .. }));
        assert!(!dir.path().join("out_part1.rs").exists());
        assert!(!dir.path().join("out_part2.rs").exists());
    }
}
