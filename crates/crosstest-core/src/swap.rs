//! Test directory swapping with guaranteed restoration.
//!
//! A [`SwapTransaction`] moves the subject's test directory to a sibling
//! backup path, copies the foreign tests into its place, and puts the
//! original back on [`SwapTransaction::close`]. If the transaction is dropped
//! while still active (early return, panic, cancelled future) the restore
//! runs from `Drop` and any failure is logged.
//!
//! [`with_swapped_tests`] wraps the whole sequence around an async action.

use crate::error::SwapError;
use crate::obs;
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub type Result<T> = std::result::Result<T, SwapError>;

/// Lifecycle of a [`SwapTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    /// Nothing has been moved.
    NotStarted,

    /// Backup exists and the subject path holds the foreign tests.
    Active,

    /// Backup is gone and the subject path holds its own tests again.
    Closed,

    /// Restoration failed; the subject's tree needs manual repair.
    Corrupted,
}

/// One swap of a subject's test directory.
#[derive(Debug)]
pub struct SwapTransaction {
    subject: PathBuf,
    backup: PathBuf,
    source: PathBuf,
    state: SwapState,
}

impl SwapTransaction {
    pub fn new(subject: impl Into<PathBuf>, source: impl Into<PathBuf>, backup_suffix: &str) -> Self {
        let subject = subject.into();
        let backup = backup_path(&subject, backup_suffix);
        Self {
            subject,
            backup,
            source: source.into(),
            state: SwapState::NotStarted,
        }
    }

    pub fn subject(&self) -> &Path {
        &self.subject
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn state(&self) -> SwapState {
        self.state
    }

    /// Back up the subject's tests and copy the source's tests into place.
    ///
    /// On a copy failure the original is restored before returning
    /// [`SwapError::Substitute`], or [`SwapError::RestoreFailed`] if that
    /// restore fails too. A transaction swaps once: `begin` is a no-op while
    /// active and fails with [`SwapError::AlreadyFinished`] after `close`.
    pub fn begin(&mut self) -> Result<()> {
        match self.state {
            SwapState::NotStarted => {}
            SwapState::Active => return Ok(()),
            SwapState::Closed | SwapState::Corrupted => {
                return Err(SwapError::AlreadyFinished {
                    path: self.subject.clone(),
                });
            }
        }

        if self.backup.exists() {
            return Err(SwapError::BackupCollision {
                backup: self.backup.clone(),
            });
        }
        if !self.subject.is_dir() {
            return Err(SwapError::SubjectMissing {
                path: self.subject.clone(),
            });
        }

        std::fs::rename(&self.subject, &self.backup).map_err(|source| SwapError::Backup {
            path: self.subject.clone(),
            source,
        })?;
        self.state = SwapState::Active;
        debug!(subject = %self.subject.display(), backup = %self.backup.display(), "Backed up tests");

        let copied = std::fs::create_dir_all(&self.subject)
            .and_then(|_| copy_dir_contents(&self.source, &self.subject));

        if let Err(source) = copied {
            self.restore()?;
            return Err(SwapError::Substitute {
                from: self.source.clone(),
                source,
            });
        }

        debug!(source = %self.source.display(), subject = %self.subject.display(), "Substituted tests");
        Ok(())
    }

    /// Put the subject's own tests back. Does nothing unless active.
    pub fn close(&mut self) -> Result<()> {
        if self.state != SwapState::Active {
            return Ok(());
        }
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        let result = self.restore_inner();
        match &result {
            Ok(()) => {
                self.state = SwapState::Closed;
                debug!(subject = %self.subject.display(), "Restored tests");
            }
            Err(err) => {
                self.state = SwapState::Corrupted;
                obs::emit_restore_failed(&self.subject, &self.backup, err);
            }
        }
        result
    }

    fn restore_inner(&self) -> Result<()> {
        let fail = |source: std::io::Error| SwapError::RestoreFailed {
            path: self.subject.clone(),
            backup: self.backup.clone(),
            source,
        };

        if !self.backup.exists() {
            if self.subject.is_dir() {
                return Ok(());
            }
            return Err(fail(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "neither the backup nor the test directory exists",
            )));
        }

        match std::fs::symlink_metadata(&self.subject) {
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&self.subject).map_err(fail)?,
            Ok(_) => std::fs::remove_file(&self.subject).map_err(fail)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(fail(e)),
        }

        std::fs::rename(&self.backup, &self.subject).map_err(fail)
    }
}

impl Drop for SwapTransaction {
    fn drop(&mut self) {
        if self.state == SwapState::Active {
            // Errors are already logged by restore().
            let _ = self.restore();
        }
    }
}

/// Run `action` with `source`'s tests in place of `subject`'s.
///
/// The subject's tests are restored on every exit path before the action's
/// output is returned. A restore failure takes precedence over the output.
pub async fn with_swapped_tests<F, Fut, T>(
    subject: &Path,
    source: &Path,
    backup_suffix: &str,
    action: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let mut txn = SwapTransaction::new(subject, source, backup_suffix);
    txn.begin()?;
    let output = action().await;
    txn.close()?;
    Ok(output)
}

/// `<subject><suffix>`, a sibling of the subject directory.
pub fn backup_path(subject: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(subject.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy `src`'s contents into `dst`, overwriting files that already exist.
fn copy_dir_contents(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let path = entry.path();
        let rel = path.strip_prefix(src).unwrap_or(path);
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(path, &target)?;
        }
    }
    Ok(())
}
