//! Group discovery and project path resolution.
//!
//! Expected layout:
//!
//! ```text
//! <root>/<group>/<submission>/src/<test-like dir>
//! ```
//!
//! Directory entries are visited in lexicographic order so that the same
//! tree always yields the same groups and the same test directory.

use crate::config::{MatrixConfig, DEFAULT_BACKUP_SUFFIX};
use crate::domain::{Group, ProjectLocation};
use crate::error::ResolveError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub type Result<T> = std::result::Result<T, ResolveError>;

/// List the group directories directly under `root`, sorted by name.
pub fn list_groups(root: &Path) -> Result<Vec<Group>> {
    let groups = child_dirs(root)
        .map_err(|source| ResolveError::DirectoryNotFound {
            path: root.to_path_buf(),
            source,
        })?
        .into_iter()
        .map(|(name, path)| Group::new(name, path))
        .collect::<Vec<_>>();

    debug!(root = %root.display(), count = groups.len(), "Listed groups");
    Ok(groups)
}

/// Resolves a group's project root and test directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    project_dir: Option<String>,
    marker: String,
    backup_suffix: String,
}

impl PathResolver {
    pub fn new(project_dir: Option<String>, marker: impl Into<String>) -> Self {
        Self {
            project_dir,
            marker: marker.into(),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }

    /// Suffix of swap backups; such directories are never test candidates.
    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    pub fn from_config(config: &MatrixConfig) -> Self {
        Self::new(config.project_dir.clone(), config.test_dir_marker.clone())
            .with_backup_suffix(config.backup_suffix.clone())
    }

    /// Resolve `<group.root>/<submission>/src/<test dir>`.
    ///
    /// The marker match is a case-sensitive substring test. A match whose
    /// name differs from the marker is logged as a warning and still used.
    /// A leftover swap backup under `src` fails with
    /// [`ResolveError::LeftoverBackup`] since the group's own tests are not
    /// where they belong.
    pub fn resolve(&self, group: &Group) -> Result<ProjectLocation> {
        let project_root = self.project_root(group)?;
        let src_root = project_root.join("src");

        let candidates = child_dirs(&src_root).map_err(|source| ResolveError::DirectoryNotFound {
            path: src_root.clone(),
            source,
        })?;

        if let Some((_, backup)) = candidates
            .iter()
            .find(|(name, _)| self.is_backup(name))
        {
            return Err(ResolveError::LeftoverBackup {
                group: group.id.clone(),
                backup: backup.clone(),
            });
        }

        let (name, test_dir) = candidates
            .into_iter()
            .find(|(name, _)| name.contains(&self.marker))
            .ok_or_else(|| ResolveError::TestDirectoryMissing {
                group: group.id.clone(),
                marker: self.marker.clone(),
                src_root: src_root.clone(),
            })?;

        let naming_deviation = name != self.marker;
        if naming_deviation {
            warn!(
                group = %group.id,
                found = %name,
                expected = %self.marker,
                "Test directory name deviates from convention"
            );
        }

        Ok(ProjectLocation {
            project_root,
            src_root,
            test_dir,
            naming_deviation,
        })
    }

    fn is_backup(&self, name: &str) -> bool {
        !self.backup_suffix.is_empty()
            && name.len() > self.backup_suffix.len()
            && name.ends_with(&self.backup_suffix)
            && name.contains(&self.marker)
    }

    fn project_root(&self, group: &Group) -> Result<PathBuf> {
        if let Some(name) = &self.project_dir {
            let path = group.root.join(name);
            if path.is_dir() {
                return Ok(path);
            }
            return Err(ResolveError::SubmissionMissing {
                group: group.id.clone(),
                path,
            });
        }

        let mut dirs = child_dirs(&group.root).map_err(|source| ResolveError::DirectoryNotFound {
            path: group.root.clone(),
            source,
        })?;

        if dirs.len() > 1 {
            warn!(
                group = %group.id,
                count = dirs.len(),
                "Group has more than one submission directory, using the first"
            );
        }

        if dirs.is_empty() {
            return Err(ResolveError::SubmissionMissing {
                group: group.id.clone(),
                path: group.root.clone(),
            });
        }
        Ok(dirs.swap_remove(0).1)
    }
}

/// Child directories of `dir` as `(name, path)`, sorted by name.
fn child_dirs(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}
