use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory names that never hold hand-written sources.
const FORBIDDEN_DIRS: &[&str] = &["node_modules", ".git", ".next", "dist", "build"];

/// Workspace safety checks to keep jobs from editing files outside the project
/// or inside dependency and build output directories.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical path to workspace root
    workspace_root: PathBuf,
    /// Directory names rejected anywhere below the root
    forbidden_dirs: Vec<String>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: String },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}

impl WorkspaceGuard {
    /// Create a guard rooted at `workspace_root` (canonicalized, so symlinks resolve).
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Self::with_forbidden(
            workspace_root,
            FORBIDDEN_DIRS.iter().map(|d| d.to_string()).collect(),
        )
    }

    /// Create a guard with a custom list of forbidden directory names.
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden_dirs: Vec<String>,
    ) -> Result<Self, SafetyError> {
        Ok(Self {
            workspace_root: canonicalize(workspace_root.as_ref())?,
            forbidden_dirs,
        })
    }

    /// Check if a path is safe to edit.
    ///
    /// Relative paths resolve against the workspace root. Returns the
    /// canonical absolute path if safe.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let canonical = canonicalize(&absolute)?;

        let Ok(relative) = canonical.strip_prefix(&self.workspace_root) else {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical,
                workspace: self.workspace_root.clone(),
            });
        };

        let hit = relative.components().find_map(|component| match component {
            Component::Normal(name) => self
                .forbidden_dirs
                .iter()
                .find(|forbidden| name == forbidden.as_str())
                .cloned(),
            _ => None,
        });
        if let Some(forbidden) = hit {
            return Err(SafetyError::ForbiddenPath {
                path: canonical,
                forbidden,
            });
        }

        Ok(canonical)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}
