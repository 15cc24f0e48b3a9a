//! Maven coordinates and repository layout.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// A Maven coordinate identifying a single published file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenCoordinate {
    /// Maven group identifier, e.g. `"io.realm.kotlin"`.
    pub group_id: String,
    /// Maven artifact identifier, e.g. `"library-base"`.
    pub artifact_id: String,
    /// Artifact version, e.g. `"1.0.0"`.
    pub version: String,
    /// File extension / packaging type (defaults to `"jar"`).
    pub packaging: String,
}

impl MavenCoordinate {
    /// Create a new coordinate with default packaging ("jar").
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_owned(),
            artifact_id: artifact_id.to_owned(),
            version: version.to_owned(),
            packaging: "jar".to_owned(),
        }
    }

    /// Builder method to override the packaging type.
    pub fn with_packaging(mut self, packaging: &str) -> Self {
        self.packaging = packaging.to_owned();
        self
    }

    /// Check that every part is non-empty and safe to use as a path component.
    ///
    /// # Errors
    /// Returns `UtilError::InvalidMavenCoordinate` naming the first bad part.
    pub fn validate(&self) -> Result<(), UtilError> {
        let parts = [
            ("group_id", &self.group_id),
            ("artifact_id", &self.artifact_id),
            ("version", &self.version),
            ("packaging", &self.packaging),
        ];
        for (label, value) in parts {
            let reason = if value.is_empty() {
                Some(format!("{label} is empty"))
            } else if value.contains(['/', '\\', ':']) || value.contains("..") {
                Some(format!("{label} \"{value}\" contains a path separator"))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(UtilError::InvalidMavenCoordinate {
                    coordinate: self.to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// The filename for this artifact: `"{artifact_id}-{version}.{packaging}"`.
    pub fn filename(&self) -> String {
        format!("{}-{}.{}", self.artifact_id, self.version, self.packaging)
    }

    /// The repository-relative path for this artifact.
    ///
    /// Dots in `group_id` are replaced with `/`, then:
    /// `"{group_path}/{artifact_id}/{version}/{filename}"`.
    pub fn repository_path(&self) -> String {
        let group_path = self.group_id.replace('.', "/");
        format!(
            "{}/{}/{}/{}",
            group_path,
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Path of this artifact inside a file-based repository rooted at `repo_root`.
    pub fn path_in(&self, repo_root: &Path) -> PathBuf {
        let mut path = repo_root.to_path_buf();
        for segment in self.group_id.split('.') {
            path.push(segment);
        }
        path.join(&self.artifact_id)
            .join(&self.version)
            .join(self.filename())
    }
}

impl std::fmt::Display for MavenCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}
