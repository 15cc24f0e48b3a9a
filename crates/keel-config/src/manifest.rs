use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::kind::TaskKind;

/// The `keel.toml` workspace manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub workspace: Workspace,
    #[serde(default)]
    pub tasks: Tasks,
    #[serde(default)]
    pub publishing: Publishing,
    /// Subprojects in declaration order.
    #[serde(default, rename = "subproject")]
    pub subprojects: Vec<Subproject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Workspace {
    pub name: String,
    /// Version stamped on every publication.
    #[serde(default = "default_version")]
    pub version: String,
    /// Build entry point each subproject is driven through.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,
}

fn default_version() -> String {
    "0.1.0".to_owned()
}

fn default_entrypoint() -> String {
    "./gradlew".to_owned()
}

/// Per-kind overrides under `[tasks.<kind>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tasks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<TaskOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TaskOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze: Option<TaskOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<TaskOverride>,
    #[serde(
        default,
        rename = "publish-remote",
        skip_serializing_if = "Option::is_none"
    )]
    pub publish_remote: Option<TaskOverride>,
}

impl Tasks {
    fn get(&self, kind: TaskKind) -> Option<&TaskOverride> {
        match kind {
            TaskKind::Check => self.check.as_ref(),
            TaskKind::Format => self.format.as_ref(),
            TaskKind::Analyze => self.analyze.as_ref(),
            TaskKind::Publish => self.publish.as_ref(),
            TaskKind::PublishRemote => self.publish_remote.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskOverride {
    /// Aggregate task name; per-subproject tasks use it as their prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments passed to the entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

/// Effective naming and command for one task kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSettings {
    pub kind: TaskKind,
    pub name: String,
    pub args: Vec<String>,
}

/// Metadata shared by every publication in the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Publishing {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub url: String,
    /// Local Maven repository, relative to the workspace root.
    /// Defaults to `~/.m2/repository`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<String>,
    #[serde(default)]
    pub license: LicenseInfo,
    #[serde(default)]
    pub scm: ScmInfo,
    #[serde(default)]
    pub developer: DeveloperInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScmInfo {
    #[serde(default)]
    pub connection: String,
    #[serde(default)]
    pub developer_connection: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeveloperInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub organization_url: String,
}

/// A remote Maven repository for `publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Repository {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subproject {
    /// Directory relative to the workspace root, `/`-separated.
    pub path: String,
    /// Whether the subproject takes part in publishing.
    #[serde(default = "default_publish")]
    pub publish: bool,
    /// Artifact ids published by this subproject.
    /// Defaults to the last path segment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publications: Vec<String>,
    #[serde(default)]
    pub pom: PomOptions,
}

fn default_publish() -> bool {
    true
}

impl Subproject {
    /// Artifact ids of this subproject's publications.
    pub fn artifact_ids(&self) -> Vec<String> {
        if self.publications.is_empty() {
            let last = self.path.rsplit('/').next().unwrap_or(&self.path);
            vec![last.to_owned()]
        } else {
            self.publications.clone()
        }
    }
}

/// POM fields that differ between subprojects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PomOptions {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Manifest {
    /// Read, parse and validate a `keel.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate manifest text. `origin` names the source in errors.
    ///
    /// # Errors
    /// Returns an error if the text is invalid TOML or fails validation.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: origin.to_owned(),
            source: e,
        })?;
        manifest.validate().map_err(|reason| ManifestError::Invalid {
            path: origin.to_owned(),
            reason,
        })?;
        Ok(manifest)
    }

    /// Serialize the manifest to a TOML string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        toml::to_string_pretty(self).map_err(|source| ManifestError::Serialize { source })
    }

    /// Effective settings for a task kind, with `[tasks]` overrides applied.
    pub fn task_settings(&self, kind: TaskKind) -> TaskSettings {
        let ov = self.tasks.get(kind);
        let name = ov
            .and_then(|o| o.name.clone())
            .unwrap_or_else(|| kind.default_name().to_owned());
        let args = ov
            .and_then(|o| o.args.clone())
            .unwrap_or_else(|| vec![kind.default_name().to_owned()]);
        TaskSettings { kind, name, args }
    }

    /// Look up a subproject by its path.
    pub fn subproject(&self, path: &str) -> Option<&Subproject> {
        let wanted = path.trim_end_matches('/');
        self.subprojects.iter().find(|s| s.path == wanted)
    }

    fn validate(&self) -> Result<(), String> {
        if self.workspace.name.trim().is_empty() {
            return Err("workspace.name must not be empty".to_owned());
        }
        if self.workspace.entrypoint.trim().is_empty() {
            return Err("workspace.entrypoint must not be empty".to_owned());
        }
        if self.subprojects.is_empty() {
            return Err("no [[subproject]] entries — declare at least one subproject".to_owned());
        }

        let mut seen = HashSet::new();
        for sub in &self.subprojects {
            validate_subproject_path(&sub.path)?;
            if !seen.insert(sub.path.as_str()) {
                return Err(format!("subproject \"{}\" is declared twice", sub.path));
            }
            if sub.publications.iter().any(|p| p.trim().is_empty()) {
                return Err(format!(
                    "subproject \"{}\" has an empty publication name",
                    sub.path
                ));
            }
        }

        for kind in TaskKind::ALL {
            let settings = self.task_settings(kind);
            if settings.name.trim().is_empty() {
                return Err(format!("tasks.{kind}.name must not be empty"));
            }
        }

        if let Some(repo) = &self.publishing.repository {
            if repo.url.trim().is_empty() {
                return Err("publishing.repository.url must not be empty".to_owned());
            }
        }
        Ok(())
    }
}

fn validate_subproject_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("subproject path must not be empty".to_owned());
    }
    if path.starts_with('/') || Path::new(path).is_absolute() {
        return Err(format!(
            "subproject path \"{path}\" must be relative to the workspace root"
        ));
    }
    for segment in path.split('/') {
        match segment {
            "" => {
                return Err(format!(
                    "subproject path \"{path}\" contains an empty segment"
                ))
            }
            "." | ".." => {
                return Err(format!(
                    "subproject path \"{path}\" must not contain `.` or `..` segments"
                ))
            }
            _ => {}
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid keel.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid keel.toml at {path}: {reason}")]
    Invalid { path: String, reason: String },
    #[error("cannot serialize keel.toml: {source}")]
    Serialize { source: toml::ser::Error },
}
