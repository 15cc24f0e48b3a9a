//! Workspace scaffolding for `keel init`.

use std::path::{Path, PathBuf};

use keel_config::manifest::{
    LicenseInfo, Manifest, PomOptions, Publishing, Subproject, Tasks, Workspace,
};

use crate::error::EngineError;

/// Subprojects of a freshly initialized workspace, and whether each one
/// publishes.
const DEFAULT_SUBPROJECTS: [(&str, bool); 3] = [
    ("packages", true),
    ("examples/kmm-sample", false),
    ("benchmarks", false),
];

/// Scaffold a `keel.toml` in `dir` for a workspace called `name`.
///
/// The manifest lists the default subprojects and an Apache-2.0 license;
/// the remaining publishing identity (group id, SCM, developer) is left
/// empty for the user to fill in. Returns the path of the written manifest.
///
/// # Errors
/// Returns an error if a `keel.toml` already exists in `dir`, or the
/// directory or manifest cannot be written.
pub fn init_workspace(dir: &Path, name: &str) -> Result<PathBuf, EngineError> {
    let manifest_path = dir.join("keel.toml");
    if manifest_path.exists() {
        return Err(EngineError::WorkspaceExists {
            path: manifest_path.display().to_string(),
        });
    }

    keel_util::fs::ensure_dir(dir)?;

    let manifest = Manifest {
        workspace: Workspace {
            name: name.to_owned(),
            version: "0.1.0".to_owned(),
            entrypoint: "./gradlew".to_owned(),
        },
        tasks: Tasks::default(),
        publishing: Publishing {
            license: LicenseInfo {
                name: "The Apache License, Version 2.0".to_owned(),
                url: "https://www.apache.org/licenses/LICENSE-2.0.txt".to_owned(),
            },
            ..Publishing::default()
        },
        subprojects: DEFAULT_SUBPROJECTS
            .iter()
            .map(|(path, publish)| Subproject {
                path: (*path).to_owned(),
                publish: *publish,
                publications: Vec::new(),
                pom: PomOptions {
                    name: if *publish { name.to_owned() } else { String::new() },
                    description: String::new(),
                },
            })
            .collect(),
    };

    let content = manifest.to_toml()?;
    std::fs::write(&manifest_path, content).map_err(|source| EngineError::Io {
        path: manifest_path.display().to_string(),
        source,
    })?;
    tracing::info!(manifest = %manifest_path.display(), "initialized workspace");
    Ok(manifest_path)
}
