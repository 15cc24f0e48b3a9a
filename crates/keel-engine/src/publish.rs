//! Maven publication metadata: the publish plugin applied to every
//! publishable subproject, POM output and repository credentials.

use std::path::{Path, PathBuf};

use keel_config::manifest::{Manifest, PomOptions, Repository, Subproject};
use keel_util::maven::MavenCoordinate;
use keel_util::pom::{Developer, License, Pom, Scm};

use crate::configure::{Build, Project};
use crate::error::EngineError;

/// Gradle project property names the remote repository is handed over as.
pub const REPOSITORY_URL_PROPERTY: &str = "keelRepositoryUrl";
pub const REPOSITORY_USERNAME_PROPERTY: &str = "keelRepositoryUsername";
pub const REPOSITORY_PASSWORD_PROPERTY: &str = "keelRepositoryPassword";

/// Environment variables consulted when the manifest carries no credentials.
pub const USERNAME_ENV: &str = "USERNAME";
pub const PASSWORD_ENV: &str = "GITHUB_TOKEN";

/// A Maven publication registered on a subproject.
#[derive(Debug, Clone)]
pub struct MavenPublication {
    /// Publication name; the artifact id.
    pub name: String,
    pub pom: Pom,
}

/// Metadata shared by every publication of the workspace.
#[derive(Debug, Clone, Default)]
pub struct PublishingMetadata {
    pub group_id: String,
    pub version: String,
    pub project_url: String,
    pub license: License,
    pub scm: Scm,
    pub developer: Developer,
}

impl PublishingMetadata {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let p = &manifest.publishing;
        Self {
            group_id: p.group_id.clone(),
            version: manifest.workspace.version.clone(),
            project_url: p.url.clone(),
            license: License {
                name: p.license.name.clone(),
                url: p.license.url.clone(),
            },
            scm: Scm {
                connection: p.scm.connection.clone(),
                developer_connection: p.scm.developer_connection.clone(),
                url: p.scm.url.clone(),
            },
            developer: Developer {
                name: p.developer.name.clone(),
                email: p.developer.email.clone(),
                organization: p.developer.organization.clone(),
                organization_url: p.developer.organization_url.clone(),
            },
        }
    }
}

/// Register the subproject's publications and defer their POM setup until
/// the subproject has been fully configured.
///
/// # Errors
/// Returns `EngineError::UnknownSubproject` if the subproject was never added
/// to the build.
pub fn apply_publish_plugin(
    build: &mut Build,
    subproject: &Subproject,
    metadata: &PublishingMetadata,
) -> Result<(), EngineError> {
    let project = build
        .project_mut(&subproject.path)
        .ok_or_else(|| EngineError::UnknownSubproject {
            path: subproject.path.clone(),
        })?;

    for artifact_id in subproject.artifact_ids() {
        let coordinate =
            MavenCoordinate::new("", &artifact_id, &metadata.version).with_packaging("pom");
        project.publications.push(MavenPublication {
            name: artifact_id,
            pom: Pom::new(coordinate),
        });
    }

    let options = subproject.pom.clone();
    let metadata = metadata.clone();
    build.after_evaluate(
        &subproject.path,
        Box::new(move |project: &mut Project| configure_publication(project, &options, &metadata)),
    )
}

/// Copy the POM options and the shared metadata into every publication of
/// `project`. Nothing is validated; empty options become empty POM fields.
pub fn configure_publication(
    project: &mut Project,
    options: &PomOptions,
    metadata: &PublishingMetadata,
) {
    for publication in &mut project.publications {
        let pom = &mut publication.pom;
        pom.coordinate.group_id.clone_from(&metadata.group_id);
        pom.name.clone_from(&options.name);
        pom.description.clone_from(&options.description);
        pom.url.clone_from(&metadata.project_url);
        pom.licenses = vec![metadata.license.clone()];
        pom.scm = metadata.scm.clone();
        pom.developers = vec![metadata.developer.clone()];
    }
    tracing::debug!(
        project = %project.path,
        publications = project.publications.len(),
        "configured publications"
    );
}

/// Write the POM of every publication of `project` into the Maven
/// repository rooted at `repository`. Returns the written paths.
///
/// Publications without a group id have no place in the repository layout;
/// they are skipped with a warning.
///
/// # Errors
/// Returns an error if a coordinate is otherwise unusable as a repository
/// path or a file cannot be written.
pub fn write_poms(project: &Project, repository: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let mut written = Vec::with_capacity(project.publications.len());
    for publication in &project.publications {
        let coordinate = &publication.pom.coordinate;
        if coordinate.group_id.trim().is_empty() {
            tracing::warn!(
                project = %project.path,
                publication = %publication.name,
                "group_id is empty, skipping POM; set `group_id` under [publishing] in keel.toml"
            );
            continue;
        }
        coordinate.validate()?;
        let path = coordinate.path_in(repository);
        keel_util::fs::write_atomic(&path, publication.pom.to_xml().as_bytes())?;
        tracing::info!(pom = %path.display(), "wrote POM");
        written.push(path);
    }
    Ok(written)
}

/// Credentials for the remote repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Prefer values from the manifest, then `USERNAME` and `GITHUB_TOKEN`.
    /// Missing values stay `None`; the repository reports bad credentials.
    pub fn resolve(repository: &Repository, env: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            username: repository.username.clone().or_else(|| env(USERNAME_ENV)),
            password: repository.password.clone().or_else(|| env(PASSWORD_ENV)),
        }
    }

    /// Environment handing the repository to a Gradle build as project
    /// properties (`ORG_GRADLE_PROJECT_<name>`).
    pub fn gradle_env(&self, url: &str) -> Vec<(String, String)> {
        let mut env = vec![(gradle_property_env(REPOSITORY_URL_PROPERTY), url.to_owned())];
        if let Some(user) = &self.username {
            env.push((gradle_property_env(REPOSITORY_USERNAME_PROPERTY), user.clone()));
        }
        if let Some(password) = &self.password {
            env.push((gradle_property_env(REPOSITORY_PASSWORD_PROPERTY), password.clone()));
        }
        env
    }
}

fn gradle_property_env(property: &str) -> String {
    format!("ORG_GRADLE_PROJECT_{property}")
}
