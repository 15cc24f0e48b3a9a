//! The configuration phase: register every task of the workspace, run the
//! after-evaluate hooks, and freeze the result into a [`TaskGraph`].

use std::path::{Path, PathBuf};

use keel_config::kind::TaskKind;
use keel_config::manifest::{Manifest, TaskSettings};

use crate::error::EngineError;
use crate::naming::{gradle_project_path, subproject_task_name};
use crate::publish::{apply_publish_plugin, Credentials, MavenPublication, PublishingMetadata};
use crate::registry::{TaskGraph, TaskRegistry};
use crate::task::{ExecSpec, Task, TaskAction};

/// A callback run once a subproject's configuration is complete.
pub type AfterEvaluate = Box<dyn FnOnce(&mut Project)>;

/// A subproject under configuration.
#[derive(Debug, Clone)]
pub struct Project {
    /// Path relative to the workspace root, e.g. `examples/kmm-sample`.
    pub path: String,
    /// Gradle project path, e.g. `:examples:kmm-sample`.
    pub gradle_path: String,
    /// Absolute directory of the subproject.
    pub dir: PathBuf,
    pub publications: Vec<MavenPublication>,
}

impl Project {
    pub fn new(root: &Path, path: &str) -> Self {
        Self {
            path: path.to_owned(),
            gradle_path: gradle_project_path(path),
            dir: root.join(path),
            publications: Vec::new(),
        }
    }
}

/// A build being configured.
pub struct Build {
    root: PathBuf,
    registry: TaskRegistry,
    projects: Vec<Project>,
    hooks: Vec<(usize, AfterEvaluate)>,
}

impl Build {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            registry: TaskRegistry::new(),
            projects: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_mut(&mut self) -> &mut TaskRegistry {
        &mut self.registry
    }

    /// Add a subproject to the build. Adding the same path twice is a no-op.
    pub fn add_project(&mut self, path: &str) {
        if self.projects.iter().all(|p| p.path != path) {
            self.projects.push(Project::new(&self.root, path));
        }
    }

    pub fn project_mut(&mut self, path: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.path == path)
    }

    /// Queue `hook` to run against the subproject after configuration.
    /// Hooks run in the order they were queued.
    ///
    /// # Errors
    /// Returns `EngineError::UnknownSubproject` if the path was never added.
    pub fn after_evaluate(&mut self, path: &str, hook: AfterEvaluate) -> Result<(), EngineError> {
        let index = self
            .projects
            .iter()
            .position(|p| p.path == path)
            .ok_or_else(|| EngineError::UnknownSubproject {
                path: path.to_owned(),
            })?;
        self.hooks.push((index, hook));
        Ok(())
    }

    /// End the configuration phase: run the hooks, then freeze the registry.
    ///
    /// # Errors
    /// Returns an error if a task depends on an unregistered name.
    pub fn evaluate(self) -> Result<TaskGraph, EngineError> {
        let Build {
            registry,
            mut projects,
            hooks,
            ..
        } = self;

        tracing::debug!(hooks = hooks.len(), "running after-evaluate hooks");
        for (index, hook) in hooks {
            if let Some(project) = projects.get_mut(index) {
                hook(project);
            }
        }
        registry.freeze(projects)
    }
}

/// Register the aggregate task of a kind, depending on the kind's task in
/// each of `paths`, in order.
///
/// # Errors
/// Returns `EngineError::DuplicateTask` if the aggregate name is taken.
pub fn register_aggregate_tasks(
    registry: &mut TaskRegistry,
    paths: &[&str],
    settings: &TaskSettings,
) -> Result<(), EngineError> {
    let depends_on = paths
        .iter()
        .map(|p| subproject_task_name(&settings.name, p))
        .collect();
    let description = if settings.name == settings.kind.default_name() {
        settings.kind.aggregate_description()
    } else {
        format!("Runs {} on all projects.", settings.name)
    };
    registry.register(Task::aggregate(
        &settings.name,
        &description,
        settings.kind.group(),
        depends_on,
    ))
}

/// The delegated command of a per-subproject task.
#[derive(Debug, Clone)]
pub struct DelegatedCommand {
    /// Build entry point, e.g. `./gradlew`; relative paths resolve against
    /// the subproject directory.
    pub entrypoint: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

fn subproject_task(root: &Path, path: &str, prefix: &str, command: &DelegatedCommand) -> Task {
    let working_dir = root.join(path);
    let spec = ExecSpec {
        program: resolve_program(&command.entrypoint, &working_dir),
        args: command.args.clone(),
        working_dir,
        env: command.env.clone(),
    };
    Task {
        name: subproject_task_name(prefix, path),
        description: format!("Run {} on /{path} project", command.args.join(" ")),
        group: None,
        depends_on: Vec::new(),
        actions: vec![TaskAction::Exec(spec)],
    }
}

/// Register the task that runs `command` inside the subproject at `path`,
/// followed by `then` once the command succeeds. Nothing runs until the task
/// is executed.
///
/// # Errors
/// Returns `EngineError::DuplicateTask` if the derived name is taken.
pub fn register_subproject_task(
    registry: &mut TaskRegistry,
    root: &Path,
    path: &str,
    prefix: &str,
    command: &DelegatedCommand,
    then: Vec<TaskAction>,
) -> Result<(), EngineError> {
    let mut task = subproject_task(root, path, prefix, command);
    task.actions.extend(then);
    registry.register(task)
}

/// Entry points with a path separator resolve against the working directory,
/// bare names are looked up on `PATH` when spawned.
fn resolve_program(entrypoint: &str, working_dir: &Path) -> String {
    let path = Path::new(entrypoint);
    if path.is_absolute() || !entrypoint.contains(['/', '\\']) {
        return entrypoint.to_owned();
    }
    let relative = path.strip_prefix("./").unwrap_or(path);
    working_dir.join(relative).display().to_string()
}

/// Run the configuration phase for a workspace and return its task graph.
///
/// `env` supplies environment variables (home directory, credentials).
/// Nothing here requires them: a local Maven repository that cannot be
/// located only fails the local publish tasks once they run.
///
/// # Errors
/// Returns an error on duplicate or dangling task names.
pub fn configure(
    root: &Path,
    manifest: &Manifest,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<TaskGraph, EngineError> {
    let mut build = Build::new(root);
    let repository = manifest.publishing.repository.as_ref();

    let kinds: Vec<TaskKind> = TaskKind::ALL
        .into_iter()
        .filter(|k| *k != TaskKind::PublishRemote || repository.is_some())
        .collect();

    let all_paths: Vec<&str> = manifest.subprojects.iter().map(|s| s.path.as_str()).collect();
    let published_paths: Vec<&str> = manifest
        .subprojects
        .iter()
        .filter(|s| s.publish)
        .map(|s| s.path.as_str())
        .collect();

    for kind in &kinds {
        let settings = manifest.task_settings(*kind);
        let paths = if kind.publishing() {
            &published_paths
        } else {
            &all_paths
        };
        register_aggregate_tasks(build.registry_mut(), paths, &settings)?;
    }

    let local_repository = if published_paths.is_empty() {
        None
    } else {
        local_repository(root, manifest, env)
    };
    let remote_env = repository
        .map(|repo| Credentials::resolve(repo, env).gradle_env(&repo.url))
        .unwrap_or_default();

    for sub in &manifest.subprojects {
        build.add_project(&sub.path);
        for kind in &kinds {
            if kind.publishing() && !sub.publish {
                continue;
            }
            let settings = manifest.task_settings(*kind);
            let command = DelegatedCommand {
                entrypoint: manifest.workspace.entrypoint.clone(),
                args: settings.args.clone(),
                env: if *kind == TaskKind::PublishRemote {
                    remote_env.clone()
                } else {
                    Vec::new()
                },
            };
            let then = if *kind == TaskKind::Publish {
                vec![TaskAction::WritePoms {
                    project: sub.path.clone(),
                    repository: local_repository.clone(),
                }]
            } else {
                Vec::new()
            };
            register_subproject_task(
                build.registry_mut(),
                root,
                &sub.path,
                &settings.name,
                &command,
                then,
            )?;
        }
    }

    let metadata = PublishingMetadata::from_manifest(manifest);
    for sub in manifest.subprojects.iter().filter(|s| s.publish) {
        apply_publish_plugin(&mut build, sub, &metadata)?;
    }

    tracing::debug!(
        root = %root.display(),
        subprojects = manifest.subprojects.len(),
        "configuration complete"
    );
    build.evaluate()
}

fn local_repository(
    root: &Path,
    manifest: &Manifest,
    env: &dyn Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    if let Some(dir) = &manifest.publishing.local_repository {
        return Some(root.join(dir));
    }
    match keel_util::fs::maven_local_repository(env) {
        Ok(repo) => Some(repo),
        Err(e) => {
            tracing::warn!(error = %e, "no local Maven repository; local publish tasks will fail");
            None
        }
    }
}
