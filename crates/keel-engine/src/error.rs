//! Error types for keel-engine.

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] keel_util::error::UtilError),

    /// A manifest operation failed.
    #[error("{0}")]
    Manifest(#[from] keel_config::manifest::ManifestError),

    /// Two registrations produced the same task name.
    #[error("cannot add task `{name}` as a task with that name already exists — check for subproject paths that derive the same name")]
    DuplicateTask { name: String },

    /// A task depends on a name nothing registered.
    #[error("task `{task}` depends on `{dependency}`, which is not a registered task")]
    UnknownDependency { task: String, dependency: String },

    /// A requested task does not exist.
    #[error("task `{name}` not found{hint} — run `keel tasks --all` to list tasks")]
    UnknownTask { name: String, hint: String },

    /// A requested abbreviation matches several tasks.
    #[error("task `{name}` is ambiguous — candidates are: {candidates}")]
    AmbiguousTask { name: String, candidates: String },

    /// The prerequisites of a task loop back to it.
    #[error("circular task dependency: {cycle}")]
    TaskCycle { cycle: String },

    /// A subproject path is not declared in keel.toml.
    #[error("no subproject `{path}` in keel.toml")]
    UnknownSubproject { path: String },

    /// A subproject is excluded from publishing.
    #[error("subproject `{path}` is not published — set `publish = true` in its [[subproject]] entry")]
    NotPublished { path: String },

    /// A workspace already exists at the target path.
    #[error("keel.toml already exists at {path} — cannot initialize over an existing workspace")]
    WorkspaceExists { path: String },

    /// The worker pool could not be created.
    #[error("cannot start task workers: {message}")]
    WorkerPool { message: String },
}
