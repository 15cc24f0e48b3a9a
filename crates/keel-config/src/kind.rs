//! The kinds of work Keel fans out to every subproject.

use std::fmt;

/// A family of tasks: one aggregate plus one delegating task per subproject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// ktlint verification.
    Check,
    /// ktlint auto-formatting.
    Format,
    /// detekt static analysis.
    Analyze,
    /// Publishing to the local Maven repository.
    Publish,
    /// Publishing to the configured remote Maven repository.
    PublishRemote,
}

impl TaskKind {
    /// Every kind, in registration order.
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Check,
        TaskKind::Format,
        TaskKind::Analyze,
        TaskKind::Publish,
        TaskKind::PublishRemote,
    ];

    /// The key used for this kind under `[tasks]` in `keel.toml`.
    pub fn key(self) -> &'static str {
        match self {
            TaskKind::Check => "check",
            TaskKind::Format => "format",
            TaskKind::Analyze => "analyze",
            TaskKind::Publish => "publish",
            TaskKind::PublishRemote => "publish-remote",
        }
    }

    /// Name of the aggregate task unless overridden.
    pub fn default_name(self) -> &'static str {
        match self {
            TaskKind::Check => "ktlintCheck",
            TaskKind::Format => "ktlintFormat",
            TaskKind::Analyze => "detekt",
            TaskKind::Publish => "publishToMavenLocal",
            TaskKind::PublishRemote => "publish",
        }
    }

    /// Group shown by `keel tasks`.
    pub fn group(self) -> &'static str {
        match self {
            TaskKind::Check | TaskKind::Analyze => "Verification",
            TaskKind::Format => "Formatting",
            TaskKind::Publish | TaskKind::PublishRemote => "Publishing",
        }
    }

    /// Description of the aggregate task.
    pub fn aggregate_description(self) -> String {
        match self {
            TaskKind::Check | TaskKind::Format | TaskKind::Analyze => {
                format!("Runs {} on all projects.", self.default_name())
            }
            TaskKind::Publish => {
                "Publishes all library artifacts to the local Maven repository.".to_owned()
            }
            TaskKind::PublishRemote => {
                "Publishes all library artifacts to the remote Maven repository.".to_owned()
            }
        }
    }

    /// Whether only publishable subprojects take part in this kind.
    pub fn publishing(self) -> bool {
        matches!(self, TaskKind::Publish | TaskKind::PublishRemote)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
