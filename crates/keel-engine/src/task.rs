//! Task definitions: what a task runs and what it waits for.

use std::path::PathBuf;

use serde::{Serialize, Serializer};

/// A registered task.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub name: String,
    pub description: String,
    /// Group shown by `keel tasks`; per-subproject tasks have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Names of the tasks that must succeed first, in declaration order.
    pub depends_on: Vec<String>,
    /// Work done when the task runs, in order. Empty for aggregates.
    pub actions: Vec<TaskAction>,
}

impl Task {
    /// An aggregate task: no work of its own, only prerequisites.
    pub fn aggregate(name: &str, description: &str, group: &str, depends_on: Vec<String>) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            group: Some(group.to_owned()),
            depends_on,
            actions: Vec::new(),
        }
    }

    /// Whether this task only depends on other tasks.
    pub fn is_aggregate(&self) -> bool {
        self.actions.is_empty()
    }
}

/// One unit of work inside a task.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskAction {
    /// Run an external process.
    Exec(ExecSpec),
    /// Write the POMs of a subproject's publications into a Maven repository.
    WritePoms {
        /// Subproject path whose publications are written.
        project: String,
        /// Root of the file-based Maven repository; `None` when it could not
        /// be located, which fails the task when it runs.
        repository: Option<PathBuf>,
    },
}

/// An external process invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ExecSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Extra environment for the process. Values are redacted when serialized.
    #[serde(serialize_with = "redact_env")]
    pub env: Vec<(String, String)>,
}

impl ExecSpec {
    /// The command line for display.
    pub fn command_line(&self) -> String {
        keel_util::process::render_command_line(&self.program, &self.args)
    }
}

fn redact_env<S: Serializer>(env: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(env.len()))?;
    for (key, _) in env {
        map.serialize_entry(key, "***")?;
    }
    map.end()
}

/// Lifecycle of a task during one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Registered,
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Whether the task has finished, one way or the other.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_has_no_actions() {
        let task = Task::aggregate(
            "ktlintCheck",
            "Runs ktlintCheck on all projects.",
            "Verification",
            vec!["ktlintCheckPackages".to_owned()],
        );
        assert!(task.is_aggregate());
        assert_eq!(task.group.as_deref(), Some("Verification"));
    }

    #[test]
    fn terminal_states() {
        assert!(TaskState::Succeeded.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(!TaskState::Registered.is_terminal());
    }

    #[test]
    fn serialized_env_is_redacted() {
        let spec = ExecSpec {
            program: "./gradlew".to_owned(),
            args: vec!["publish".to_owned()],
            working_dir: PathBuf::from("/work/packages"),
            env: vec![(
                "ORG_GRADLE_PROJECT_keelRepositoryPassword".to_owned(),
                "ghp_secret".to_owned(),
            )],
        };
        let json = serde_json::to_string(&TaskAction::Exec(spec)).unwrap();
        assert!(!json.contains("ghp_secret"), "{json}");
        assert!(json.contains("ORG_GRADLE_PROJECT_keelRepositoryPassword"));
        assert!(json.contains(r#""type":"exec""#), "{json}");
    }

    #[test]
    fn command_line_rendering() {
        let spec = ExecSpec {
            program: "./gradlew".to_owned(),
            args: vec!["ktlintFormat".to_owned()],
            working_dir: PathBuf::from("/work"),
            env: Vec::new(),
        };
        assert_eq!(spec.command_line(), "./gradlew ktlintFormat");
    }
}
