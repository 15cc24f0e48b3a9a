//! The task registry: append-only while configuring, frozen into a
//! [`TaskGraph`] before anything runs.

use std::collections::HashMap;

use crate::configure::Project;
use crate::error::EngineError;
use crate::task::Task;

/// Tasks registered during configuration, in registration order.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task.
    ///
    /// # Errors
    /// Returns `EngineError::DuplicateTask` if the name is already taken.
    pub fn register(&mut self, task: Task) -> Result<(), EngineError> {
        if self.index.contains_key(&task.name) {
            return Err(EngineError::DuplicateTask { name: task.name });
        }
        tracing::debug!(
            task = %task.name,
            depends_on = task.depends_on.len(),
            actions = task.actions.len(),
            "registered task"
        );
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Close the registry. Prerequisites are declared by name and may be
    /// registered after their dependents, so they are only checked here.
    ///
    /// # Errors
    /// Returns `EngineError::UnknownDependency` for the first prerequisite
    /// that names no registered task.
    pub fn freeze(self, projects: Vec<Project>) -> Result<TaskGraph, EngineError> {
        for task in &self.tasks {
            if let Some(missing) = task.depends_on.iter().find(|d| !self.index.contains_key(*d)) {
                return Err(EngineError::UnknownDependency {
                    task: task.name.clone(),
                    dependency: missing.clone(),
                });
            }
        }
        Ok(TaskGraph {
            tasks: self.tasks,
            index: self.index,
            projects,
        })
    }
}

/// The immutable task graph of a configured workspace.
#[derive(Debug)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    projects: Vec<Project>,
}

impl TaskGraph {
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).and_then(|&i| self.tasks.get(i))
    }

    /// All tasks in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// All configured subprojects in declaration order.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, path: &str) -> Option<&Project> {
        let wanted = path.trim_end_matches('/');
        self.projects.iter().find(|p| p.path == wanted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> Task {
        Task {
            name: name.to_owned(),
            description: String::new(),
            group: None,
            depends_on: Vec::new(),
            actions: Vec::new(),
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = TaskRegistry::new();
        registry.register(leaf("detektPackages")).unwrap();
        assert!(registry.contains("detektPackages"));
        assert_eq!(registry.len(), 1);

        let graph = registry.freeze(Vec::new()).unwrap();
        assert!(graph.get("detektPackages").is_some());
        assert!(graph.get("detekt").is_none());
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let mut registry = TaskRegistry::new();
        registry.register(leaf("ktlintCheck")).unwrap();
        let err = registry.register(leaf("ktlintCheck")).unwrap_err();
        assert!(
            matches!(err, EngineError::DuplicateTask { ref name } if name == "ktlintCheck"),
            "{err}"
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn forward_references_resolve_at_freeze() {
        let mut registry = TaskRegistry::new();
        registry
            .register(Task::aggregate(
                "detekt",
                "",
                "Verification",
                vec!["detektPackages".to_owned()],
            ))
            .unwrap();
        registry.register(leaf("detektPackages")).unwrap();
        assert!(registry.freeze(Vec::new()).is_ok());
    }

    #[test]
    fn dangling_dependency_fails_freeze() {
        let mut registry = TaskRegistry::new();
        registry
            .register(Task::aggregate(
                "detekt",
                "",
                "Verification",
                vec!["detektGone".to_owned()],
            ))
            .unwrap();
        let err = registry.freeze(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("detektGone"), "{err}");
    }

    #[test]
    fn registration_order_is_preserved() {
        let mut registry = TaskRegistry::new();
        for name in ["b", "a", "c"] {
            registry.register(leaf(name)).unwrap();
        }
        let graph = registry.freeze(Vec::new()).unwrap();
        let names: Vec<&str> = graph.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
