//! Execution planning: which tasks run, and in which order.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::naming::matches_abbreviation;
use crate::registry::TaskGraph;

/// Requested tasks and their transitive prerequisites, grouped into levels.
///
/// Every prerequisite of a task sits in an earlier level, so the tasks of
/// one level may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    levels: Vec<Vec<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl ExecutionPlan {
    /// Plan the execution of `requested` task names (or abbreviations).
    ///
    /// # Errors
    /// Returns an error if a name matches no task or several tasks, or if the
    /// prerequisites form a cycle.
    pub fn for_tasks(graph: &TaskGraph, requested: &[String]) -> Result<Self, EngineError> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        let mut stack: Vec<&str> = Vec::new();

        for name in requested {
            let resolved = resolve_task_name(graph, name)?;
            visit(graph, resolved, &mut marks, &mut depth, &mut order, &mut stack)?;
        }

        let mut levels: Vec<Vec<String>> = Vec::new();
        for name in order {
            let level = depth.get(name).copied().unwrap_or(0);
            while levels.len() <= level {
                levels.push(Vec::new());
            }
            if let Some(bucket) = levels.get_mut(level) {
                bucket.push(name.to_owned());
            }
        }

        tracing::debug!(
            tasks = levels.iter().map(Vec::len).sum::<usize>(),
            levels = levels.len(),
            "planned execution"
        );
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// All planned task names, prerequisites first.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().flatten().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Depth-first walk recording post-order and each task's depth, which is one
/// more than the deepest prerequisite.
fn visit<'g>(
    graph: &'g TaskGraph,
    name: &'g str,
    marks: &mut HashMap<&'g str, Mark>,
    depth: &mut HashMap<&'g str, usize>,
    order: &mut Vec<&'g str>,
    stack: &mut Vec<&'g str>,
) -> Result<(), EngineError> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<&str> = stack.get(start..).unwrap_or(stack.as_slice()).to_vec();
            cycle.push(name);
            return Err(EngineError::TaskCycle {
                cycle: cycle.join(" -> "),
            });
        }
        None => {}
    }

    let Some(task) = graph.get(name) else {
        return Err(EngineError::UnknownTask {
            name: name.to_owned(),
            hint: String::new(),
        });
    };

    marks.insert(name, Mark::InProgress);
    stack.push(name);

    let mut level = 0;
    for dep in &task.depends_on {
        visit(graph, dep.as_str(), marks, depth, order, stack)?;
        let dep_level = depth.get(dep.as_str()).copied().unwrap_or(0);
        level = level.max(dep_level.saturating_add(1));
    }

    stack.pop();
    marks.insert(name, Mark::Done);
    depth.insert(name, level);
    order.push(name);
    Ok(())
}

/// Resolve a requested name to a registered task: an exact match wins,
/// otherwise a unique camel-case abbreviation (`kCP` for
/// `ktlintCheckPackages`).
///
/// # Errors
/// Returns `EngineError::UnknownTask` (with near matches as a hint) or
/// `EngineError::AmbiguousTask`.
pub fn resolve_task_name<'g>(graph: &'g TaskGraph, requested: &str) -> Result<&'g str, EngineError> {
    if let Some(task) = graph.get(requested) {
        return Ok(task.name.as_str());
    }

    let candidates: Vec<&str> = graph
        .tasks()
        .iter()
        .map(|t| t.name.as_str())
        .filter(|name| matches_abbreviation(requested, name))
        .collect();

    match candidates.as_slice() {
        [only] => Ok(*only),
        [] => {
            let lower = requested.to_lowercase();
            let near: Vec<&str> = graph
                .tasks()
                .iter()
                .map(|t| t.name.as_str())
                .filter(|name| {
                    let candidate = name.to_lowercase();
                    candidate.contains(&lower) || lower.contains(&candidate)
                })
                .take(5)
                .collect();
            let hint = if near.is_empty() {
                String::new()
            } else {
                format!(" (did you mean {}?)", near.join(", "))
            };
            Err(EngineError::UnknownTask {
                name: requested.to_owned(),
                hint,
            })
        }
        many => Err(EngineError::AmbiguousTask {
            name: requested.to_owned(),
            candidates: many.join(", "),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::TaskRegistry;
    use crate::task::Task;

    fn task(name: &str, deps: &[&str]) -> Task {
        Task {
            name: name.to_owned(),
            description: String::new(),
            group: None,
            depends_on: deps.iter().map(|d| (*d).to_owned()).collect(),
            actions: Vec::new(),
        }
    }

    fn graph(tasks: Vec<Task>) -> TaskGraph {
        let mut registry = TaskRegistry::new();
        for t in tasks {
            registry.register(t).unwrap();
        }
        registry.freeze(Vec::new()).unwrap()
    }

    fn workspace() -> TaskGraph {
        graph(vec![
            task(
                "ktlintCheck",
                &["ktlintCheckPackages", "ktlintCheckExamplesKmmSample", "ktlintCheckBenchmarks"],
            ),
            task("detekt", &["detektPackages", "detektBenchmarks"]),
            task("ktlintCheckPackages", &[]),
            task("ktlintCheckExamplesKmmSample", &[]),
            task("ktlintCheckBenchmarks", &[]),
            task("detektPackages", &[]),
            task("detektBenchmarks", &[]),
        ])
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn aggregate_runs_after_its_prerequisites() {
        let g = workspace();
        let plan = ExecutionPlan::for_tasks(&g, &names(&["ktlintCheck"])).unwrap();
        assert_eq!(
            plan.levels(),
            &[
                names(&[
                    "ktlintCheckPackages",
                    "ktlintCheckExamplesKmmSample",
                    "ktlintCheckBenchmarks"
                ]),
                names(&["ktlintCheck"]),
            ]
        );
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn multiple_requests_share_levels() {
        let g = workspace();
        let plan = ExecutionPlan::for_tasks(&g, &names(&["ktlintCheck", "detekt"])).unwrap();
        assert_eq!(plan.levels().len(), 2);
        assert_eq!(plan.levels().first().map(Vec::len), Some(5));
        assert_eq!(plan.levels().get(1), Some(&names(&["ktlintCheck", "detekt"])));
    }

    #[test]
    fn repeated_requests_are_planned_once() {
        let g = workspace();
        let plan =
            ExecutionPlan::for_tasks(&g, &names(&["detektPackages", "detekt", "detektPackages"]))
                .unwrap();
        assert_eq!(plan.tasks().filter(|t| *t == "detektPackages").count(), 1);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn prerequisites_always_precede_dependents() {
        let g = graph(vec![
            task("a", &["b", "c"]),
            task("b", &["d"]),
            task("c", &["d"]),
            task("d", &[]),
        ]);
        let plan = ExecutionPlan::for_tasks(&g, &names(&["a"])).unwrap();
        let order: Vec<&str> = plan.tasks().collect();
        let pos = |n: &str| order.iter().position(|t| *t == n).unwrap();
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
        assert_eq!(plan.levels().len(), 3);
    }

    #[test]
    fn empty_request_is_an_empty_plan() {
        let g = workspace();
        let plan = ExecutionPlan::for_tasks(&g, &[]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn cycle_is_reported_with_its_path() {
        let g = graph(vec![task("a", &["b"]), task("b", &["c"]), task("c", &["a"])]);
        let err = ExecutionPlan::for_tasks(&g, &names(&["a"])).unwrap_err();
        match err {
            EngineError::TaskCycle { cycle } => assert_eq!(cycle, "a -> b -> c -> a"),
            other => panic!("expected TaskCycle, got {other}"),
        }
    }

    #[test]
    fn unknown_task_suggests_near_names() {
        let g = workspace();
        let err = ExecutionPlan::for_tasks(&g, &names(&["ktlintcheck"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not found"), "{msg}");
        assert!(msg.contains("ktlintCheck"), "{msg}");
    }

    #[test]
    fn abbreviation_resolves_unique_task() {
        let g = workspace();
        assert_eq!(resolve_task_name(&g, "kCEKS").unwrap(), "ktlintCheckExamplesKmmSample");
        assert_eq!(resolve_task_name(&g, "detB").unwrap(), "detektBenchmarks");
        assert_eq!(resolve_task_name(&g, "detekt").unwrap(), "detekt");
    }

    #[test]
    fn ambiguous_abbreviation_lists_candidates() {
        let g = workspace();
        let err = resolve_task_name(&g, "kC").unwrap_err();
        match err {
            EngineError::AmbiguousTask { candidates, .. } => {
                assert!(candidates.contains("ktlintCheckPackages"));
                assert!(candidates.contains("ktlintCheckBenchmarks"));
            }
            other => panic!("expected AmbiguousTask, got {other}"),
        }
    }
}
