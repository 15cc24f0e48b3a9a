//! Task execution: run a plan level by level on a bounded worker pool.

use std::collections::HashSet;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use crate::error::EngineError;
use crate::plan::ExecutionPlan;
use crate::publish::write_poms;
use crate::registry::TaskGraph;
use crate::task::{ExecSpec, Task, TaskAction, TaskState};

/// Options for a single execution.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Maximum number of tasks running at once. `None` uses one worker per CPU.
    pub jobs: Option<usize>,
    /// Print the output of successful tasks too, not only of failed ones.
    pub verbose: bool,
}

/// Why a task failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    /// The delegated process ran and exited unsuccessfully.
    #[error("`{command}` {}", exit_status(.code))]
    Exit { command: String, code: Option<i32> },

    /// The delegated process could not be started.
    #[error("{message}")]
    Spawn { message: String },

    /// Writing publication metadata failed.
    #[error("cannot write POMs: {message}")]
    Publish { message: String },

    /// A prerequisite failed, so the task never ran.
    #[error("prerequisite `{task}` failed")]
    Prerequisite { task: String },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_owned(),
    }
}

/// The result of one task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub name: String,
    pub state: TaskState,
    pub duration: Duration,
    pub failure: Option<TaskFailure>,
    /// Captured stdout and stderr of the task's processes.
    pub output: String,
}

impl TaskOutcome {
    fn blocked(name: &str, prerequisite: &str) -> Self {
        Self {
            name: name.to_owned(),
            state: TaskState::Failed,
            duration: Duration::ZERO,
            failure: Some(TaskFailure::Prerequisite {
                task: prerequisite.to_owned(),
            }),
            output: String::new(),
        }
    }
}

/// Outcome of a whole execution.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// One outcome per planned task, in plan order.
    pub outcomes: Vec<TaskOutcome>,
    pub duration: Duration,
}

impl ExecutionReport {
    /// Whether every planned task succeeded.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.state == TaskState::Succeeded)
    }

    /// Outcomes of the tasks that failed, in plan order.
    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.state == TaskState::Failed)
    }

    /// State of `name` after the execution; tasks outside the plan stay
    /// `Registered`.
    pub fn state_of(&self, name: &str) -> TaskState {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map_or(TaskState::Registered, |o| o.state)
    }
}

/// Execute `plan` against `graph`.
///
/// Tasks in the same level run concurrently on at most `options.jobs`
/// workers. A failed task fails every task that depends on it, while
/// unrelated tasks keep running. The returned report carries the failures;
/// only problems with the execution machinery itself are errors.
///
/// # Errors
/// Returns an error if the worker pool cannot be created or the plan names a
/// task missing from the graph.
pub fn execute(
    graph: &TaskGraph,
    plan: &ExecutionPlan,
    options: &ExecuteOptions,
) -> Result<ExecutionReport, EngineError> {
    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.unwrap_or(0))
        .thread_name(|i| format!("keel-worker-{i}"))
        .build()
        .map_err(|e| EngineError::WorkerPool {
            message: e.to_string(),
        })?;

    let mut outcomes: Vec<TaskOutcome> = Vec::with_capacity(plan.len());
    let mut failed: HashSet<String> = HashSet::new();

    for level in plan.levels() {
        let mut level_outcomes = Vec::with_capacity(level.len());
        let mut runnable: Vec<&Task> = Vec::with_capacity(level.len());
        for name in level {
            let task = graph.get(name).ok_or_else(|| EngineError::UnknownTask {
                name: name.clone(),
                hint: String::new(),
            })?;
            match task.depends_on.iter().find(|d| failed.contains(*d)) {
                Some(dep) => level_outcomes.push(TaskOutcome::blocked(name, dep)),
                None => {
                    tracing::debug!(task = %task.name, state = ?TaskState::Queued, "task state");
                    runnable.push(task);
                }
            }
        }

        let ran: Vec<TaskOutcome> = pool.install(|| {
            runnable
                .par_iter()
                .map(|task| run_task(graph, task, options))
                .collect()
        });
        level_outcomes.extend(ran);

        for outcome in &level_outcomes {
            if outcome.state == TaskState::Failed {
                failed.insert(outcome.name.clone());
            }
        }
        outcomes.extend(level_outcomes);
    }

    // Report in plan order regardless of completion order.
    let order: Vec<&str> = plan.tasks().collect();
    outcomes.sort_by_key(|o| order.iter().position(|n| *n == o.name));

    let report = ExecutionReport {
        outcomes,
        duration: start.elapsed(),
    };
    tracing::info!(
        tasks = report.outcomes.len(),
        failed = report.failed().count(),
        elapsed_ms = report.duration.as_millis(),
        "execution finished"
    );
    Ok(report)
}

fn run_task(graph: &TaskGraph, task: &Task, options: &ExecuteOptions) -> TaskOutcome {
    let start = Instant::now();
    if !task.is_aggregate() {
        eprintln!("    Running {}", task.name);
    }
    tracing::debug!(task = %task.name, state = ?TaskState::Running, "task state");

    let mut output = String::new();
    let mut failure = None;
    for action in &task.actions {
        let result = match action {
            TaskAction::Exec(spec) => run_exec(spec, &mut output),
            TaskAction::WritePoms {
                project,
                repository,
            } => run_write_poms(graph, project, repository.as_deref()),
        };
        if let Err(e) = result {
            failure = Some(e);
            break;
        }
    }

    let duration = start.elapsed();
    let state = if failure.is_some() {
        TaskState::Failed
    } else {
        TaskState::Succeeded
    };

    match &failure {
        Some(f) => {
            eprintln!("      Failed {}: {f}", task.name);
            print_output(&output);
            tracing::info!(task = %task.name, elapsed_ms = duration.as_millis(), "task failed");
        }
        None => {
            if options.verbose {
                print_output(&output);
            }
            tracing::info!(task = %task.name, elapsed_ms = duration.as_millis(), "task succeeded");
        }
    }

    TaskOutcome {
        name: task.name.clone(),
        state,
        duration,
        failure,
        output,
    }
}

fn run_write_poms(
    graph: &TaskGraph,
    project: &str,
    repository: Option<&Path>,
) -> Result<(), TaskFailure> {
    let Some(repository) = repository else {
        return Err(TaskFailure::Publish {
            message: "no local Maven repository; set HOME, or `local_repository` under \
                      [publishing] in keel.toml"
                .to_owned(),
        });
    };
    let Some(p) = graph.project(project) else {
        return Err(TaskFailure::Publish {
            message: format!("no subproject `{project}`"),
        });
    };
    write_poms(p, repository)
        .map(|_| ())
        .map_err(|e| TaskFailure::Publish {
            message: e.to_string(),
        })
}

fn run_exec(spec: &ExecSpec, output: &mut String) -> Result<(), TaskFailure> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).current_dir(&spec.working_dir);
    for (key, value) in &spec.env {
        cmd.env(key, value);
    }

    let result = keel_util::process::run_command(&mut cmd).map_err(|e| TaskFailure::Spawn {
        message: e.to_string(),
    })?;
    output.push_str(&result.stdout);
    output.push_str(&result.stderr);

    if result.success {
        Ok(())
    } else {
        Err(TaskFailure::Exit {
            command: spec.command_line(),
            code: result.exit_code,
        })
    }
}

/// Print a task's captured output as one block so concurrent tasks do not
/// interleave line by line.
fn print_output(output: &str) {
    let trimmed = output.trim_end();
    if trimmed.is_empty() {
        return;
    }
    let block: String = trimmed.lines().map(|l| format!("        {l}\n")).collect();
    eprint!("{block}");
}
