#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use keel_config::Manifest;
use keel_engine::doctor::CheckStatus;
use keel_engine::{EngineError, ExecuteOptions, ExecutionPlan, Task, TaskGraph};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult = Result<(), Box<dyn Error>>;

const MANIFEST_FILE: &str = "keel.toml";

#[derive(Debug, Parser)]
#[command(name = "keel", about = "Task orchestration for multi-module Kotlin workspaces")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run tasks and everything they depend on
    Run {
        /// Task names or camel-case abbreviations (e.g. `kCP`)
        #[arg(required = true)]
        tasks: Vec<String>,
        /// Maximum number of tasks to run at once (defaults to the CPU count)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Print the execution order without running anything
        #[arg(long)]
        dry_run: bool,
        /// Show the output of successful tasks and debug logging
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// List the tasks of the workspace
    Tasks {
        /// Include per-subproject tasks
        #[arg(long)]
        all: bool,
        /// Print the tasks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the generated POMs of a subproject
    Pom {
        /// Subproject path as declared in keel.toml
        subproject: String,
    },
    /// Create a keel.toml in the current directory
    Init {
        /// Workspace name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Check the workspace setup
    Doctor,
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Command::Run { verbose: true, .. });
    init_logging(verbose);

    let result = match cli.command {
        Command::Run {
            tasks,
            jobs,
            dry_run,
            verbose,
        } => cmd_run(&tasks, jobs, dry_run, verbose),
        Command::Tasks { all, json } => cmd_tasks(all, json),
        Command::Pom { subproject } => cmd_pom(&subproject),
        Command::Init { name } => cmd_init(name),
        Command::Doctor => cmd_doctor(),
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

/// Log filtering comes from `KEEL_LOG`; without it only warnings are shown,
/// or everything down to debug with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("KEEL_LOG")
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Find the workspace root by looking for `keel.toml` in the current
/// directory.
fn project_root() -> Result<PathBuf, Box<dyn Error>> {
    workspace_root(&std::env::current_dir()?)
}

fn workspace_root(dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    if !dir.join(MANIFEST_FILE).exists() {
        return Err(format!(
            "no keel.toml found in {} — run `keel init` to create one",
            dir.display()
        )
        .into());
    }
    Ok(dir.to_path_buf())
}

/// Load the manifest at `root` and run the configuration phase.
fn load_graph(root: &Path) -> Result<TaskGraph, Box<dyn Error>> {
    let manifest = Manifest::from_path(&root.join(MANIFEST_FILE))?;
    let graph = keel_engine::configure(root, &manifest, &env_var)?;
    tracing::debug!(
        root = %root.display(),
        tasks = graph.tasks().len(),
        "loaded task graph"
    );
    Ok(graph)
}

fn cmd_run(tasks: &[String], jobs: Option<usize>, dry_run: bool, verbose: bool) -> CliResult {
    let root = project_root()?;
    let graph = load_graph(&root)?;
    let plan = ExecutionPlan::for_tasks(&graph, tasks)?;

    if dry_run {
        for (i, level) in plan.levels().iter().enumerate() {
            for name in level {
                let command = graph.get(name).map(describe_actions).unwrap_or_default();
                eprintln!("    Would run {name} (level {i}){command}");
            }
        }
        return Ok(());
    }

    let report = keel_engine::execute(&graph, &plan, &ExecuteOptions { jobs, verbose })?;

    let failed: Vec<String> = report
        .failed()
        .map(|o| match &o.failure {
            Some(f) => format!("{} ({f})", o.name),
            None => o.name.clone(),
        })
        .collect();
    if !failed.is_empty() {
        return Err(format!(
            "{} of {} tasks failed:\n  {}",
            failed.len(),
            report.outcomes.len(),
            failed.join("\n  ")
        )
        .into());
    }

    eprintln!(
        "    Finished {} tasks in {:.2}s",
        report.outcomes.len(),
        report.duration.as_secs_f64()
    );
    Ok(())
}

fn describe_actions(task: &Task) -> String {
    task.actions
        .iter()
        .map(|action| match action {
            keel_engine::TaskAction::Exec(spec) => format!(": {}", spec.command_line()),
            keel_engine::TaskAction::WritePoms {
                repository: Some(repo),
                ..
            } => format!(", then write POMs to {}", repo.display()),
            keel_engine::TaskAction::WritePoms {
                repository: None, ..
            } => ", then write POMs (no local repository)".to_owned(),
        })
        .collect()
}

/// Tasks shown by `keel tasks`, grouped and sorted by group. Per-subproject
/// tasks have no group and are listed under `Other` with `--all`.
fn task_listing(graph: &TaskGraph, all: bool) -> BTreeMap<&str, Vec<&Task>> {
    let mut groups: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
    for task in graph.tasks() {
        match task.group.as_deref() {
            Some(group) => groups.entry(group).or_default().push(task),
            None if all => groups.entry("Other").or_default().push(task),
            None => {}
        }
    }
    groups
}

fn cmd_tasks(all: bool, json: bool) -> CliResult {
    let root = project_root()?;
    let graph = load_graph(&root)?;
    let groups = task_listing(&graph, all);

    if json {
        let tasks: Vec<&Task> = groups.values().flatten().copied().collect();
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    for (group, tasks) in &groups {
        println!("{group} tasks");
        println!("{}", "-".repeat(group.len().saturating_add(6)));
        for task in tasks {
            if task.description.is_empty() {
                println!("{}", task.name);
            } else {
                println!("{} - {}", task.name, task.description);
            }
        }
        println!();
    }
    Ok(())
}

fn cmd_pom(subproject: &str) -> CliResult {
    let root = project_root()?;
    print!("{}", render_poms(&root, subproject)?);
    Ok(())
}

/// The POMs of every publication of `subproject`, concatenated.
fn render_poms(root: &Path, subproject: &str) -> Result<String, Box<dyn Error>> {
    let graph = load_graph(root)?;
    let project = graph
        .project(subproject)
        .ok_or_else(|| EngineError::UnknownSubproject {
            path: subproject.to_owned(),
        })?;
    if project.publications.is_empty() {
        return Err(EngineError::NotPublished {
            path: project.path.clone(),
        }
        .into());
    }

    let mut xml = String::new();
    for publication in &project.publications {
        eprintln!("    Publication {} ({})", publication.name, project.gradle_path);
        xml.push_str(&publication.pom.to_xml());
    }
    Ok(xml)
}

fn cmd_init(name: Option<String>) -> CliResult {
    init_in(&std::env::current_dir()?, name)
}

fn init_in(cwd: &Path, name: Option<String>) -> CliResult {
    let workspace_name = name.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("my-workspace")
            .to_owned()
    });

    let path = keel_engine::init_workspace(cwd, &workspace_name)?;
    eprintln!(
        "    Created workspace `{workspace_name}` at {}",
        path.display()
    );
    eprintln!();
    eprintln!("  Next steps:");
    eprintln!("    fill in [publishing] in keel.toml");
    eprintln!("    keel doctor");
    Ok(())
}

fn cmd_doctor() -> CliResult {
    let root = project_root()?;
    let manifest = Manifest::from_path(&root.join(MANIFEST_FILE))?;
    eprintln!("Checking workspace `{}`...", manifest.workspace.name);
    eprintln!();

    let checks = keel_engine::doctor::check(&root, &manifest, &env_var);
    for check in &checks {
        eprintln!("  [{}] {}: {}", check.status, check.label, check.detail);
    }

    let issues = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Fail)
        .count();
    eprintln!();
    if issues == 0 {
        eprintln!("All checks passed.");
        Ok(())
    } else {
        Err(format!("{issues} issue(s) found").into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;
    use clap::Parser;

    // ── Subcommand parsing ─────────────────────────────────────────

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::try_parse_from(["keel", "run", "ktlintCheck"]).unwrap();
        match cli.command {
            Command::Run {
                tasks,
                jobs,
                dry_run,
                verbose,
            } => {
                assert_eq!(tasks, vec!["ktlintCheck"]);
                assert!(jobs.is_none());
                assert!(!dry_run);
                assert!(!verbose);
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn parse_run_multiple_tasks_with_flags() {
        let args = [
            "keel",
            "run",
            "ktlintCheck",
            "detekt",
            "--jobs",
            "4",
            "--dry-run",
            "-v",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Run {
                tasks,
                jobs,
                dry_run,
                verbose,
            } => {
                assert_eq!(tasks, vec!["ktlintCheck", "detekt"]);
                assert_eq!(jobs, Some(4));
                assert!(dry_run);
                assert!(verbose);
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn parse_run_short_jobs() {
        let cli = Cli::try_parse_from(["keel", "run", "-j", "1", "detekt"]).unwrap();
        match cli.command {
            Command::Run { jobs, .. } => assert_eq!(jobs, Some(1)),
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn parse_tasks_flags() {
        let cli = Cli::try_parse_from(["keel", "tasks", "--all", "--json"]).unwrap();
        match cli.command {
            Command::Tasks { all, json } => {
                assert!(all);
                assert!(json);
            }
            other => panic!("expected Tasks, got {other:?}"),
        }
    }

    #[test]
    fn parse_pom() {
        let cli = Cli::try_parse_from(["keel", "pom", "examples/kmm-sample"]).unwrap();
        match cli.command {
            Command::Pom { subproject } => assert_eq!(subproject, "examples/kmm-sample"),
            other => panic!("expected Pom, got {other:?}"),
        }
    }

    #[test]
    fn parse_init_with_name() {
        let cli = Cli::try_parse_from(["keel", "init", "--name", "realm-kotlin"]).unwrap();
        match cli.command {
            Command::Init { name } => assert_eq!(name.as_deref(), Some("realm-kotlin")),
            other => panic!("expected Init, got {other:?}"),
        }
    }

    #[test]
    fn parse_doctor() {
        let cli = Cli::try_parse_from(["keel", "doctor"]).unwrap();
        assert!(matches!(cli.command, Command::Doctor));
    }

    // ── Invalid arguments ──────────────────────────────────────────

    #[test]
    fn error_run_without_tasks() {
        let err = Cli::try_parse_from(["keel", "run"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn error_jobs_not_a_number() {
        let err = Cli::try_parse_from(["keel", "run", "detekt", "--jobs", "many"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn error_pom_without_subproject() {
        let err = Cli::try_parse_from(["keel", "pom"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn error_unknown_subcommand() {
        let err = Cli::try_parse_from(["keel", "deploy"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn root_help_render_includes_all_subcommands() {
        let mut cmd = Cli::command();
        let help = cmd.render_help().to_string();
        for subcommand in ["run", "tasks", "pom", "init", "doctor"] {
            assert!(help.contains(subcommand));
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    // ── Task listing ───────────────────────────────────────────────

    const MANIFEST: &str = r#"
[workspace]
name = "realm-kotlin"

[publishing]
local_repository = "m2"

[[subproject]]
path = "packages"

[[subproject]]
path = "examples/kmm-sample"
publish = false
"#;

    fn graph() -> TaskGraph {
        let manifest = Manifest::parse(MANIFEST, MANIFEST_FILE).unwrap();
        let no_env = |_: &str| -> Option<String> { None };
        keel_engine::configure(Path::new("/work"), &manifest, &no_env).unwrap()
    }

    #[test]
    fn listing_shows_aggregates_by_group() {
        let g = graph();
        let groups = task_listing(&g, false);
        let names: Vec<&str> = groups
            .get("Verification")
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["ktlintCheck", "detekt"]);
        assert!(groups.contains_key("Formatting"));
        assert!(groups.contains_key("Publishing"));
        assert!(!groups.contains_key("Other"));
    }

    #[test]
    fn listing_all_includes_subproject_tasks() {
        let g = graph();
        let groups = task_listing(&g, true);
        let other = groups.get("Other").unwrap();
        assert!(other.iter().any(|t| t.name == "ktlintCheckExamplesKmmSample"));
        assert!(other.iter().any(|t| t.name == "publishToMavenLocalPackages"));
        assert!(!other.iter().any(|t| t.name == "publishToMavenLocalExamplesKmmSample"));
    }

    // ── Workspace round trips ──────────────────────────────────────

    #[test]
    fn init_then_pom_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        init_in(tmp.path(), Some("realm-kotlin".to_owned())).unwrap();

        let root = workspace_root(tmp.path()).unwrap();
        let graph = load_graph(&root).unwrap();
        assert!(graph.get("ktlintCheckExamplesKmmSample").is_some());

        let xml = render_poms(&root, "packages").unwrap();
        assert!(xml.contains("<artifactId>packages</artifactId>"), "{xml}");
        assert!(xml.contains("<name>realm-kotlin</name>"), "{xml}");
        assert!(xml.contains("<groupId></groupId>"), "{xml}");
    }

    #[test]
    fn pom_of_unpublished_or_unknown_subproject_fails() {
        let tmp = tempfile::tempdir().unwrap();
        init_in(tmp.path(), None).unwrap();

        let err = render_poms(tmp.path(), "benchmarks").unwrap_err();
        assert!(err.to_string().contains("not published"), "{err}");
        let err = render_poms(tmp.path(), "missing").unwrap_err();
        assert!(err.to_string().contains("no subproject `missing`"), "{err}");
    }

    #[test]
    fn init_twice_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        init_in(tmp.path(), Some("demo".to_owned())).unwrap();
        let err = init_in(tmp.path(), Some("demo".to_owned())).unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");
    }

    #[test]
    fn root_requires_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let err = workspace_root(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("keel init"), "{err}");
    }

    #[test]
    fn dry_run_description_lists_commands() {
        let g = graph();
        let described = describe_actions(g.get("publishToMavenLocalPackages").unwrap());
        assert!(described.starts_with(": /work/packages/gradlew publishToMavenLocal"), "{described}");
        assert!(described.contains("then write POMs to /work/m2"), "{described}");
        assert_eq!(describe_actions(g.get("detekt").unwrap()), "");
    }
}
