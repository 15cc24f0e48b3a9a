//! Workspace health checks for `keel doctor`.

use std::fmt;
use std::path::Path;

use keel_config::manifest::Manifest;

use crate::publish::Credentials;

/// Severity of a check; displayed as the `[ok]` / `[??]` / `[!!]` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Warn => "??",
            CheckStatus::Fail => "!!",
        };
        f.write_str(label)
    }
}

/// One diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub label: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn new(label: impl Into<String>, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status,
            detail: detail.into(),
        }
    }
}

/// Check that every subproject directory exists and carries a runnable
/// entry point, and flag incomplete publishing setup.
///
/// Failures mean tasks cannot run; warnings mean they run but publish
/// incomplete metadata or without credentials.
pub fn check(root: &Path, manifest: &Manifest, env: &dyn Fn(&str) -> Option<String>) -> Vec<Check> {
    let mut checks = Vec::new();
    let entrypoint = manifest.workspace.entrypoint.as_str();

    for sub in &manifest.subprojects {
        let dir = root.join(&sub.path);
        if !dir.is_dir() {
            checks.push(Check::new(
                format!("subproject {}", sub.path),
                CheckStatus::Fail,
                format!("directory {} does not exist", dir.display()),
            ));
            continue;
        }
        checks.push(Check::new(
            format!("subproject {}", sub.path),
            CheckStatus::Ok,
            dir.display().to_string(),
        ));
        checks.push(check_entrypoint(&sub.path, &dir, entrypoint, env));
    }

    let publishes = manifest.subprojects.iter().any(|s| s.publish);
    if publishes {
        let publishing = &manifest.publishing;
        if publishing.group_id.trim().is_empty() {
            checks.push(Check::new(
                "publishing group_id",
                CheckStatus::Warn,
                "empty; set `group_id` under [publishing] before publishing",
            ));
        }
        if publishing.local_repository.is_none() {
            match keel_util::fs::maven_local_repository(env) {
                Ok(repo) => checks.push(Check::new(
                    "local repository",
                    CheckStatus::Ok,
                    repo.display().to_string(),
                )),
                Err(e) => checks.push(Check::new("local repository", CheckStatus::Fail, e.to_string())),
            }
        }
        if let Some(repo) = &publishing.repository {
            let creds = Credentials::resolve(repo, env);
            let missing: Vec<&str> = [
                ("username", creds.username.is_none()),
                ("password", creds.password.is_none()),
            ]
            .into_iter()
            .filter_map(|(what, absent)| absent.then_some(what))
            .collect();
            if missing.is_empty() {
                checks.push(Check::new("repository credentials", CheckStatus::Ok, repo.url.clone()));
            } else {
                checks.push(Check::new(
                    "repository credentials",
                    CheckStatus::Warn,
                    format!(
                        "no {} for {}; set it in [publishing.repository] or via USERNAME / GITHUB_TOKEN",
                        missing.join(" or "),
                        repo.url
                    ),
                ));
            }
        }
    }

    checks
}

fn check_entrypoint(
    sub_path: &str,
    dir: &Path,
    entrypoint: &str,
    env: &dyn Fn(&str) -> Option<String>,
) -> Check {
    let label = format!("entry point for {sub_path}");

    if !entrypoint.contains(['/', '\\']) {
        let found = env("PATH").and_then(|path| {
            std::env::split_paths(&path)
                .map(|d| d.join(entrypoint))
                .find(|candidate| keel_util::fs::is_executable(candidate))
        });
        return match found {
            Some(p) => Check::new(label, CheckStatus::Ok, p.display().to_string()),
            None => Check::new(
                label,
                CheckStatus::Fail,
                format!("`{entrypoint}` not found on PATH"),
            ),
        };
    }

    let relative = Path::new(entrypoint);
    let program = dir.join(relative.strip_prefix("./").unwrap_or(relative));
    if keel_util::fs::is_executable(&program) {
        Check::new(label, CheckStatus::Ok, program.display().to_string())
    } else if program.exists() {
        Check::new(
            label,
            CheckStatus::Fail,
            format!("{} is not executable", program.display()),
        )
    } else {
        Check::new(
            label,
            CheckStatus::Fail,
            format!("{} does not exist", program.display()),
        )
    }
}
