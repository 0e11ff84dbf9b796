//! Post-install smoke tests.
//!
//! Runs a formula's `test` steps against an installed keg. Programs run with a
//! throwaway `HOME` so the check never reads or writes the user's real
//! configuration. Any nonzero exit or missing path fails the whole test.

use crate::cellar::Keg;
use crate::error::{OrbrewError, Result};
use crate::formula::{Formula, SmokeStep};
use anyhow::Context;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Outcome of one passed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub description: String,
    pub stdout: String,
}

/// Run every test step; stop at the first failure
pub fn run(formula: &Formula, keg: &Keg) -> Result<Vec<StepResult>> {
    if !keg.exists() {
        return Err(OrbrewError::NotInstalled(formula.name.clone()));
    }

    let home = tempfile::TempDir::new().context("Failed to create test HOME")?;
    formula
        .test
        .iter()
        .map(|step| run_step(step, keg, home.path()))
        .collect()
}

fn run_step(step: &SmokeStep, keg: &Keg, home: &Path) -> Result<StepResult> {
    let description = step.to_string();

    match step {
        SmokeStep::Run { program, args } => {
            let program = keg.expand(program);
            debug!("Running {} {:?}", program, args);

            let output = Command::new(&program)
                .args(args)
                .env("HOME", home)
                .current_dir(home)
                .output()
                .map_err(|e| {
                    OrbrewError::SmokeTestFailed(format!("`{description}` could not start: {e}"))
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(OrbrewError::SmokeTestFailed(format!(
                    "`{}` exited with {}{}",
                    description,
                    output.status,
                    if stderr.trim().is_empty() {
                        String::new()
                    } else {
                        format!(": {}", stderr.trim())
                    }
                )));
            }

            Ok(StepResult {
                description,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        }
        SmokeStep::AssertExists { path } => {
            let path = keg.expand(path);
            if Path::new(&path).exists() {
                Ok(StepResult {
                    description,
                    stdout: String::new(),
                })
            } else {
                Err(OrbrewError::SmokeTestFailed(format!("{path} does not exist")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use tempfile::TempDir;

    #[test]
    fn test_not_installed() {
        let temp = TempDir::new().unwrap();
        let keg = Keg::new(temp.path(), "orchat", "0.3.0");
        assert!(matches!(
            run(&catalog::orchat(), &keg),
            Err(OrbrewError::NotInstalled(_))
        ));
    }

    #[test]
    fn test_assert_exists_failure_names_path() {
        let temp = TempDir::new().unwrap();
        let keg = Keg::new(temp.path(), "orchat", "0.3.0");
        std::fs::create_dir_all(keg.path()).unwrap();

        let step = SmokeStep::AssertExists {
            path: "{libexec}/src/bootstrap.sh".to_string(),
        };
        match run_step(&step, &keg, temp.path()) {
            Err(OrbrewError::SmokeTestFailed(msg)) => {
                assert!(msg.ends_with("libexec/src/bootstrap.sh does not exist"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        let temp = TempDir::new().unwrap();
        let keg = Keg::new(temp.path(), "orchat", "0.3.0");
        std::fs::create_dir_all(keg.path()).unwrap();

        let ok = SmokeStep::Run {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "echo ok".to_string()],
        };
        assert_eq!(run_step(&ok, &keg, temp.path()).unwrap().stdout, "ok\n");

        let failing = SmokeStep::Run {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()],
        };
        match run_step(&failing, &keg, temp.path()) {
            Err(OrbrewError::SmokeTestFailed(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
