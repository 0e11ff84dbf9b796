//! Dependency presence checks.
//!
//! Formula dependencies name packages, not executables. They are checked by
//! looking for the executable each package provides on `PATH`; versioned
//! names like `python@3.12` map to `python3.12`, then fall back to the
//! unversioned interpreter.

use crate::error::{OrbrewError, Result};
use crate::formula::{DependencyStrength, Formula};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStatus {
    pub name: String,
    pub strength: DependencyStrength,
    /// Resolved executable, if found
    pub found: Option<PathBuf>,
}

impl DependencyStatus {
    pub fn is_missing(&self) -> bool {
        self.found.is_none()
    }
}

/// Executables that satisfy a dependency, most specific first
pub fn executable_candidates(name: &str) -> Vec<String> {
    match name.split_once('@') {
        Some(("python", version)) => vec![format!("python{version}"), "python3".to_string()],
        Some((base, version)) => vec![format!("{base}{version}"), base.to_string()],
        None if name == "python" => vec!["python3".to_string(), "python".to_string()],
        None => vec![name.to_string()],
    }
}

/// Check every dependency of a formula against `PATH`
pub fn check(formula: &Formula) -> Vec<DependencyStatus> {
    formula
        .dependencies
        .iter()
        .map(|(name, strength)| DependencyStatus {
            name: name.clone(),
            strength: *strength,
            found: executable_candidates(name)
                .iter()
                .find_map(|candidate| which::which(candidate).ok()),
        })
        .collect()
}

/// Fail on missing required dependencies; return missing recommended ones.
///
/// With `ignore_required`, missing required dependencies are only warned
/// about.
pub fn enforce(statuses: &[DependencyStatus], ignore_required: bool) -> Result<Vec<String>> {
    let mut missing_recommended = Vec::new();

    for status in statuses.iter().filter(|s| s.is_missing()) {
        match status.strength {
            DependencyStrength::Required if !ignore_required => {
                return Err(OrbrewError::MissingDependency(status.name.clone()));
            }
            DependencyStrength::Required => {
                warn!("Ignoring missing required dependency {}", status.name);
            }
            DependencyStrength::Recommended => {
                warn!("Recommended dependency {} is not installed", status.name);
                missing_recommended.push(status.name.clone());
            }
        }
    }

    Ok(missing_recommended)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(name: &str, strength: DependencyStrength, found: bool) -> DependencyStatus {
        DependencyStatus {
            name: name.to_string(),
            strength,
            found: found.then(|| PathBuf::from(format!("/usr/bin/{name}"))),
        }
    }

    #[test]
    fn test_executable_candidates() {
        assert_eq!(executable_candidates("curl"), vec!["curl"]);
        assert_eq!(executable_candidates("python"), vec!["python3", "python"]);
        assert_eq!(
            executable_candidates("python@3.12"),
            vec!["python3.12", "python3"]
        );
        assert_eq!(executable_candidates("node@20"), vec!["node20", "node"]);
    }

    #[test]
    fn test_missing_required_fails() {
        let statuses = vec![
            status("bash", DependencyStrength::Required, true),
            status("curl", DependencyStrength::Required, false),
        ];
        assert!(matches!(
            enforce(&statuses, false),
            Err(OrbrewError::MissingDependency(name)) if name == "curl"
        ));
        assert!(enforce(&statuses, true).unwrap().is_empty());
    }

    #[test]
    fn test_missing_recommended_is_reported() {
        let statuses = vec![
            status("jq", DependencyStrength::Recommended, false),
            status("python", DependencyStrength::Recommended, true),
        ];
        assert_eq!(enforce(&statuses, false).unwrap(), vec!["jq"]);
    }

    #[test]
    fn test_check_covers_every_dependency() {
        let formula = crate::catalog::orchat();
        let statuses = check(&formula);
        assert_eq!(statuses.len(), formula.dependencies.len());
    }
}
