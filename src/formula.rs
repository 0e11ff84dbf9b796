//! Declarative formula descriptors.
//!
//! A [`Formula`] is the typed equivalent of a Homebrew formula class: package
//! metadata, a dependency set, an ordered install manifest, the launcher to
//! produce, optional caveats and the post-install smoke test. Descriptors are
//! static; nothing in this crate mutates one after it has been loaded.
//!
//! Paths inside templates may reference the install layout with `{prefix}`,
//! `{bin}`, `{libexec}`, `{doc}`, `{etc}` and `{pkgshare}`; see
//! [`crate::cellar::Keg::expand`].
//!
//! # Examples
//!
//! ```no_run
//! use orbrew::formula::Formula;
//! use std::path::Path;
//!
//! fn main() -> orbrew::Result<()> {
//!     let formula = Formula::load(Path::new("orchat.json"))?;
//!     println!("{} {}", formula.name, formula.version()?);
//!     Ok(())
//! }
//! ```

use crate::error::{OrbrewError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path};

/// How strongly a formula needs a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStrength {
    Required,
    Recommended,
}

impl fmt::Display for DependencyStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyStrength::Required => write!(f, "required"),
            DependencyStrength::Recommended => write!(f, "recommended"),
        }
    }
}

/// Declared archive checksum.
///
/// Formulae are sometimes published before the release archive exists, with a
/// placeholder where the digest belongs. Those stay `Unresolved` and can never
/// verify an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Checksum {
    Sha256(String),
    Unresolved(String),
}

impl Checksum {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            Checksum::Sha256(trimmed.to_ascii_lowercase())
        } else {
            Checksum::Unresolved(value.to_string())
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Checksum::Sha256(_))
    }
}

impl From<String> for Checksum {
    fn from(value: String) -> Self {
        Checksum::parse(&value)
    }
}

impl From<Checksum> for String {
    fn from(value: Checksum) -> Self {
        match value {
            Checksum::Sha256(hex) => hex,
            Checksum::Unresolved(raw) => raw,
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checksum::Sha256(hex) => write!(f, "{hex}"),
            Checksum::Unresolved(raw) => write!(f, "{raw} (unresolved)"),
        }
    }
}

/// Install destination, mirroring Homebrew's formula path helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallDir {
    Bin,
    Libexec,
    Doc,
    Etc,
    Pkgshare,
}

impl fmt::Display for InstallDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallDir::Bin => "bin",
            InstallDir::Libexec => "libexec",
            InstallDir::Doc => "doc",
            InstallDir::Etc => "etc",
            InstallDir::Pkgshare => "pkgshare",
        };
        write!(f, "{name}")
    }
}

/// One `dir.install "source" => "rename"` instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStep {
    pub dir: InstallDir,
    /// Path relative to the source root
    pub source: String,
    /// Destination relative to `dir`; defaults to the source's file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

impl InstallStep {
    pub fn new(dir: InstallDir, source: &str) -> Self {
        Self {
            dir,
            source: source.to_string(),
            rename: None,
        }
    }

    pub fn renamed(dir: InstallDir, source: &str, rename: &str) -> Self {
        Self {
            dir,
            source: source.to_string(),
            rename: Some(rename.to_string()),
        }
    }

    /// Destination path relative to the step's install directory
    pub fn target(&self) -> &str {
        match &self.rename {
            Some(rename) => rename,
            None => self.source.rsplit('/').next().unwrap_or(&self.source),
        }
    }
}

/// How the installed entry point is produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Launcher {
    /// Write `bin/<name>` as a script exporting `env` and exec'ing `exec`
    Wrapper {
        name: String,
        #[serde(default)]
        env: BTreeMap<String, String>,
        exec: String,
    },
    /// Rewrite every match of `pattern` in an installed keg file
    Inreplace {
        file: String,
        pattern: String,
        replacement: String,
    },
}

impl Launcher {
    pub fn kind(&self) -> &'static str {
        match self {
            Launcher::Wrapper { .. } => "wrapper",
            Launcher::Inreplace { .. } => "inreplace",
        }
    }
}

/// A single post-install check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmokeStep {
    /// Run a program, expecting exit status zero
    Run {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Expect a path to exist
    AssertExists { path: String },
}

impl fmt::Display for SmokeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmokeStep::Run { program, args } => {
                let program = program.rsplit('/').next().unwrap_or(program);
                if args.is_empty() {
                    write!(f, "{program}")
                } else {
                    write!(f, "{program} {}", args.join(" "))
                }
            }
            SmokeStep::AssertExists { path } => write!(f, "exists {path}"),
        }
    }
}

/// Package descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    pub desc: String,
    pub homepage: String,
    pub url: String,
    pub sha256: Checksum,
    pub license: String,
    /// Explicit version; derived from `url` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyStrength>,
    pub install: Vec<InstallStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<Launcher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<String>,
    #[serde(default)]
    pub test: Vec<SmokeStep>,
}

impl Formula {
    /// Load and validate a JSON descriptor
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            OrbrewError::Other(anyhow::anyhow!(
                "Failed to read formula {}: {}",
                path.display(),
                e
            ))
        })?;
        let formula: Formula = serde_json::from_str(&contents)?;
        formula.validate()?;
        Ok(formula)
    }

    /// Version string, explicit or derived from the source URL
    pub fn version(&self) -> Result<String> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        version_from_url(&self.url).ok_or_else(|| self.invalid("cannot derive version from url"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        {
            return Err(self.invalid("name must be a non-empty package identifier"));
        }

        let known_scheme = ["https://", "http://", "file://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme));
        if !known_scheme && !Path::new(&self.url).is_absolute() {
            return Err(self.invalid("url must be http(s), file:// or an absolute path"));
        }

        self.version()?;

        if self.install.is_empty() {
            return Err(self.invalid("install manifest is empty"));
        }
        for step in &self.install {
            if !is_contained(&step.source) {
                return Err(self.invalid(&format!(
                    "install source '{}' escapes the source tree",
                    step.source
                )));
            }
            if !is_contained(step.target()) {
                return Err(self.invalid(&format!(
                    "install target '{}' escapes {}",
                    step.target(),
                    step.dir
                )));
            }
        }

        match &self.launcher {
            Some(Launcher::Wrapper { name, .. }) if name.is_empty() || name.contains('/') => {
                return Err(self.invalid("wrapper name must be a bare file name"));
            }
            Some(Launcher::Inreplace { file, pattern, .. }) => {
                if !is_contained(file) {
                    return Err(self.invalid(&format!("inreplace file '{file}' escapes the keg")));
                }
                regex::Regex::new(pattern)?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Dependency names with the given strength
    pub fn dependencies_with(&self, strength: DependencyStrength) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|(_, s)| **s == strength)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Name of the primary executable in `bin`
    pub fn entry_point(&self) -> Option<String> {
        match &self.launcher {
            Some(Launcher::Wrapper { name, .. }) => Some(name.clone()),
            Some(Launcher::Inreplace { file, .. }) if file.starts_with("bin/") => {
                file.strip_prefix("bin/").map(str::to_string)
            }
            _ => self
                .install
                .iter()
                .find(|step| step.dir == InstallDir::Bin)
                .map(|step| step.target().to_string()),
        }
    }

    fn invalid(&self, reason: &str) -> OrbrewError {
        OrbrewError::InvalidFormula {
            formula: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Relative, non-empty and free of `..` / absolute components
fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".tar.xz", ".tar.bz2", ".tar", ".zip"];

/// Derive a version from a release URL.
///
/// Handles GitHub tag archives (`.../archive/v0.3.0.tar.gz`,
/// `.../refs/tags/v0.3.0.tar.gz`) and `name-1.2.3.tar.gz` style tarballs.
pub fn version_from_url(url: &str) -> Option<String> {
    let file = url.trim_end_matches('/').rsplit('/').next()?;
    let stem = ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| file.strip_suffix(suffix))
        .unwrap_or(file);

    // name-1.2.3 -> 1.2.3
    let candidate = match stem.rfind('-') {
        Some(pos) if stem[pos + 1..].starts_with(|c: char| c.is_ascii_digit() || c == 'v') => {
            &stem[pos + 1..]
        }
        _ => stem,
    };
    let version = candidate.strip_prefix('v').unwrap_or(candidate);

    if version.starts_with(|c: char| c.is_ascii_digit()) {
        Some(version.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_github_archive() {
        assert_eq!(
            version_from_url("https://github.com/orchat/enterprise/archive/v0.8.0.tar.gz"),
            Some("0.8.0".to_string())
        );
        assert_eq!(
            version_from_url("https://github.com/orchat/orchat/archive/refs/tags/v0.3.0.tar.gz"),
            Some("0.3.0".to_string())
        );
    }

    #[test]
    fn test_version_from_named_tarball() {
        assert_eq!(
            version_from_url("https://example.com/orchat-1.2.3.tgz"),
            Some("1.2.3".to_string())
        );
        assert_eq!(version_from_url("https://example.com/latest.tar.gz"), None);
    }

    #[test]
    fn test_checksum_parse() {
        let digest = "A".repeat(64);
        assert_eq!(Checksum::parse(&digest), Checksum::Sha256("a".repeat(64)));
        assert!(!Checksum::parse("to_be_calculated").is_resolved());
        assert!(!Checksum::parse("TODO: CALCULATE_ACTUAL_SHA256").is_resolved());
    }

    #[test]
    fn test_install_step_target() {
        assert_eq!(InstallStep::new(InstallDir::Bin, "bin/orchat").target(), "orchat");
        assert_eq!(InstallStep::new(InstallDir::Libexec, "src").target(), "src");
        assert_eq!(
            InstallStep::renamed(InstallDir::Etc, "config/orchat.toml", "orchat/orchat.toml").target(),
            "orchat/orchat.toml"
        );
    }

    #[test]
    fn test_contained_paths() {
        assert!(is_contained("bin/orchat"));
        assert!(!is_contained("../etc/passwd"));
        assert!(!is_contained("/etc/passwd"));
        assert!(!is_contained(""));
    }

    #[test]
    fn test_json_descriptor_round_trip_keeps_placeholder() {
        let json = r#"{
            "name": "orchat",
            "desc": "d",
            "homepage": "https://example.com",
            "url": "https://example.com/v1.0.0.tar.gz",
            "sha256": "to_be_calculated",
            "license": "MIT",
            "dependencies": {"curl": "required", "jq": "recommended"},
            "install": [{"dir": "bin", "source": "bin/orchat"}],
            "test": [{"kind": "run", "program": "{bin}/orchat", "args": ["--version"]}]
        }"#;
        let formula: Formula = serde_json::from_str(json).unwrap();
        assert_eq!(formula.sha256, Checksum::Unresolved("to_be_calculated".into()));
        assert_eq!(formula.dependencies_with(DependencyStrength::Recommended), vec!["jq"]);
        assert_eq!(formula.version().unwrap(), "1.0.0");
        formula.validate().unwrap();

        let back = serde_json::to_value(&formula).unwrap();
        assert_eq!(back["sha256"], "to_be_calculated");
    }

    #[test]
    fn test_entry_point() {
        let mut formula: Formula = serde_json::from_str(
            r#"{
            "name": "orchat", "desc": "", "homepage": "", "license": "MIT",
            "url": "https://example.com/v1.0.0.tar.gz", "sha256": "x",
            "install": [{"dir": "bin", "source": "bin/orchat.sh", "rename": "orchat"}]
        }"#,
        )
        .unwrap();
        assert_eq!(formula.entry_point().as_deref(), Some("orchat"));

        formula.launcher = Some(Launcher::Inreplace {
            file: "bin/chat".into(),
            pattern: "X".into(),
            replacement: "Y".into(),
        });
        assert_eq!(formula.entry_point().as_deref(), Some("chat"));
    }

    #[test]
    fn test_validate_rejects_escaping_source() {
        let json = r#"{
            "name": "orchat", "desc": "", "homepage": "", "license": "MIT",
            "url": "https://example.com/v1.0.0.tar.gz", "sha256": "x",
            "install": [{"dir": "libexec", "source": "../secrets"}]
        }"#;
        let formula: Formula = serde_json::from_str(json).unwrap();
        assert!(matches!(
            formula.validate(),
            Err(OrbrewError::InvalidFormula { .. })
        ));
    }
}
