//! Installation diagnostics.
//!
//! Inspects an installed formula without running it and reports findings in
//! three sections: the executable and its module tree, the user
//! configuration (API key file and config template), and dependencies.

use crate::cellar::{self, Keg};
use crate::config::Config;
use crate::deps;
use crate::error::Result;
use crate::formula::{DependencyStrength, Formula, InstallDir, Launcher, SmokeStep};
use crate::receipt::InstallReceipt;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Executable,
    Configuration,
    Dependency,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Executable, Section::Configuration, Section::Dependency];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Executable => write!(f, "EXECUTABLE CHECK"),
            Section::Configuration => write!(f, "CONFIGURATION CHECK"),
            Section::Dependency => write!(f, "DEPENDENCY CHECK"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub section: Section,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnosis {
    pub findings: Vec<Finding>,
}

impl Diagnosis {
    fn push(&mut self, section: Section, severity: Severity, message: impl Into<String>) {
        self.findings.push(Finding {
            section,
            severity,
            message: message.into(),
        });
    }

    pub fn in_section(&self, section: Section) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.section == section)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn worst(&self) -> Severity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Ok)
    }

    /// 0 healthy, 1 warnings only, 2 errors
    pub fn exit_code(&self) -> i32 {
        match self.worst() {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }
}

pub fn diagnose(formula: &Formula, config: &Config) -> Result<Diagnosis> {
    let mut diagnosis = Diagnosis::default();

    let installed = cellar::get_installed_versions(&config.prefix, &formula.name)?;
    match installed.first() {
        Some(package) => check_executable(formula, &package.keg, &mut diagnosis),
        None => diagnosis.push(
            Section::Executable,
            Severity::Error,
            format!("{} is not installed under {}", formula.name, config.prefix.display()),
        ),
    }

    check_configuration(formula, config, &mut diagnosis);
    check_dependencies(formula, &mut diagnosis);

    Ok(diagnosis)
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

fn check_executable(formula: &Formula, keg: &Keg, diagnosis: &mut Diagnosis) {
    let section = Section::Executable;
    diagnosis.push(
        section,
        Severity::Ok,
        format!("{} {} installed at {}", formula.name, keg.version, keg.path().display()),
    );

    if let Some(entry) = formula.entry_point() {
        let launcher = keg.bin().join(&entry);
        if is_executable(&launcher) {
            diagnosis.push(section, Severity::Ok, format!("{} is executable", launcher.display()));
        } else {
            diagnosis.push(
                section,
                Severity::Error,
                format!("{} is missing or not executable", launcher.display()),
            );
        }

        let linked = keg.prefix.join("bin").join(&entry);
        if linked.exists() {
            diagnosis.push(section, Severity::Ok, format!("{} is on the prefix bin", entry));
        } else {
            diagnosis.push(
                section,
                Severity::Warning,
                format!("{} is not linked into {}", entry, keg.prefix.join("bin").display()),
            );
        }
    }

    let mut required_paths: Vec<String> = formula
        .test
        .iter()
        .filter_map(|step| match step {
            SmokeStep::AssertExists { path } => Some(keg.expand(path)),
            SmokeStep::Run { .. } => None,
        })
        .collect();
    if let Some(Launcher::Wrapper { exec, .. }) = &formula.launcher {
        required_paths.push(keg.expand(exec));
    }
    for path in required_paths {
        if Path::new(&path).exists() {
            diagnosis.push(section, Severity::Ok, format!("{path} present"));
        } else {
            diagnosis.push(section, Severity::Error, format!("{path} is missing"));
        }
    }

    match InstallReceipt::read(&keg.path()) {
        Ok(receipt) if !receipt.checksum_verified => diagnosis.push(
            section,
            Severity::Warning,
            format!(
                "installed from an unverified archive (sha256 {})",
                receipt.source_sha256
            ),
        ),
        Ok(_) => {}
        Err(_) => diagnosis.push(section, Severity::Warning, "install receipt is missing"),
    }
}

fn check_configuration(formula: &Formula, config: &Config, diagnosis: &mut Diagnosis) {
    let section = Section::Configuration;
    let key_file = config.key_file();

    match fs::metadata(&key_file) {
        Err(_) => diagnosis.push(
            section,
            Severity::Warning,
            format!("API key file {} not found", key_file.display()),
        ),
        Ok(metadata) => {
            if metadata.len() == 0 {
                diagnosis.push(
                    section,
                    Severity::Warning,
                    format!("API key file {} is empty", key_file.display()),
                );
            } else {
                diagnosis.push(
                    section,
                    Severity::Ok,
                    format!("API key file {} present", key_file.display()),
                );
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mode = metadata.permissions().mode() & 0o777;
                if mode & 0o077 != 0 {
                    diagnosis.push(
                        section,
                        Severity::Warning,
                        format!(
                            "API key file is readable by others (mode {:o}); run chmod 600 {}",
                            mode,
                            key_file.display()
                        ),
                    );
                }
            }
        }
    }

    let etc = config.prefix.join("etc");
    for step in formula.install.iter().filter(|s| s.dir == InstallDir::Etc) {
        let path = etc.join(step.target());
        if path.exists() {
            diagnosis.push(section, Severity::Ok, format!("{} present", path.display()));
        } else {
            diagnosis.push(
                section,
                Severity::Warning,
                format!("config template {} is missing", path.display()),
            );
        }
    }
}

fn check_dependencies(formula: &Formula, diagnosis: &mut Diagnosis) {
    for status in deps::check(formula) {
        let (severity, message) = match (&status.found, status.strength) {
            (Some(path), _) => (
                Severity::Ok,
                format!("{} found at {}", status.name, path.display()),
            ),
            (None, DependencyStrength::Required) => (
                Severity::Error,
                format!("required dependency {} not found", status.name),
            ),
            (None, DependencyStrength::Recommended) => (
                Severity::Warning,
                format!("recommended dependency {} not found", status.name),
            ),
        };
        diagnosis.push(Section::Dependency, severity, message);
    }
}
