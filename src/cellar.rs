//! Cellar layout - where a formula's files land, and what is already installed

use crate::formula::InstallDir;
use crate::receipt::InstallReceipt;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Detect the install prefix on this system
pub fn detect_prefix() -> PathBuf {
    for var in ["ORBREW_PREFIX", "HOMEBREW_PREFIX"] {
        if let Ok(prefix) = std::env::var(var)
            && !prefix.is_empty()
        {
            return PathBuf::from(prefix);
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        PathBuf::from("/opt/homebrew")
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        PathBuf::from("/usr/local")
    }
}

/// Get the Cellar directory under a prefix
pub fn cellar_path(prefix: &Path) -> PathBuf {
    prefix.join("Cellar")
}

/// Install layout of one formula version.
///
/// ```text
/// <prefix>/Cellar/<name>/<version>/
///   bin/               bin
///   libexec/           libexec
///   share/doc/<name>/  doc
///   share/<name>/      pkgshare
/// <prefix>/etc/        etc (shared, survives reinstall)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keg {
    pub prefix: PathBuf,
    pub name: String,
    pub version: String,
}

impl Keg {
    pub fn new(prefix: &Path, name: &str, version: &str) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Keg root, `<prefix>/Cellar/<name>/<version>`
    pub fn path(&self) -> PathBuf {
        cellar_path(&self.prefix).join(&self.name).join(&self.version)
    }

    pub fn bin(&self) -> PathBuf {
        self.path().join("bin")
    }

    pub fn libexec(&self) -> PathBuf {
        self.path().join("libexec")
    }

    pub fn doc(&self) -> PathBuf {
        self.path().join("share/doc").join(&self.name)
    }

    pub fn pkgshare(&self) -> PathBuf {
        self.path().join("share").join(&self.name)
    }

    pub fn etc(&self) -> PathBuf {
        self.prefix.join("etc")
    }

    pub fn dir(&self, dir: InstallDir) -> PathBuf {
        match dir {
            InstallDir::Bin => self.bin(),
            InstallDir::Libexec => self.libexec(),
            InstallDir::Doc => self.doc(),
            InstallDir::Etc => self.etc(),
            InstallDir::Pkgshare => self.pkgshare(),
        }
    }

    /// Expand `{prefix}`, `{bin}`, `{libexec}`, `{doc}`, `{etc}` and
    /// `{pkgshare}` in a formula template
    pub fn expand(&self, template: &str) -> String {
        let substitutions = [
            ("{prefix}", self.prefix.clone()),
            ("{bin}", self.bin()),
            ("{libexec}", self.libexec()),
            ("{doc}", self.doc()),
            ("{etc}", self.etc()),
            ("{pkgshare}", self.pkgshare()),
        ];

        substitutions
            .iter()
            .fold(template.to_string(), |acc, (key, path)| {
                acc.replace(key, &path.to_string_lossy())
            })
    }

    pub fn exists(&self) -> bool {
        self.path().is_dir()
    }
}

/// An installed keg in the Cellar
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub keg: Keg,
    pub receipt: Option<InstallReceipt>,
}

/// Read all installed kegs under a prefix
pub fn list_installed(prefix: &Path) -> Result<Vec<InstalledPackage>> {
    let cellar = cellar_path(prefix);

    if !cellar.exists() {
        return Ok(vec![]);
    }

    let mut packages = Vec::new();

    for entry in fs::read_dir(&cellar)
        .with_context(|| format!("Failed to read Cellar: {}", cellar.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        packages.extend(get_installed_versions(prefix, &name)?);
    }

    packages.sort_by(|a, b| a.keg.name.cmp(&b.keg.name));
    Ok(packages)
}

/// Get all installed versions of a formula, newest first
pub fn get_installed_versions(prefix: &Path, name: &str) -> Result<Vec<InstalledPackage>> {
    let formula_path = cellar_path(prefix).join(name);

    if !formula_path.exists() {
        return Ok(vec![]);
    }

    let mut packages = Vec::new();

    for entry in fs::read_dir(&formula_path)
        .with_context(|| format!("Failed to read {}", formula_path.display()))?
    {
        let entry = entry?;
        let version = entry.file_name().to_string_lossy().to_string();

        if version.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        let keg = Keg::new(prefix, name, &version);
        let receipt = InstallReceipt::read(&keg.path()).ok();
        packages.push(InstalledPackage { keg, receipt });
    }

    packages.sort_by(|a, b| compare_versions(&b.keg.version, &a.keg.version));

    Ok(packages)
}

/// Compare two version strings numerically, component by component
pub fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let a_parts: Vec<u32> = a.split('.').filter_map(|s| s.parse::<u32>().ok()).collect();
    let b_parts: Vec<u32> = b.split('.').filter_map(|s| s.parse::<u32>().ok()).collect();

    for i in 0..a_parts.len().max(b_parts.len()) {
        let a_part = a_parts.get(i).unwrap_or(&0);
        let b_part = b_parts.get(i).unwrap_or(&0);
        match a_part.cmp(b_part) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }

    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_keg_layout() {
        let keg = Keg::new(Path::new("/opt/homebrew"), "orchat", "0.3.0");
        assert_eq!(keg.path(), PathBuf::from("/opt/homebrew/Cellar/orchat/0.3.0"));
        assert_eq!(
            keg.libexec(),
            PathBuf::from("/opt/homebrew/Cellar/orchat/0.3.0/libexec")
        );
        assert_eq!(
            keg.doc(),
            PathBuf::from("/opt/homebrew/Cellar/orchat/0.3.0/share/doc/orchat")
        );
        assert_eq!(
            keg.pkgshare(),
            PathBuf::from("/opt/homebrew/Cellar/orchat/0.3.0/share/orchat")
        );
        assert_eq!(keg.etc(), PathBuf::from("/opt/homebrew/etc"));
    }

    #[test]
    fn test_expand_template() {
        let keg = Keg::new(Path::new("/usr/local"), "orchat", "0.3.0");
        assert_eq!(
            keg.expand("SCRIPT_DIR=\"{libexec}/src\""),
            "SCRIPT_DIR=\"/usr/local/Cellar/orchat/0.3.0/libexec/src\""
        );
        assert_eq!(keg.expand("no placeholders"), "no placeholders");
    }

    #[test]
    fn test_compare_versions() {
        use std::cmp::Ordering;
        assert_eq!(compare_versions("0.10.0", "0.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("0.3.0", "0.3.0"), Ordering::Equal);
        assert_eq!(compare_versions("0.3", "0.3.1"), Ordering::Less);
    }

    #[test]
    fn test_installed_versions_newest_first() {
        let temp = TempDir::new().unwrap();
        for version in ["0.3.0", "0.10.0", "0.8.0"] {
            fs::create_dir_all(cellar_path(temp.path()).join("orchat").join(version)).unwrap();
        }

        let versions = get_installed_versions(temp.path(), "orchat").unwrap();
        let names: Vec<_> = versions.iter().map(|p| p.keg.version.as_str()).collect();
        assert_eq!(names, vec!["0.10.0", "0.8.0", "0.3.0"]);
        assert!(versions.iter().all(|p| p.receipt.is_none()));
    }

    #[test]
    fn test_list_installed_empty_prefix() {
        let temp = TempDir::new().unwrap();
        assert!(list_installed(temp.path()).unwrap().is_empty());
    }
}
