// Test helpers for isolated install testing
// Builds a throwaway prefix and a fake orchat release archive

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use orbrew::config::Config;
use orbrew::formula::{Checksum, Formula};
use sha2::{Digest, Sha256};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Entry point answering the commands the smoke tests run
pub const BOOTSTRAP: &str = r#"#!/bin/bash
case "$1" in
  --version) echo "orchat 0.3.0" ;;
  --help) echo "usage: orchat [message] [--no-stream] [-i]" ;;
  config) [ "$2" = "list" ] && echo "model=openrouter/auto" ;;
  *) echo "unexpected: $*" >&2; exit 64 ;;
esac
"#;

/// Launcher that locates its modules through SCRIPT_DIR
pub const ORCHAT_SCRIPT: &str = r#"#!/bin/bash
SCRIPT_DIR="$(cd "$(dirname "$0")/../src" && pwd)"
exec "$SCRIPT_DIR/bootstrap.sh" "$@"
"#;

/// Isolated prefix, cache and HOME, cleaned up on drop
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub prefix: PathBuf,
    pub cache: PathBuf,
    pub home: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prefix = temp_dir.path().join("prefix");
        let cache = temp_dir.path().join("cache");
        let home = temp_dir.path().join("home");

        fs::create_dir_all(&prefix).unwrap();
        fs::create_dir_all(&home).unwrap();

        Self {
            temp_dir,
            prefix,
            cache,
            home,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            prefix: self.prefix.clone(),
            cache_dir: self.cache.clone(),
            home: self.home.clone(),
        }
    }

    /// Write a release archive `v<version>.tar.gz` with a top-level
    /// `orchat-<version>/` directory and return its path
    pub fn release_archive(&self, version: &str, extra: &[(&str, &str)]) -> PathBuf {
        let root_name = format!("orchat-{version}");
        let tree = self.temp_dir.path().join("tree").join(&root_name);
        if tree.exists() {
            fs::remove_dir_all(&tree).unwrap();
        }

        let mut files = vec![
            ("bin/orchat", ORCHAT_SCRIPT),
            ("bin/orchat.robust", ORCHAT_SCRIPT),
            ("src/bootstrap.sh", BOOTSTRAP),
            ("src/core/stream.sh", "# streaming\n"),
            ("docs/README.md", "# orchat\n"),
            ("config/orchat.toml", "model = \"openrouter/auto\"\n"),
            ("config/schema.json", "{\"type\": \"object\"}\n"),
            ("data/prompts/system.txt", "You are helpful.\n"),
        ];
        files.extend_from_slice(extra);

        for (path, contents) in files {
            let path = tree.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            if contents.starts_with("#!") {
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            }
        }

        let archive = self
            .temp_dir
            .path()
            .join("releases")
            .join(format!("v{version}.tar.gz"));
        fs::create_dir_all(archive.parent().unwrap()).unwrap();

        let file = fs::File::create(&archive).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.append_dir_all(&root_name, &tree).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        archive
    }

    /// Point a formula at a local archive with its real checksum
    pub fn localize(&self, mut formula: Formula, archive: &Path) -> Formula {
        formula.url = format!("file://{}", archive.display());
        formula.sha256 = Checksum::Sha256(sha256_hex(archive));
        formula
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sha256_hex(path: &Path) -> String {
    let bytes = fs::read(path).unwrap();
    format!("{:x}", Sha256::digest(&bytes))
}

/// Relative paths of every file under `root`, sorted
pub fn tree_listing(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_directories() {
        let env = TestEnvironment::new();
        assert!(env.prefix.exists());
        assert!(env.home.exists());
    }

    #[test]
    fn test_environment_cleanup() {
        let prefix = {
            let env = TestEnvironment::new();
            env.prefix.clone()
        };
        assert!(!prefix.exists());
    }

    #[test]
    fn test_release_archive_is_deterministic_in_name() {
        let env = TestEnvironment::new();
        let archive = env.release_archive("0.3.0", &[]);
        assert!(archive.ends_with("releases/v0.3.0.tar.gz"));
        assert_eq!(sha256_hex(&archive).len(), 64);
    }
}
