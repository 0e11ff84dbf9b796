//! Runtime configuration: install prefix, download cache and home directory.
//!
//! Resolution order for each setting is CLI flag, then environment, then the
//! built-in default:
//!
//! | Setting | Flag          | Environment                       | Default                         |
//! |---------|---------------|-----------------------------------|---------------------------------|
//! | prefix  | `--prefix`    | `ORBREW_PREFIX`, `HOMEBREW_PREFIX` | `/opt/homebrew` or `/usr/local` |
//! | cache   | `--cache-dir` | `ORBREW_CACHE`                    | `$HOME/.cache/orbrew/downloads` |

use crate::cellar;
use std::path::{Path, PathBuf};

/// Where the installed client expects its API key
pub const KEY_FILE: &str = ".config/orchat/config";

#[derive(Debug, Clone)]
pub struct Config {
    pub prefix: PathBuf,
    pub cache_dir: PathBuf,
    pub home: PathBuf,
}

impl Config {
    pub fn resolve(prefix: Option<PathBuf>, cache_dir: Option<PathBuf>) -> Self {
        let home = home_dir();
        let prefix = prefix.unwrap_or_else(cellar::detect_prefix);
        let cache_dir = cache_dir
            .or_else(|| {
                std::env::var("ORBREW_CACHE")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| default_cache_dir(&home));

        Self {
            prefix: absolutize(prefix),
            cache_dir: absolutize(cache_dir),
            home,
        }
    }

    /// Per-user key file read by the installed client
    pub fn key_file(&self) -> PathBuf {
        self.home.join(KEY_FILE)
    }
}

/// Launchers and links embed the prefix, so it must not depend on the cwd
fn absolutize(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

pub fn default_cache_dir(home: &Path) -> PathBuf {
    home.join(".cache/orbrew/downloads")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_values_win() {
        let config = Config::resolve(
            Some(PathBuf::from("/tmp/prefix")),
            Some(PathBuf::from("/tmp/cache")),
        );
        assert_eq!(config.prefix, PathBuf::from("/tmp/prefix"));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
    }

    #[test]
    fn test_relative_prefix_is_made_absolute() {
        let config = Config::resolve(
            Some(PathBuf::from("./rel")),
            Some(PathBuf::from("cache")),
        );
        let cwd = std::env::current_dir().unwrap();
        assert!(config.prefix.is_absolute());
        assert_eq!(config.prefix, cwd.join("rel"));
        assert_eq!(config.cache_dir, cwd.join("cache"));
    }

    #[test]
    fn test_key_file_under_home() {
        let config = Config {
            prefix: PathBuf::from("/p"),
            cache_dir: PathBuf::from("/c"),
            home: PathBuf::from("/home/user"),
        };
        assert_eq!(
            config.key_file(),
            PathBuf::from("/home/user/.config/orchat/config")
        );
    }

    #[test]
    fn test_default_cache_dir() {
        assert_eq!(
            default_cache_dir(Path::new("/home/user")),
            PathBuf::from("/home/user/.cache/orbrew/downloads")
        );
    }
}
