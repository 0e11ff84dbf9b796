//! Launcher generation: wrapper scripts and in-place path rewriting.
//!
//! A formula produces its entry point in one of two ways:
//!
//! - **Wrapper**: write a fresh `bin/<name>` that exports environment
//!   variables pointing into the keg and `exec`s the real entry point:
//!
//!   ```text
//!   #!/bin/bash
//!   export ORCHAT_HOME="/opt/homebrew/Cellar/orchat-enterprise/0.8.0/libexec"
//!   exec "/opt/homebrew/Cellar/orchat-enterprise/0.8.0/libexec/src/bootstrap.sh" "$@"
//!   ```
//!
//! - **Inreplace**: rewrite a line of an already-installed script, e.g.
//!   `SCRIPT_DIR=...` becomes `SCRIPT_DIR="<libexec>/src"`. A pattern that
//!   matches nothing is an error, as with Homebrew's `inreplace`.

use crate::cellar::Keg;
use crate::error::{OrbrewError, Result};
use crate::formula::Launcher;
use anyhow::Context;
use regex::{NoExpand, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Quote a value for use inside double quotes in a shell script
fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render a wrapper script for the given keg
pub fn render_wrapper(env: &BTreeMap<String, String>, exec: &str, keg: &Keg) -> String {
    let mut script = String::from("#!/bin/bash\n");
    for (key, value) in env {
        script.push_str(&format!(
            "export {}=\"{}\"\n",
            key,
            shell_escape(&keg.expand(value))
        ));
    }
    script.push_str(&format!(
        "exec \"{}\" \"$@\"\n",
        shell_escape(&keg.expand(exec))
    ));
    script
}

/// Write an executable script, replacing whatever was at `path`
pub fn write_executable(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if path.symlink_metadata().is_ok() {
        fs::remove_file(path).with_context(|| format!("Failed to replace {}", path.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    set_executable(path)?;
    Ok(())
}

#[cfg(unix)]
pub(crate) fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
        .with_context(|| format!("Failed to make {} executable", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Replace every match of `pattern` in `path` with the literal `replacement`
pub fn inreplace(path: &Path, pattern: &str, replacement: &str) -> Result<usize> {
    let regex = Regex::new(pattern)?;
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let count = regex.find_iter(&contents).count();
    if count == 0 {
        return Err(OrbrewError::InreplaceFailed {
            file: path.display().to_string(),
            pattern: pattern.to_string(),
        });
    }

    let updated = regex.replace_all(&contents, NoExpand(replacement));
    let permissions = fs::metadata(path)?.permissions();
    fs::write(path, updated.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    fs::set_permissions(path, permissions)?;

    debug!("inreplace {}: {} match(es)", path.display(), count);
    Ok(count)
}

/// Produce the launcher inside the keg, returning the file it touched
pub fn apply(launcher: &Launcher, keg: &Keg) -> Result<PathBuf> {
    match launcher {
        Launcher::Wrapper { name, env, exec } => {
            let path = keg.bin().join(name);
            write_executable(&path, &render_wrapper(env, exec, keg))?;
            debug!("Wrote wrapper {}", path.display());
            Ok(path)
        }
        Launcher::Inreplace {
            file,
            pattern,
            replacement,
        } => {
            let path = keg.path().join(file);
            inreplace(&path, pattern, &keg.expand(replacement))?;
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_wrapper() {
        let keg = Keg::new(Path::new("/usr/local"), "orchat-enterprise", "0.8.0");
        let env = BTreeMap::from([("ORCHAT_HOME".to_string(), "{libexec}".to_string())]);
        let script = render_wrapper(&env, "{libexec}/src/bootstrap.sh", &keg);
        assert_eq!(
            script,
            "#!/bin/bash\n\
             export ORCHAT_HOME=\"/usr/local/Cellar/orchat-enterprise/0.8.0/libexec\"\n\
             exec \"/usr/local/Cellar/orchat-enterprise/0.8.0/libexec/src/bootstrap.sh\" \"$@\"\n"
        );
    }

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("/a b/c"), "/a b/c");
        assert_eq!(shell_escape("a\"$b`"), "a\\\"\\$b\\`");
    }

    #[test]
    fn test_inreplace_rewrites_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("orchat");
        fs::write(
            &path,
            "#!/bin/bash\nSCRIPT_DIR=\"$(dirname \"$0\")/../src\"\nexec \"$SCRIPT_DIR/bootstrap.sh\" \"$@\"\n",
        )
        .unwrap();

        let count = inreplace(&path, "SCRIPT_DIR=.*", "SCRIPT_DIR=\"/keg/libexec/src\"").unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#!/bin/bash\nSCRIPT_DIR=\"/keg/libexec/src\"\nexec \"$SCRIPT_DIR/bootstrap.sh\" \"$@\"\n"
        );
    }

    #[test]
    fn test_inreplace_keeps_dollar_literal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("script");
        fs::write(&path, "X=1\n").unwrap();
        inreplace(&path, "X=.*", "X=$HOME").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "X=$HOME\n");
    }

    #[test]
    fn test_inreplace_without_match_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("orchat");
        fs::write(&path, "#!/bin/bash\necho hi\n").unwrap();
        assert!(matches!(
            inreplace(&path, "SCRIPT_DIR=.*", "x"),
            Err(OrbrewError::InreplaceFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_executable_replaces_existing() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bin/orchat");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "old").unwrap();

        write_executable(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o111, 0o111);
    }
}
