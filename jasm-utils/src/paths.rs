//! Path utilities for jasm
//!
//! Resolves the XDG state directory that holds the daemon's log files.
//!
//! Location: `$XDG_STATE_HOME/jasm` or `~/.local/state/jasm`

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::{JasmError, Result};

/// Application directory appended to the state base
pub const APP_DIR: &str = "jasm";

/// Environment variable overriding the state base
pub const STATE_HOME_ENV: &str = "XDG_STATE_HOME";

/// State base relative to the home directory when the override is unset
pub const STATE_HOME_DEFAULT: &str = ".local/state";

/// Permission bits for the state directory
#[cfg(unix)]
const STATE_DIR_MODE: u32 = 0o700;

/// Get the state directory, creating it if necessary
///
/// Reads `XDG_STATE_HOME`; when it is unset falls back to
/// `~/.local/state`. Any value of the variable, empty included, counts as set.
pub fn state_dir() -> Result<PathBuf> {
    resolve_state_dir(state_home_from_env(), home_dir, APP_DIR)
}

/// The `XDG_STATE_HOME` override, if set
pub fn state_home_from_env() -> Option<OsString> {
    std::env::var_os(STATE_HOME_ENV)
}

/// Resolve and create `<state_home>/<app_dir>` from explicit inputs
///
/// `home` is only consulted when `state_home` is `None`.
pub fn resolve_state_dir<F>(
    state_home: Option<OsString>,
    home: F,
    app_dir: &str,
) -> Result<PathBuf>
where
    F: FnOnce() -> Option<PathBuf>,
{
    let dir = state_base(state_home, home)?.join(app_dir);
    ensure_private_dir(&dir)?;
    tracing::debug!(path = %dir.display(), "state directory ready");
    Ok(dir)
}

/// Compute the state base without touching the filesystem
pub fn state_base<F>(state_home: Option<OsString>, home: F) -> Result<PathBuf>
where
    F: FnOnce() -> Option<PathBuf>,
{
    match state_home {
        Some(base) => Ok(PathBuf::from(base)),
        None => home()
            .map(|h| h.join(STATE_HOME_DEFAULT))
            .ok_or(JasmError::HomeDirNotFound),
    }
}

/// Ensure a directory exists, creating it and its parents owner-only
///
/// An existing directory is success. An existing non-directory is not.
pub fn ensure_private_dir(path: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(STATE_DIR_MODE);
    }

    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(JasmError::CreateDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// The user's home directory, if it can be determined
pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ==================== state_base Tests ====================

    #[test]
    fn test_state_base_uses_override() {
        let base = state_base(Some("/var/lib/state".into()), || {
            panic!("home must not be consulted when the override is set")
        })
        .unwrap();
        assert_eq!(base, PathBuf::from("/var/lib/state"));
    }

    #[test]
    fn test_state_base_falls_back_to_home() {
        let base = state_base(None, || Some(PathBuf::from("/home/u"))).unwrap();
        assert_eq!(base, PathBuf::from("/home/u/.local/state"));
    }

    #[test]
    fn test_state_base_empty_override_counts_as_set() {
        let base = state_base(Some(OsString::new()), || Some(PathBuf::from("/home/u"))).unwrap();
        assert_eq!(base, PathBuf::new());
    }

    #[test]
    fn test_state_base_without_home() {
        let err = state_base(None, || None).unwrap_err();
        assert!(matches!(err, JasmError::HomeDirNotFound));
    }

    // ==================== resolve_state_dir Tests ====================

    #[test]
    fn test_resolve_with_override() {
        let temp = TempDir::new().unwrap();
        let dir = resolve_state_dir(Some(temp.path().into()), || None, APP_DIR).unwrap();

        assert_eq!(dir, temp.path().join("jasm"));
        assert!(dir.ends_with(APP_DIR));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_resolve_from_home() {
        let home = TempDir::new().unwrap();
        let home_path = home.path().to_path_buf();
        let dir = resolve_state_dir(None, move || Some(home_path), APP_DIR).unwrap();

        assert_eq!(dir, home.path().join(".local/state/jasm"));
        assert!(dir.ends_with(APP_DIR));
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_creates_owner_only_dir() {
        use std::os::unix::fs::PermissionsExt;

        let home = TempDir::new().unwrap();
        let home_path = home.path().to_path_buf();
        let dir = resolve_state_dir(None, move || Some(home_path), APP_DIR).unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let first = resolve_state_dir(Some(temp.path().into()), || None, APP_DIR).unwrap();
        let second = resolve_state_dir(Some(temp.path().into()), || None, APP_DIR).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_without_home_fails() {
        let err = resolve_state_dir(None, || None, APP_DIR).unwrap_err();
        assert!(matches!(err, JasmError::HomeDirNotFound));
    }

    // ==================== ensure_private_dir Tests ====================

    #[test]
    fn test_ensure_private_dir_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b").join("c");

        ensure_private_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_private_dir_already_exists() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("existing");
        std::fs::create_dir_all(&existing).unwrap();

        assert!(ensure_private_dir(&existing).is_ok());
    }

    #[test]
    fn test_ensure_private_dir_over_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("jasm");
        std::fs::write(&file, b"not a directory").unwrap();

        let err = ensure_private_dir(&file).unwrap_err();
        assert!(matches!(err, JasmError::CreateDir { .. }));
        assert_eq!(err.path(), Some(&file));
    }

    // ==================== home_dir Tests ====================

    #[test]
    fn test_home_dir_is_absolute() {
        if let Some(home) = home_dir() {
            assert!(home.is_absolute(), "Home should be absolute: {:?}", home);
        }
    }
}
