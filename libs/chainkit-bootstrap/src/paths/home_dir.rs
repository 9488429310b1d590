use std::{
    env, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("HOME environment variable is not set")]
    HomeMissing,
    #[error("APPDATA environment variable is not set")]
    AppDataMissing,
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(target_os = "windows")]
fn user_home() -> Result<String, HomeDirError> {
    env::var("USERPROFILE")
        .or_else(|_| env::var("HOME"))
        .map_err(|_| HomeDirError::HomeMissing)
}

#[cfg(not(target_os = "windows"))]
fn user_home() -> Result<String, HomeDirError> {
    env::var("HOME").map_err(|_| HomeDirError::HomeMissing)
}

#[cfg(target_os = "windows")]
fn platform_base() -> Result<String, HomeDirError> {
    env::var("APPDATA").map_err(|_| HomeDirError::AppDataMissing)
}

#[cfg(not(target_os = "windows"))]
fn platform_base() -> Result<String, HomeDirError> {
    user_home()
}

fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return Ok(PathBuf::from(user_home()?));
    }
    let rest = raw
        .strip_prefix("~/")
        .or_else(|| raw.strip_prefix("~\\").filter(|_| cfg!(target_os = "windows")));
    match rest {
        Some(rest) => Ok(Path::new(&user_home()?).join(rest)),
        None => Ok(PathBuf::from(raw)),
    }
}

/// Resolve the host home directory.
///
/// - `config_home` given: `~` is expanded to the user's home, and the result
///   must be absolute.
/// - otherwise `$HOME/<default_subdir>` (`%APPDATA%` on Windows).
///
/// With `create`, the directory is created if missing.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match config_home {
        Some(raw) => {
            let expanded = expand_tilde(&raw)?;
            if !expanded.is_absolute() {
                return Err(HomeDirError::AbsoluteRequired(
                    expanded.to_string_lossy().into(),
                ));
            }
            expanded
        }
        None => Path::new(&platform_base()?).join(default_subdir),
    };

    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("nested").join("home");

        let result = resolve_home_dir(
            Some(target.to_string_lossy().into_owned()),
            ".chainkit",
            true,
        )
        .unwrap();

        assert_eq!(result, target);
        assert!(target.is_dir());
    }

    #[test]
    fn create_false_does_not_touch_disk() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("not-created");

        let result = resolve_home_dir(
            Some(target.to_string_lossy().into_owned()),
            ".chainkit",
            false,
        )
        .unwrap();

        assert_eq!(result, target);
        assert!(!target.exists());
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn relative_path_is_rejected() {
        let err = resolve_home_dir(Some("relative/dir".into()), ".chainkit", false).unwrap_err();
        assert!(matches!(err, HomeDirError::AbsoluteRequired(ref p) if p == "relative/dir"));
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn tilde_expands_against_home() {
        // HOME is whatever the test process has; only the shape is checked.
        let Ok(home) = env::var("HOME") else {
            return;
        };
        let result = resolve_home_dir(Some("~/chainkit-test".into()), ".chainkit", false).unwrap();
        assert_eq!(result, Path::new(&home).join("chainkit-test"));

        let only = resolve_home_dir(Some("~".into()), ".chainkit", false).unwrap();
        assert_eq!(only, PathBuf::from(home));
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn default_uses_subdir_under_home() {
        let Ok(home) = env::var("HOME") else {
            return;
        };
        let result = resolve_home_dir(None, ".chainkit", false).unwrap();
        assert_eq!(result, Path::new(&home).join(".chainkit"));
    }
}
