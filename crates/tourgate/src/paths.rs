//! Filesystem layout helpers for tourgate.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::error::GateError;

/// Environment variable that overrides the default root directory.
const ROOT_ENV_KEY: &str = "TOURGATE_ROOT";
const DEFAULT_ROOT_DIRNAME: &str = ".tourgate";

/// Descriptor for the on-disk directory structure.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
    locales_dir: PathBuf,
    logs_dir: PathBuf,
    state_dir: PathBuf,
}

impl Layout {
    /// Construct a new layout without touching the filesystem.
    pub fn new(root: PathBuf) -> Self {
        let locales_dir = root.join("locales");
        let logs_dir = root.join("logs");
        let state_dir = root.join("state");

        Self { root, locales_dir, logs_dir, state_dir }
    }

    /// Ensure that all directories exist on disk.
    pub fn ensure(&self) -> Result<(), GateError> {
        for dir in [self.root(), self.locales_dir(), self.logs_dir(), self.state_dir()] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|source| GateError::CreateDirectory {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one JSON message bundle per language.
    pub fn locales_dir(&self) -> &Path {
        &self.locales_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Directory that stores runtime state (sockets, pid files).
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path to the gateway config file.
    pub fn config_path(&self) -> PathBuf {
        self.root().join("config.toml")
    }

    /// Path to the RPC socket file.
    pub fn rpc_socket_path(&self) -> PathBuf {
        self.state_dir().join("gateway.rpc.sock")
    }
}

/// Determine the default root directory for tourgate.
pub fn default_root() -> Result<PathBuf, GateError> {
    if let Ok(value) = env::var(ROOT_ENV_KEY) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }

    let home = user_home_dir().ok_or(GateError::HomeDirectoryUnknown)?;
    Ok(home.join(DEFAULT_ROOT_DIRNAME))
}

fn user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_all_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("root"));
        layout.ensure().unwrap();
        assert!(layout.locales_dir().is_dir());
        assert!(layout.logs_dir().is_dir());
        assert!(layout.state_dir().is_dir());
    }

    #[test]
    fn derived_paths_hang_off_the_root() {
        let layout = Layout::new(PathBuf::from("/srv/tourgate"));
        assert_eq!(layout.config_path(), PathBuf::from("/srv/tourgate/config.toml"));
        assert_eq!(
            layout.rpc_socket_path(),
            PathBuf::from("/srv/tourgate/state/gateway.rpc.sock")
        );
    }
}
