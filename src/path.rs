// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the user's home directory lives, and where castles are
//! kept on disk. Nothing here touches the file system beyond asking the
//! platform for well-known directories.

use std::path::{Path, PathBuf};

/// Name of the directory inside a castle repository that mirrors the home
/// directory.
pub const CASTLE_HOME: &str = "home";

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to the castle root directory.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/castellan` as the default
/// absolute path where castles are kept. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_castle_root() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("castellan"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the user configuration file.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("castellan").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Resolved locations of the home directory and castle root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    home: PathBuf,
    castle_root: PathBuf,
}

impl PathConfig {
    /// Construct new path configuration from explicit locations.
    pub fn new(home: impl Into<PathBuf>, castle_root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            castle_root: castle_root.into(),
        }
    }

    /// Construct path configuration from platform defaults.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if home directory path cannot be determined.
    pub fn try_default() -> Result<Self> {
        Ok(Self::new(home_dir()?, default_castle_root()?))
    }

    /// Absolute path to the home directory.
    pub fn home_dir(&self) -> &Path {
        self.home.as_path()
    }

    /// Directory holding every castle repository.
    pub fn castle_root(&self) -> &Path {
        self.castle_root.as_path()
    }

    /// Repository directory of a named castle.
    pub fn castle_repo(&self, name: impl AsRef<Path>) -> PathBuf {
        self.castle_root.join(name)
    }

    /// Directory of a named castle that mirrors the home directory.
    pub fn castle_dir(&self, name: impl AsRef<Path>) -> PathBuf {
        self.castle_repo(name).join(CASTLE_HOME)
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
