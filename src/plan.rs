// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Castle-relative path planning.
//!
//! A file living in the home directory maps onto exactly one location inside
//! a castle: the same path relative to the castle root as the file has
//! relative to the home directory. So `~/.config/nvim/init.lua` tracked by
//! castle "dotfiles" belongs at `<dotfiles>/home/.config/nvim/init.lua`.
//!
//! Planning is lexical. No file system access is performed when computing
//! a target, only when inspecting a [`TrackedPath`].

use crate::castle::Castle;

use std::{
    fs::symlink_metadata,
    path::{Component, Path, PathBuf},
};

/// Path in the home directory believed to be owned by a castle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPath {
    /// Normalized absolute path.
    pub absolute_path: PathBuf,

    /// Path relative to the home directory.
    pub relative_to_home: PathBuf,

    /// Whether the path is a real directory (symlinks are not followed).
    pub is_directory: bool,

    /// Whether the path itself is a symlink.
    pub is_symlink: bool,
}

impl TrackedPath {
    /// Inspect a path under the home directory.
    ///
    /// # Errors
    ///
    /// - Return [`PlanError::InvalidPath`] if path is not below `home`.
    /// - Return [`PlanError::Inspect`] if path metadata cannot be read.
    pub fn inspect(path: impl AsRef<Path>, home: impl AsRef<Path>) -> Result<Self> {
        let absolute_path = normalize(path.as_ref());
        let relative_to_home = relative_to(&absolute_path, home.as_ref())?;
        let metadata = symlink_metadata(&absolute_path).map_err(|err| PlanError::Inspect {
            source: err,
            path: absolute_path.clone(),
        })?;

        Ok(Self {
            absolute_path,
            relative_to_home,
            is_directory: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
        })
    }
}

/// Where a home directory file lives, or would live, inside a castle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedTarget {
    /// Directory of the file relative to the home directory, `.` at the top.
    pub relative_dir: PathBuf,

    /// Directory inside the castle that holds the file.
    pub castle_path: PathBuf,

    /// Full path the file occupies once tracked.
    pub target: PathBuf,
}

/// Resolve the castle location of a file in the home directory.
///
/// # Errors
///
/// - Return [`PlanError::InvalidPath`] if `file` is not a strict descendant of
///   `home`.
pub fn resolve_tracked_target(
    file: impl AsRef<Path>,
    home: impl AsRef<Path>,
    castle: &Castle,
) -> Result<TrackedTarget> {
    let file = normalize(file.as_ref());
    let relative = relative_to(&file, home.as_ref())?;

    // INVARIANT: relative path is never empty, so it always has a file name.
    let basename = relative
        .file_name()
        .ok_or_else(|| PlanError::InvalidPath {
            path: file.clone(),
            home: home.as_ref().to_path_buf(),
        })?
        .to_owned();

    let (relative_dir, castle_path) = match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            (parent.to_path_buf(), castle.root_dir().join(parent))
        }
        _ => (PathBuf::from("."), castle.root_dir().to_path_buf()),
    };
    let target = castle_path.join(basename);

    Ok(TrackedTarget {
        relative_dir,
        castle_path,
        target,
    })
}

/// Lexically normalize a path by folding `.` and `..` components.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => continue,
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other.as_os_str()),
        }
    }

    normal
}

fn relative_to(path: &Path, home: &Path) -> Result<PathBuf> {
    let home = normalize(home);
    let invalid = || PlanError::InvalidPath {
        path: path.to_path_buf(),
        home: home.clone(),
    };

    if !path.is_absolute() {
        return Err(invalid());
    }

    match path.strip_prefix(&home) {
        Ok(relative) if !relative.as_os_str().is_empty() => Ok(relative.to_path_buf()),
        _ => Err(invalid()),
    }
}

/// Path planning error types.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Path is not a descendant of the home directory.
    #[error("{:?} is not inside home directory {:?}", path.display(), home.display())]
    InvalidPath { path: PathBuf, home: PathBuf },

    /// Path metadata cannot be read.
    #[error("failed to inspect {:?}", path.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = PlanError> = std::result::Result<T, E>;
