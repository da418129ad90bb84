// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Castle domain representation.
//!
//! A __castle__ is a version-controlled repository holding a user's dotfiles.
//! Tracked files live below a `home` directory at the top-level of the
//! repository, laid out exactly as they appear relative to the user's home
//! directory. So `<castle>/home/.vimrc` is projected to `~/.vimrc`.
//!
//! # Castle Layout
//!
//! ```text
//! <castle_root>/
//! └── dotfiles/              <- castle repository
//!     ├── .homesick_subdir   <- subdir registry
//!     └── home/              <- castle root directory
//!         ├── .vimrc
//!         └── .config/
//!             └── nvim/
//! ```
//!
//! # Subdirectories
//!
//! By default every top-level entry of the castle root directory is linked
//! into the home directory as a whole. That does not work for directories
//! like `~/.config` that hold files owned by many programs. Directories
//! listed in the subdir registry have their _contents_ linked one by one
//! instead. See [`subdir`] for the registry itself.

pub mod subdir;
pub mod vcs;

use crate::{castle::subdir::SubdirRegistry, path::CASTLE_HOME};

use std::{
    collections::HashSet,
    fs::read_dir,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// File name of the subdir registry inside a castle repository.
pub const SUBDIR_FILENAME: &str = ".homesick_subdir";

/// A castle of dotfiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Castle {
    name: String,
    repo_dir: PathBuf,
    root_dir: PathBuf,
}

impl Castle {
    /// Construct new castle from its name and repository directory.
    pub fn new(name: impl Into<String>, repo_dir: impl Into<PathBuf>) -> Self {
        let repo_dir = repo_dir.into();
        let root_dir = repo_dir.join(CASTLE_HOME);
        Self {
            name: name.into(),
            repo_dir,
            root_dir,
        }
    }

    /// Name of castle.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Repository directory of castle.
    pub fn repo_dir(&self) -> &Path {
        self.repo_dir.as_path()
    }

    /// Directory mirroring the home directory.
    pub fn root_dir(&self) -> &Path {
        self.root_dir.as_path()
    }

    /// Check if castle has a root directory on disk.
    pub fn exists(&self) -> bool {
        self.root_dir.is_dir()
    }

    /// Subdir registry of castle.
    pub fn subdirs(&self) -> SubdirRegistry {
        SubdirRegistry::new(self.repo_dir.join(SUBDIR_FILENAME))
    }

    /// List every entry that should be linked into the home directory.
    ///
    /// Covers the top-level of the root directory plus the contents of each
    /// registered subdir. A registered subdir, and any of its ancestors, is
    /// never itself an entry. Registered subdirs missing on disk are skipped.
    /// Entries come back sorted per directory.
    ///
    /// # Errors
    ///
    /// - Return [`CastleError::ReadDir`] if a directory cannot be listed.
    pub fn entries(&self, subdirs: &[PathBuf]) -> Result<Vec<CastleEntry>> {
        let ignored = subdirs
            .iter()
            .flat_map(|subdir| subdir.ancestors())
            .filter(|ancestor| !ancestor.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect::<HashSet<_>>();

        let mut bases = vec![PathBuf::new()];
        bases.extend(subdirs.iter().cloned());

        let mut entries = Vec::new();
        for base in bases {
            let dir = self.root_dir.join(&base);
            let listing = match read_dir(&dir) {
                Ok(listing) => listing,
                Err(err) if err.kind() == ErrorKind::NotFound && !base.as_os_str().is_empty() => {
                    continue
                }
                Err(err) => {
                    return Err(CastleError::ReadDir {
                        source: err,
                        path: dir,
                    })
                }
            };

            let mut names = Vec::new();
            for entry in listing {
                let entry = entry.map_err(|err| CastleError::ReadDir {
                    source: err,
                    path: dir.clone(),
                })?;
                names.push(entry.file_name());
            }
            names.sort();

            for name in names {
                let relative_path = base.join(&name);
                if ignored.contains(&relative_path) {
                    continue;
                }

                entries.push(CastleEntry {
                    absolute_path: dir.join(&name),
                    relative_path,
                });
            }
        }

        Ok(entries)
    }
}

/// Linkable entry of a castle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastleEntry {
    /// Path inside the castle.
    pub absolute_path: PathBuf,

    /// Path relative to the castle root directory, and thus to home.
    pub relative_path: PathBuf,
}

/// Castle error types.
#[derive(Debug, thiserror::Error)]
pub enum CastleError {
    /// Directory listing failed.
    #[error("failed to list directory {:?}", path.display())]
    ReadDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = CastleError> = std::result::Result<T, E>;
