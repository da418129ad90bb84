// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Subdir registry handling.
//!
//! Utilities to manage the list of directories whose contents are linked one
//! entry at a time instead of as a whole.
//!
//! # Why Subdirs?
//!
//! Tracking `~/.config/nvim/init.lua` puts the file at
//! `<castle>/home/.config/nvim/init.lua`. Linking the top-level `.config`
//! directory of the castle into the home directory would then hide every
//! other program's configuration behind a single symlink. Recording
//! `.config/nvim` in the registry makes the link step descend into it, so
//! only `~/.config/nvim/init.lua` becomes a symlink.
//!
//! # Registry File Layout
//!
//! The registry lives at the top-level of a castle repository, one directory
//! per line, each relative to the castle root directory. Order carries no
//! meaning, and duplicate lines are collapsed. A missing file is the same as
//! an empty one.

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

/// Manage the subdir registry file of a castle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubdirRegistry {
    registry_path: PathBuf,
}

impl SubdirRegistry {
    /// Construct new subdir registry manager.
    ///
    /// Does not create the registry file.
    pub fn new(registry_path: impl Into<PathBuf>) -> Self {
        Self {
            registry_path: registry_path.into(),
        }
    }

    /// Path to the registry file.
    pub fn path(&self) -> &Path {
        self.registry_path.as_path()
    }

    /// List currently registered subdirs in sorted order.
    ///
    /// # Errors
    ///
    /// - Return [`SubdirError::ReadRegistry`] if registry file cannot be read.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        Ok(self.read()?.records.into_iter().collect())
    }

    /// Edit registered subdirs.
    ///
    /// Read current records into a [`SubdirEdit`], let the editor modify
    /// them, then write the result back if anything changed. Returns whether
    /// the registry was written.
    ///
    /// # Errors
    ///
    /// - Return [`SubdirError::ReadRegistry`] if registry file cannot be read.
    /// - Return [`SubdirError::WriteRegistry`] if registry file cannot be
    ///   written.
    pub fn edit<E>(&self, editor: E) -> Result<bool>
    where
        E: FnOnce(&mut SubdirEdit),
    {
        let mut records = self.read()?;
        editor(&mut records);

        if !records.changed {
            return Ok(false);
        }

        write(&self.registry_path, records.to_string().as_bytes()).map_err(|err| {
            SubdirError::WriteRegistry {
                source: err,
                registry_path: self.registry_path.clone(),
            }
        })?;

        Ok(true)
    }

    fn read(&self) -> Result<SubdirEdit> {
        match read_to_string(&self.registry_path) {
            Ok(content) => Ok(SubdirEdit::from(content.as_str())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(SubdirEdit::default()),
            Err(err) => Err(SubdirError::ReadRegistry {
                source: err,
                registry_path: self.registry_path.clone(),
            }),
        }
    }
}

/// Subdir record editor.
///
/// # Invariant
///
/// - No duplicate records.
/// - Records are stored without `.` components or trailing slashes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubdirEdit {
    records: BTreeSet<PathBuf>,
    changed: bool,
}

impl SubdirEdit {
    /// Construct new empty subdir editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subdir.
    pub fn insert(&mut self, subdir: impl AsRef<Path>) {
        let subdir = clean(subdir.as_ref());
        if subdir.as_os_str().is_empty() {
            return;
        }

        if self.records.insert(subdir) {
            self.changed = true;
        }
    }

    /// Unregister a subdir along with every subdir beneath it.
    pub fn remove_tree(&mut self, subdir: impl AsRef<Path>) {
        let subdir = clean(subdir.as_ref());
        let before = self.records.len();
        self.records.retain(|record| !record.starts_with(&subdir));
        if self.records.len() != before {
            self.changed = true;
        }
    }

    /// Check if a subdir is registered.
    pub fn contains(&self, subdir: impl AsRef<Path>) -> bool {
        self.records.contains(&clean(subdir.as_ref()))
    }
}

impl Display for SubdirEdit {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        for record in &self.records {
            writeln!(fmt, "{}", record.display())?;
        }

        Ok(())
    }
}

impl From<&str> for SubdirEdit {
    fn from(content: &str) -> Self {
        let records = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| clean(Path::new(line)))
            .filter(|record| !record.as_os_str().is_empty())
            .collect::<BTreeSet<_>>();

        Self {
            records,
            changed: false,
        }
    }
}

fn clean(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Subdir registry error types.
#[derive(Debug, thiserror::Error)]
pub enum SubdirError {
    /// Registry file cannot be read from.
    #[error("failed to read subdir registry at {:?}", registry_path.display())]
    ReadRegistry {
        #[source]
        source: std::io::Error,
        registry_path: PathBuf,
    },

    /// Registry file cannot be written to.
    #[error("failed to write subdir registry at {:?}", registry_path.display())]
    WriteRegistry {
        #[source]
        source: std::io::Error,
        registry_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SubdirError> = std::result::Result<T, E>;
