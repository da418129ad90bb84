// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Two kinds of configuration exist. [`Options`] are the per-run switches
//! handed to every engine operation. [`Settings`] is the layout of the
//! optional user configuration file, kept simple for serialization and
//! deserialization. File I/O is left to the caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Name of the castle used when none is given.
pub const DEFAULT_CASTLE_NAME: &str = "dotfiles";

/// Per-run switches for file system operations.
///
/// Passed by value into the engine. Nothing in the crate keeps these in
/// global state.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Overwrite conflicting paths without asking.
    pub force: bool,

    /// Report what would happen without touching the file system.
    pub pretend: bool,

    /// Decline every overwrite without asking. Ignored when `force` is set.
    pub skip: bool,

    /// Only report conflicts.
    pub quiet: bool,
}

impl Options {
    /// Enable force mode.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Enable pretend mode.
    pub fn pretend(mut self, pretend: bool) -> Self {
        self.pretend = pretend;
        self
    }

    /// Enable skip mode.
    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    /// Enable quiet mode.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// User configuration file layout.
///
/// # General Layout
///
/// ```toml
/// [settings]
/// castle_root = "$HOME/.homesick/repos"
/// default_castle = "dotfiles"
/// ```
///
/// Both fields are optional. The castle root undergoes shell expansion when
/// parsed.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// General settings.
    #[serde(default)]
    pub settings: GeneralSettings,
}

impl Settings {
    /// Name of castle to use when none is given.
    pub fn default_castle(&self) -> &str {
        self.settings
            .default_castle
            .as_deref()
            .unwrap_or(DEFAULT_CASTLE_NAME)
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on castle root field.
        if let Some(root) = settings.settings.castle_root.take() {
            let expanded = shellexpand::full(root.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned();
            settings.settings.castle_root = Some(PathBuf::from(expanded));
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// General settings section.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    /// Directory holding castle repositories.
    pub castle_root: Option<PathBuf>,

    /// Castle to use when a command is not given one.
    pub default_castle: Option<String>,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}
