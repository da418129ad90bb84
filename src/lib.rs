// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep dotfiles in version-controlled castles, and project them into the
//! home directory as symbolic links.
//!
//! # Castles
//!
//! A __castle__ is a Git repository whose `home` directory mirrors the layout
//! of the user's home directory. Linking a castle points each path in the
//! home directory at its counterpart inside the castle. Tracking a file moves
//! it from the home directory into a castle, then links it back.
//!
//! # Reconciliation
//!
//! The file system itself is the only state. Every operation inspects the
//! live file system, decides what needs to happen, and does it, so running
//! the same command twice in a row changes nothing the second time. Anything
//! in the way of a link is a conflict, and conflicts are only ever resolved
//! destructively after confirmation or in force mode. Pretend mode reports
//! every decision without acting on any of them.
//!
//! # See Also
//!
//! 1. [`link::Reconciler`]
//! 2. [`track::TrackMigrator`]
//! 3. [`store::CastleStore`]

pub mod castle;
pub mod config;
pub mod link;
pub mod path;
pub mod plan;
pub mod prompt;
pub mod status;
pub mod store;
pub mod track;
