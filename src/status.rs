// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Status reporting.
//!
//! Every file system decision the engine makes is announced through a
//! [`StatusReporter`] as a structured [`StatusEvent`]. Reporters only ever
//! receive events. The engine never looks at what a reporter did with them.

use std::{
    cell::RefCell,
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};
use tracing::{error, info, warn};

/// Something the engine did, or would have done under pretend mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Destination already links to the source.
    Identical { destination: PathBuf },

    /// Destination is occupied by something else.
    Conflict {
        path: PathBuf,
        reason: ConflictReason,
    },

    /// Symlink created from destination to source.
    SymlinkCreated {
        source: PathBuf,
        destination: PathBuf,
    },

    /// Path moved into a castle.
    Moved {
        source: PathBuf,
        destination: PathBuf,
    },

    /// Path removed.
    Removed { path: PathBuf },

    /// Tracked symlink removed from the home directory.
    Unlinked { path: PathBuf },

    /// Tracked copy is at least as recent as the live file, so nothing moved.
    TrackedIsNewer { tracked: PathBuf, live: PathBuf },

    /// Path that would be created already exists.
    Exists { path: PathBuf },

    /// Version control command issued.
    Vcs { command: String, detail: String },

    /// Operation on a single path failed, and the batch moved on.
    Failed { path: PathBuf, reason: String },
}

impl StatusEvent {
    /// Short label naming the kind of event.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Identical { .. } => "identical",
            Self::Conflict { .. } => "conflict",
            Self::SymlinkCreated { .. } => "symlink",
            Self::Moved { .. } => "move",
            Self::Removed { .. } => "remove",
            Self::Unlinked { .. } => "unlink",
            Self::TrackedIsNewer { .. } => "track",
            Self::Exists { .. } => "exist",
            Self::Vcs { .. } => "git",
            Self::Failed { .. } => "error",
        }
    }

    /// Check if event reports a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if event reports a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl Display for StatusEvent {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Identical { destination } => write!(fmt, "{}", destination.display()),
            Self::Conflict { path, reason } => match reason {
                ConflictReason::Exists => write!(fmt, "{} exists", path.display()),
                ConflictReason::PointsTo(target) => write!(
                    fmt,
                    "{} exists and points to {}",
                    path.display(),
                    target.display()
                ),
                ConflictReason::NotSymlink => {
                    write!(fmt, "{} is not a symlink", path.display())
                }
            },
            Self::SymlinkCreated {
                source,
                destination,
            } => write!(fmt, "{} to {}", source.display(), destination.display()),
            Self::Moved {
                source,
                destination,
            } => write!(fmt, "{} to {}", source.display(), destination.display()),
            Self::Removed { path } | Self::Unlinked { path } | Self::Exists { path } => {
                write!(fmt, "{}", path.display())
            }
            Self::TrackedIsNewer { tracked, live } => write!(
                fmt,
                "{} already exists, and is more recent than {}. Run 'castellan link' to create symlinks.",
                tracked.display(),
                live.display()
            ),
            Self::Vcs { command, detail } if detail.is_empty() => write!(fmt, "{command}"),
            Self::Vcs { command, detail } => write!(fmt, "{command} {detail}"),
            Self::Failed { path, reason } => write!(fmt, "{}: {reason}", path.display()),
        }
    }
}

/// Why a path counts as a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// A regular file or directory is in the way.
    Exists,

    /// A symlink is in the way, pointing at the given target.
    PointsTo(PathBuf),

    /// Expected a symlink, found something else.
    NotSymlink,
}

/// Write-only sink for status events.
pub trait StatusReporter {
    /// Report a single event.
    fn report(&self, event: StatusEvent);
}

impl<R> StatusReporter for &R
where
    R: StatusReporter + ?Sized,
{
    fn report(&self, event: StatusEvent) {
        (**self).report(event)
    }
}

/// Reporter that renders events through `tracing`.
///
/// Failures are logged as errors, conflicts as warnings, everything else as
/// info. Quiet mode drops everything except conflicts and failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter {
    quiet: bool,
}

impl TracingReporter {
    /// Construct new tracing reporter.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl StatusReporter for TracingReporter {
    fn report(&self, event: StatusEvent) {
        if event.is_failure() {
            error!("{:>10}  {event}", event.label());
        } else if event.is_conflict() {
            warn!("{:>10}  {event}", event.label());
        } else if !self.quiet {
            info!("{:>10}  {event}", event.label());
        }
    }
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: RefCell<Vec<StatusEvent>>,
}

impl MemoryReporter {
    /// Construct new empty memory reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events reported so far, oldest first.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.borrow().clone()
    }

    /// Take all events reported so far, leaving reporter empty.
    pub fn take(&self) -> Vec<StatusEvent> {
        self.events.take()
    }
}

impl StatusReporter for MemoryReporter {
    fn report(&self, event: StatusEvent) {
        self.events.borrow_mut().push(event);
    }
}
