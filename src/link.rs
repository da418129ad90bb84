// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Symlink reconciliation.
//!
//! The home directory is projected from castles through symlinks. For any
//! `(source, destination)` pair the destination is in one of three states:
//! absent, a symlink to the canonical source, or something else. The
//! [`Reconciler`] re-derives that state from the file system on every call,
//! and resolves the difference. Nothing is cached between calls, so running
//! the same operation twice over an unchanged file system lands on
//! [`LinkAction::Identical`] and mutates nothing.
//!
//! # Ordering
//!
//! Classification always happens before any mutation, and removal of a
//! conflicting entry always happens before link creation. A declined
//! confirmation therefore leaves the destination exactly as it was found.
//!
//! # Races
//!
//! The file system can change between classification and action. Nothing
//! guards that window. This is an interactive single-user tool, so the
//! window is accepted.
//!
//! # Pretend Mode
//!
//! With [`Options::pretend`] set, every mutating primitive is skipped right
//! at the call site, while still reporting the status event it would have
//! produced.

use crate::{
    config::Options,
    plan::normalize,
    prompt::{InquirePrompt, PromptError, UserPrompt},
    status::{ConflictReason, StatusEvent, StatusReporter, TracingReporter},
};

use std::{
    fs::{canonicalize, read_link, remove_dir_all, remove_file, rename, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

/// State of a destination relative to the source it should link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Destination is absent, so a link can be created.
    Success,

    /// Destination already links to the source.
    Identical,

    /// Destination is a symlink pointing somewhere else.
    SymlinkConflict,

    /// Destination is a regular file or directory.
    Conflict,
}

impl LinkAction {
    /// Check if action requires conflict resolution.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::SymlinkConflict | Self::Conflict)
    }
}

/// What ended up happening to a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Symlink created, or would have been under pretend mode.
    Linked,

    /// Destination was already correct.
    Unchanged,

    /// User declined to overwrite, destination left alone.
    Declined,
}

/// Result of reconciling a single symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOutcome {
    /// State of the destination before anything was done.
    pub action: LinkAction,

    /// What was done about it.
    pub resolution: Resolution,
}

/// Result of moving a path into a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Path moved to the given location.
    Moved(PathBuf),

    /// Location was occupied and the user declined to overwrite it.
    Declined(PathBuf),
}

/// Classify a destination against an already canonical source.
///
/// Symlinks are never followed when inspecting the destination.
///
/// # Errors
///
/// - Return [`LinkError::Io`] if destination cannot be inspected.
pub fn classify(source: &Path, destination: &Path) -> Result<LinkAction> {
    let metadata = match symlink_metadata(destination) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LinkAction::Success),
        Err(err) => return Err(LinkError::io(err, destination)),
    };

    if !metadata.file_type().is_symlink() {
        return Ok(LinkAction::Conflict);
    }

    if link_target(destination)? == source {
        Ok(LinkAction::Identical)
    } else {
        Ok(LinkAction::SymlinkConflict)
    }
}

/// File system reconciliation engine.
///
/// Carries the per-run [`Options`], where to report status, and who to ask
/// before overwriting anything.
#[derive(Debug, Default)]
pub struct Reconciler<R = TracingReporter, P = InquirePrompt>
where
    R: StatusReporter,
    P: UserPrompt,
{
    options: Options,
    reporter: R,
    prompt: P,
}

impl<R, P> Reconciler<R, P>
where
    R: StatusReporter,
    P: UserPrompt,
{
    /// Construct new reconciler.
    pub fn new(options: Options, reporter: R, prompt: P) -> Self {
        Self {
            options,
            reporter,
            prompt,
        }
    }

    /// Options this reconciler runs with.
    pub fn options(&self) -> Options {
        self.options
    }

    /// Prompt used for confirmations.
    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    /// Report a status event.
    pub fn report(&self, event: StatusEvent) {
        self.reporter.report(event);
    }

    /// Link `destination` to the canonical path of `source`.
    ///
    /// Creates missing parent directories of the destination. A destination
    /// that already links to the source is left alone. Anything else in the
    /// way is reported as a conflict, and only removed once the user
    /// confirms (or force mode is on). A declined conflict creates no link.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::NotFound`] if source does not exist.
    /// - Return [`LinkError::Io`] if file system operations fail.
    /// - Return [`LinkError::Prompt`] if confirmation cannot be obtained.
    pub fn create_symlink(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<LinkOutcome> {
        let source = canonicalize(source.as_ref()).map_err(|err| match err.kind() {
            ErrorKind::NotFound => LinkError::NotFound {
                path: source.as_ref().to_path_buf(),
            },
            _ => LinkError::io(err, source.as_ref()),
        })?;
        let destination = normalize(destination.as_ref());

        if !self.options.pretend {
            if let Some(parent) = destination.parent() {
                mkdirp::mkdirp(parent).map_err(|err| LinkError::io(err, parent))?;
            }
        }

        let action = classify(&source, &destination)?;
        debug!("{:?} classified as {action:?}", destination.display());

        match action {
            LinkAction::Identical => {
                self.report(StatusEvent::Identical { destination });
                return Ok(LinkOutcome {
                    action,
                    resolution: Resolution::Unchanged,
                });
            }
            LinkAction::SymlinkConflict | LinkAction::Conflict => {
                let reason = match action {
                    LinkAction::SymlinkConflict => {
                        ConflictReason::PointsTo(read_link(&destination).map_err(|err| {
                            LinkError::io(err, &destination)
                        })?)
                    }
                    _ => ConflictReason::Exists,
                };
                self.report(StatusEvent::Conflict {
                    path: destination.clone(),
                    reason,
                });

                if !self.collision_accepted(&destination)? {
                    return Ok(LinkOutcome {
                        action,
                        resolution: Resolution::Declined,
                    });
                }

                if !self.options.pretend {
                    remove_entry(&destination)?;
                }
            }
            LinkAction::Success => {}
        }

        if !self.options.pretend {
            symlink(&source, &destination).map_err(|err| LinkError::io(err, &destination))?;
        }
        self.report(StatusEvent::SymlinkCreated {
            source,
            destination,
        });

        Ok(LinkOutcome {
            action,
            resolution: Resolution::Linked,
        })
    }

    /// Remove a symlink that exposes a tracked file.
    ///
    /// Refuses to touch anything that is not itself a symlink, reporting it as
    /// a conflict instead. Returns whether the link was removed.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Io`] if file system operations fail.
    pub fn remove_tracked_link(&self, target: impl AsRef<Path>) -> Result<bool> {
        let target = target.as_ref();
        let is_symlink = match symlink_metadata(target) {
            Ok(metadata) => metadata.file_type().is_symlink(),
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(LinkError::io(err, target)),
        };

        if !is_symlink {
            self.report(StatusEvent::Conflict {
                path: target.to_path_buf(),
                reason: ConflictReason::NotSymlink,
            });
            return Ok(false);
        }

        self.report(StatusEvent::Unlinked {
            path: target.to_path_buf(),
        });
        if !self.options.pretend {
            remove_file(target).map_err(|err| LinkError::io(err, target))?;
        }

        Ok(true)
    }

    /// Remove a single file. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Io`] if file cannot be removed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.report(StatusEvent::Removed {
            path: path.to_path_buf(),
        });
        if self.options.pretend {
            return Ok(());
        }

        match remove_file(path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(LinkError::io(err, path)),
            _ => Ok(()),
        }
    }

    /// Remove a directory tree. Missing trees are not an error.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Io`] if tree cannot be removed.
    pub fn remove_tree(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.report(StatusEvent::Removed {
            path: path.to_path_buf(),
        });
        if self.options.pretend {
            return Ok(());
        }

        match remove_dir_all(path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(LinkError::io(err, path)),
            _ => Ok(()),
        }
    }

    /// Move `source` into `dest_dir`, keeping its file name.
    ///
    /// An occupied target is a conflict that needs confirmation (or force
    /// mode) before it is overwritten. Missing parents of `dest_dir` are
    /// created.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::NotFound`] if source does not exist.
    /// - Return [`LinkError::NoFileName`] if source has no file name.
    /// - Return [`LinkError::Io`] if file system operations fail.
    /// - Return [`LinkError::Prompt`] if confirmation cannot be obtained.
    pub fn move_into_dir(
        &self,
        source: impl AsRef<Path>,
        dest_dir: impl AsRef<Path>,
    ) -> Result<MoveOutcome> {
        let source = source.as_ref();
        let dest_dir = dest_dir.as_ref();
        if !exists(source)? {
            return Err(LinkError::NotFound {
                path: source.to_path_buf(),
            });
        }

        let name = source.file_name().ok_or_else(|| LinkError::NoFileName {
            path: source.to_path_buf(),
        })?;
        let target = dest_dir.join(name);

        if exists(&target)? {
            self.report(StatusEvent::Conflict {
                path: target.clone(),
                reason: ConflictReason::Exists,
            });
            if !self.collision_accepted(&target)? {
                return Ok(MoveOutcome::Declined(target));
            }
            if !self.options.pretend {
                remove_entry(&target)?;
            }
        }

        if !self.options.pretend {
            mkdirp::mkdirp(dest_dir).map_err(|err| LinkError::io(err, dest_dir))?;
            rename(source, &target).map_err(|err| LinkError::io(err, source))?;
        }
        self.report(StatusEvent::Moved {
            source: source.to_path_buf(),
            destination: target.clone(),
        });

        Ok(MoveOutcome::Moved(target))
    }

    /// Decide whether an occupied path may be overwritten.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Prompt`] if the user cannot be asked.
    pub fn collision_accepted(&self, path: &Path) -> Result<bool> {
        if self.options.force {
            return Ok(true);
        }

        if self.options.skip {
            return Ok(false);
        }

        Ok(self.prompt.confirm_overwrite(path)?)
    }
}

/// Check if anything, including a dangling symlink, occupies a path.
pub(crate) fn exists(path: &Path) -> Result<bool> {
    match symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(LinkError::io(err, path)),
    }
}

// Where a symlink points, resolved against its parent when relative.
fn link_target(link: &Path) -> Result<PathBuf> {
    let target = read_link(link).map_err(|err| LinkError::io(err, link))?;
    if target.is_absolute() {
        return Ok(normalize(&target));
    }

    let parent = link.parent().unwrap_or_else(|| Path::new("/"));
    Ok(normalize(&parent.join(target)))
}

// Remove whatever occupies a path without following symlinks.
fn remove_entry(path: &Path) -> Result<()> {
    let result = match symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => remove_dir_all(path),
        Ok(_) => remove_file(path),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    };

    result.map_err(|err| LinkError::io(err, path))
}

#[cfg(unix)]
fn symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, destination)
}

#[cfg(windows)]
fn symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, destination)
    } else {
        std::os::windows::fs::symlink_file(source, destination)
    }
}

/// Reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Required source path does not exist.
    #[error("{:?} does not exist", path.display())]
    NotFound { path: PathBuf },

    /// Path has no file name to move under.
    #[error("{:?} has no file name", path.display())]
    NoFileName { path: PathBuf },

    /// File system operation failed.
    #[error("file system operation failed at {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Confirmation prompt failed.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl LinkError {
    fn io(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::Io {
            source,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Check if error only concerns the single path being processed.
    ///
    /// Batch operations report these and carry on with the next path.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NoFileName { .. })
    }
}

/// Friendly result alias :3
type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prompt::FixedAnswer, status::MemoryReporter};

    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::{
        collections::BTreeMap,
        fs::{create_dir_all, read_dir, read_to_string, write},
    };
    use tempfile::TempDir;

    fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
        let mut entries = BTreeMap::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                let metadata = symlink_metadata(&path).unwrap();
                let value = if metadata.file_type().is_symlink() {
                    format!("link:{}", read_link(&path).unwrap().display())
                } else if metadata.is_dir() {
                    pending.push(path.clone());
                    "dir".into()
                } else {
                    format!("file:{}", read_to_string(&path).unwrap())
                };
                entries.insert(path.strip_prefix(root).unwrap().to_path_buf(), value);
            }
        }

        entries
    }

    fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("castle").join(".vimrc");
        create_dir_all(source.parent().unwrap()).unwrap();
        write(&source, "set number").unwrap();
        let destination = root.path().join("home").join(".vimrc");
        create_dir_all(destination.parent().unwrap()).unwrap();

        (root, source, destination)
    }

    #[test]
    fn create_symlink_is_idempotent() -> anyhow::Result<()> {
        let (root, source, destination) = fixture();
        let reporter = MemoryReporter::new();
        let prompt = FixedAnswer::no();
        let engine = Reconciler::new(Options::default(), &reporter, &prompt);

        let result = engine.create_symlink(&source, &destination)?;
        assert_eq!(result.action, LinkAction::Success);
        assert_eq!(result.resolution, Resolution::Linked);

        let before = snapshot(root.path());
        reporter.take();
        let result = engine.create_symlink(&source, &destination)?;
        assert_eq!(result.action, LinkAction::Identical);
        assert_eq!(result.resolution, Resolution::Unchanged);
        assert_eq!(snapshot(root.path()), before);
        assert_eq!(
            reporter.take(),
            vec![StatusEvent::Identical {
                destination: destination.clone()
            }]
        );
        assert_eq!(prompt.asked(), 0);

        Ok(())
    }

    #[test]
    fn create_symlink_targets_canonical_source() -> anyhow::Result<()> {
        let (root, source, _) = fixture();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let roundabout = root.path().join("castle/./sub/../.vimrc");
        create_dir_all(root.path().join("castle/sub"))?;
        let destination = root.path().join("home/deeply/nested/.vimrc");

        engine.create_symlink(&roundabout, &destination)?;

        assert!(symlink_metadata(&destination)?.file_type().is_symlink());
        assert_eq!(read_link(&destination)?, canonicalize(&source)?);
        assert_eq!(read_to_string(&destination)?, "set number");

        Ok(())
    }

    #[test]
    fn create_symlink_missing_source_is_not_found() {
        let (root, _, destination) = fixture();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let result = engine.create_symlink(root.path().join("nope"), &destination);
        assert!(matches!(result, Err(LinkError::NotFound { .. })));
        assert!(!exists(&destination).unwrap());
    }

    #[test]
    fn declined_conflict_leaves_regular_file_alone() -> anyhow::Result<()> {
        let (_root, source, destination) = fixture();
        write(&destination, "local edits")?;
        let reporter = MemoryReporter::new();
        let prompt = FixedAnswer::no();
        let engine = Reconciler::new(Options::default(), &reporter, &prompt);

        let result = engine.create_symlink(&source, &destination)?;

        assert_eq!(result.action, LinkAction::Conflict);
        assert_eq!(result.resolution, Resolution::Declined);
        assert!(!symlink_metadata(&destination)?.file_type().is_symlink());
        assert_eq!(read_to_string(&destination)?, "local edits");
        assert_eq!(prompt.asked(), 1);
        assert_eq!(
            reporter.events(),
            vec![StatusEvent::Conflict {
                path: destination.clone(),
                reason: ConflictReason::Exists,
            }]
        );

        Ok(())
    }

    #[test]
    fn declined_symlink_conflict_keeps_old_link() -> anyhow::Result<()> {
        let (root, source, destination) = fixture();
        let elsewhere = root.path().join("elsewhere");
        write(&elsewhere, "other")?;
        symlink(&elsewhere, &destination)?;
        let reporter = MemoryReporter::new();
        let engine = Reconciler::new(Options::default(), &reporter, FixedAnswer::no());

        let result = engine.create_symlink(&source, &destination)?;

        assert_eq!(result.action, LinkAction::SymlinkConflict);
        assert_eq!(result.resolution, Resolution::Declined);
        assert_eq!(read_link(&destination)?, elsewhere);
        assert_eq!(
            reporter.events(),
            vec![StatusEvent::Conflict {
                path: destination.clone(),
                reason: ConflictReason::PointsTo(elsewhere.clone()),
            }]
        );

        Ok(())
    }

    #[test]
    fn accepted_conflict_replaces_directory_with_link() -> anyhow::Result<()> {
        let (_root, source, destination) = fixture();
        create_dir_all(destination.join("inner"))?;
        write(destination.join("inner").join("file"), "blah")?;
        let prompt = FixedAnswer::yes();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), &prompt);

        let result = engine.create_symlink(&source, &destination)?;

        assert_eq!(result.action, LinkAction::Conflict);
        assert_eq!(result.resolution, Resolution::Linked);
        assert_eq!(read_link(&destination)?, canonicalize(&source)?);
        assert_eq!(prompt.asked(), 1);

        Ok(())
    }

    #[test]
    fn force_overwrites_without_asking_and_skip_declines_without_asking() -> anyhow::Result<()> {
        let (_root, source, destination) = fixture();
        write(&destination, "local edits")?;

        let prompt = FixedAnswer::yes();
        let engine = Reconciler::new(Options::default().skip(true), MemoryReporter::new(), &prompt);
        let result = engine.create_symlink(&source, &destination)?;
        assert_eq!(result.resolution, Resolution::Declined);
        assert_eq!(read_to_string(&destination)?, "local edits");

        let options = Options::default().skip(true).force(true);
        let engine = Reconciler::new(options, MemoryReporter::new(), &prompt);
        let result = engine.create_symlink(&source, &destination)?;
        assert_eq!(result.resolution, Resolution::Linked);
        assert_eq!(read_link(&destination)?, canonicalize(&source)?);

        assert_eq!(prompt.asked(), 0);

        Ok(())
    }

    #[test]
    fn dangling_symlink_is_a_symlink_conflict() -> anyhow::Result<()> {
        let (root, source, destination) = fixture();
        symlink(&root.path().join("gone"), &destination)?;
        let engine = Reconciler::new(Options::default().force(true), MemoryReporter::new(), FixedAnswer::no());

        let result = engine.create_symlink(&source, &destination)?;

        assert_eq!(result.action, LinkAction::SymlinkConflict);
        assert_eq!(read_link(&destination)?, canonicalize(&source)?);

        Ok(())
    }

    #[test_case(LinkAction::Success; "absent destination")]
    #[test_case(LinkAction::Conflict; "regular file destination")]
    #[test_case(LinkAction::SymlinkConflict; "foreign symlink destination")]
    #[test]
    fn pretend_mode_never_mutates(expect: LinkAction) -> anyhow::Result<()> {
        use pretty_assertions::assert_eq;

        let (root, source, destination) = fixture();
        match expect {
            LinkAction::Conflict => write(&destination, "local edits")?,
            LinkAction::SymlinkConflict => symlink(&root.path().join("gone"), &destination)?,
            _ => {}
        }
        let before = snapshot(root.path());
        let reporter = MemoryReporter::new();
        let options = Options::default().pretend(true).force(true);
        let engine = Reconciler::new(options, &reporter, FixedAnswer::no());

        let result = engine.create_symlink(&source, &destination)?;

        assert_eq!(result.action, expect);
        assert_eq!(result.resolution, Resolution::Linked);
        assert_eq!(snapshot(root.path()), before);
        assert!(matches!(
            reporter.events().last(),
            Some(StatusEvent::SymlinkCreated { .. })
        ));

        Ok(())
    }

    #[test]
    fn pretend_mode_does_not_create_parent_directories() -> anyhow::Result<()> {
        let (root, source, _) = fixture();
        let destination = root.path().join("home/.config/app/rc");
        let engine = Reconciler::new(Options::default().pretend(true), MemoryReporter::new(), FixedAnswer::no());

        engine.create_symlink(&source, &destination)?;

        assert!(!exists(&root.path().join("home/.config"))?);

        Ok(())
    }

    #[test]
    fn remove_tracked_link_refuses_regular_files() -> anyhow::Result<()> {
        let (_root, source, destination) = fixture();
        let reporter = MemoryReporter::new();
        let engine = Reconciler::new(Options::default(), &reporter, FixedAnswer::no());

        assert!(!engine.remove_tracked_link(&source)?);
        assert!(exists(&source)?);
        assert_eq!(
            reporter.take(),
            vec![StatusEvent::Conflict {
                path: source.clone(),
                reason: ConflictReason::NotSymlink,
            }]
        );

        engine.create_symlink(&source, &destination)?;
        reporter.take();
        assert!(engine.remove_tracked_link(&destination)?);
        assert!(!exists(&destination)?);
        assert!(exists(&source)?);
        assert_eq!(
            reporter.take(),
            vec![StatusEvent::Unlinked {
                path: destination.clone()
            }]
        );

        Ok(())
    }

    #[test]
    fn move_into_dir_moves_and_creates_parents() -> anyhow::Result<()> {
        let (root, _, destination) = fixture();
        write(&destination, "live")?;
        let castle_path = root.path().join("castle/.config/nested");
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());

        let result = engine.move_into_dir(&destination, &castle_path)?;

        let target = castle_path.join(".vimrc");
        assert_eq!(result, MoveOutcome::Moved(target.clone()));
        assert_eq!(read_to_string(&target)?, "live");
        assert!(!exists(&destination)?);

        Ok(())
    }

    #[test]
    fn move_into_dir_conflict_respects_answer() -> anyhow::Result<()> {
        let (root, source, destination) = fixture();
        write(&destination, "live")?;
        let castle = root.path().join("castle");

        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let result = engine.move_into_dir(&destination, &castle)?;
        assert_eq!(result, MoveOutcome::Declined(source.clone()));
        assert_eq!(read_to_string(&source)?, "set number");
        assert_eq!(read_to_string(&destination)?, "live");

        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::yes());
        let result = engine.move_into_dir(&destination, &castle)?;
        assert_eq!(result, MoveOutcome::Moved(source.clone()));
        assert_eq!(read_to_string(&source)?, "live");
        assert!(!exists(&destination)?);

        Ok(())
    }

    #[test]
    fn removal_primitives_honor_pretend() -> anyhow::Result<()> {
        let (root, source, _) = fixture();
        let before = snapshot(root.path());
        let reporter = MemoryReporter::new();
        let engine = Reconciler::new(Options::default().pretend(true), &reporter, FixedAnswer::no());

        engine.remove_file(&source)?;
        engine.remove_tree(root.path().join("castle"))?;
        engine.move_into_dir(&source, root.path().join("home"))?;

        assert_eq!(snapshot(root.path()), before);
        assert_eq!(reporter.events().len(), 3);

        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        engine.remove_file(root.path().join("missing"))?;
        engine.remove_tree(root.path().join("castle"))?;
        assert!(!exists(&source)?);

        Ok(())
    }
}
