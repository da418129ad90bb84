// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bring live home directory files under castle control.
//!
//! Tracking moves a file or directory from the home directory into the
//! matching location of a castle. Exactly one of these applies to any given
//! call:
//!
//! 1. Castle has nothing at the target location. The live path is moved in.
//! 2. Live path is a symlink. If it already links to the tracked copy there is
//!    nothing to do, otherwise it is reported as a conflict and left alone.
//! 3. Live path and tracked copy differ in kind (file against directory). The
//!    live path replaces the tracked copy once the overwrite is confirmed.
//! 4. Live path is a directory, and so is the tracked copy. Both are merged,
//!    with live entries winning confirmed conflicts, and the live directory is
//!    removed afterwards. Declined entries stay where they are, and so does
//!    the directory holding them.
//! 5. Live path is a file that is strictly newer than the tracked copy. The
//!    stale tracked copy is replaced.
//! 6. Live path is a file, and the tracked copy is at least as recent. Nothing
//!    is touched, because silently discarding a newer tracked version is
//!    never acceptable.
//!
//! Linking the tracked copy back into the home directory is left to the
//! caller.

use crate::{
    castle::{subdir::SubdirError, Castle},
    link::{exists, LinkError, MoveOutcome, Reconciler},
    plan::{resolve_tracked_target, PlanError, TrackedPath},
    prompt::UserPrompt,
    status::{ConflictReason, StatusEvent, StatusReporter},
};

use std::{
    fs::{canonicalize, metadata, read_dir, read_link, symlink_metadata},
    path::{Path, PathBuf},
};
use tracing::debug;

/// What tracking did to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Untracked path moved into castle.
    Moved(PathBuf),

    /// Castle location got occupied before the move, and the user declined
    /// to overwrite it.
    Declined(PathBuf),

    /// Live directory merged into tracked directory.
    Merged(PathBuf),

    /// Newer live file replaced stale tracked copy.
    Replaced(PathBuf),

    /// Some live entries were declined and stay in place. Everything else
    /// was merged and linked back one by one.
    PartiallyMerged(PathBuf),

    /// Tracked copy is at least as recent, nothing changed.
    KeptTracked(PathBuf),

    /// Live path already links to the tracked copy.
    AlreadyLinked(PathBuf),

    /// Live path is a symlink to somewhere else, nothing changed.
    SymlinkInTheWay(PathBuf),
}

impl TrackOutcome {
    /// Location of the path inside the castle.
    pub fn target(&self) -> &Path {
        match self {
            Self::Moved(target)
            | Self::Declined(target)
            | Self::Merged(target)
            | Self::Replaced(target)
            | Self::PartiallyMerged(target)
            | Self::KeptTracked(target)
            | Self::AlreadyLinked(target)
            | Self::SymlinkInTheWay(target) => target.as_path(),
        }
    }

    /// Check if castle now holds the live version of the path.
    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::Moved(_) | Self::Merged(_) | Self::Replaced(_))
    }
}

/// Move live files into castles.
#[derive(Debug)]
pub struct TrackMigrator<'a, R, P>
where
    R: StatusReporter,
    P: UserPrompt,
{
    engine: &'a Reconciler<R, P>,
    home: &'a Path,
}

impl<'a, R, P> TrackMigrator<'a, R, P>
where
    R: StatusReporter,
    P: UserPrompt,
{
    /// Construct new migrator for a home directory.
    pub fn new(engine: &'a Reconciler<R, P>, home: &'a Path) -> Self {
        Self { engine, home }
    }

    /// Track a live path with a castle.
    ///
    /// # Errors
    ///
    /// - Return [`TrackError::Plan`] if file is not inside the home directory.
    /// - Return [`TrackError::Link`] if file does not exist, or moving and
    ///   removing paths fails.
    /// - Return [`TrackError::Subdir`] if subdir registry cannot be updated.
    pub fn track(&self, file: impl AsRef<Path>, castle: &Castle) -> Result<TrackOutcome> {
        let planned = resolve_tracked_target(file.as_ref(), self.home, castle)?;
        if !exists(file.as_ref())? {
            return Err(LinkError::NotFound {
                path: file.as_ref().to_path_buf(),
            }
            .into());
        }
        let live = TrackedPath::inspect(file.as_ref(), self.home)?;
        let target = planned.target;

        if !exists(&target)? {
            debug!("{:?} not tracked yet", live.absolute_path.display());
            return match self
                .engine
                .move_into_dir(&live.absolute_path, &planned.castle_path)?
            {
                MoveOutcome::Moved(target) => Ok(TrackOutcome::Moved(target)),
                MoveOutcome::Declined(target) => Ok(TrackOutcome::Declined(target)),
            };
        }

        if live.is_symlink {
            return self.track_symlink(&live.absolute_path, target);
        }

        // INVARIANT: merging and mtime comparison only make sense between
        // paths of the same kind.
        if live.is_directory != is_real_dir(&target)? {
            debug!(
                "{:?} and {:?} differ in kind",
                live.absolute_path.display(),
                target.display()
            );
            return match self
                .engine
                .move_into_dir(&live.absolute_path, &planned.castle_path)?
            {
                MoveOutcome::Moved(target) => Ok(TrackOutcome::Replaced(target)),
                MoveOutcome::Declined(target) => Ok(TrackOutcome::Declined(target)),
            };
        }

        if live.is_directory {
            debug!(
                "merge {:?} into {:?}",
                live.absolute_path.display(),
                target.display()
            );
            let mut kept = Vec::new();
            let merged = self.merge_dir_contents(&target, &live.absolute_path, &mut kept)?;
            let pretend = self.engine.options().pretend;

            if merged {
                self.engine.remove_tree(&live.absolute_path)?;
                if !pretend {
                    castle
                        .subdirs()
                        .edit(|records| records.remove_tree(&live.relative_to_home))?;
                }

                return Ok(TrackOutcome::Merged(target));
            }

            // Directories holding declined entries stay real, so their
            // contents have to be linked one by one from now on.
            if !pretend {
                castle.subdirs().edit(|records| {
                    for dir in &kept {
                        if let Ok(rest) = dir.strip_prefix(&live.absolute_path) {
                            records.insert(live.relative_to_home.join(rest));
                        }
                    }
                })?;
            }

            return Ok(TrackOutcome::PartiallyMerged(target));
        }

        if is_more_recent(&live.absolute_path, &target)? {
            self.engine.remove_file(&target)?;
            return match self
                .engine
                .move_into_dir(&live.absolute_path, &planned.castle_path)?
            {
                MoveOutcome::Moved(target) => Ok(TrackOutcome::Replaced(target)),
                MoveOutcome::Declined(target) => Ok(TrackOutcome::Declined(target)),
            };
        }

        self.engine.report(StatusEvent::TrackedIsNewer {
            tracked: target.clone(),
            live: live.absolute_path,
        });

        Ok(TrackOutcome::KeptTracked(target))
    }

    // Live path is a symlink and the castle already has the target.
    fn track_symlink(&self, live: &Path, target: PathBuf) -> Result<TrackOutcome> {
        if same_file(live, &target) {
            self.engine.report(StatusEvent::Identical {
                destination: live.to_path_buf(),
            });
            return Ok(TrackOutcome::AlreadyLinked(target));
        }

        let points_to = read_link(live).map_err(|err| TrackError::Io {
            source: err,
            path: live.to_path_buf(),
        })?;
        self.engine.report(StatusEvent::Conflict {
            path: live.to_path_buf(),
            reason: ConflictReason::PointsTo(points_to),
        });

        Ok(TrackOutcome::SymlinkInTheWay(target))
    }

    /// Merge contents of live directory into tracked directory.
    ///
    /// Entries only present in the tracked directory stay as they are.
    /// Live entries that already link to their tracked counterpart are left
    /// alone. Directories present on both sides are merged recursively. Any
    /// other entry of the live directory is moved in, subject to the usual
    /// conflict confirmation when the tracked side already has it.
    ///
    /// A declined entry stays where it is, untouched. Its directory then stays
    /// a real directory too: it is pushed onto `kept`, and everything that was
    /// moved out of it is linked back in place. Returns whether every entry
    /// ended up in the castle.
    fn merge_dir_contents(
        &self,
        target: &Path,
        live_dir: &Path,
        kept: &mut Vec<PathBuf>,
    ) -> Result<bool> {
        let mut declined = false;
        let mut moved = Vec::new();
        let mut merged_dirs = Vec::new();

        for child in list_dir(live_dir)? {
            let Some(name) = child.file_name() else {
                continue;
            };
            let tracked = target.join(name);

            if is_symlink(&child)? && same_file(&child, &tracked) {
                self.engine.report(StatusEvent::Identical { destination: child });
                continue;
            }

            if is_real_dir(&child)? && is_real_dir(&tracked)? {
                if self.merge_dir_contents(&tracked, &child, kept)? {
                    merged_dirs.push((child, tracked));
                } else {
                    declined = true;
                }
                continue;
            }

            match self.engine.move_into_dir(&child, target)? {
                MoveOutcome::Moved(tracked) => moved.push((child, tracked)),
                MoveOutcome::Declined(_) => declined = true,
            }
        }

        if !declined {
            return Ok(true);
        }

        kept.push(live_dir.to_path_buf());
        for (child, tracked) in merged_dirs {
            self.engine.remove_tree(&child)?;
            self.link_back(&tracked, &child)?;
        }
        for (child, tracked) in moved {
            self.link_back(&tracked, &child)?;
        }

        Ok(false)
    }

    fn link_back(&self, tracked: &Path, live: &Path) -> Result<()> {
        if self.engine.options().pretend {
            self.engine.report(StatusEvent::SymlinkCreated {
                source: tracked.to_path_buf(),
                destination: live.to_path_buf(),
            });
            return Ok(());
        }

        self.engine.create_symlink(tracked, live)?;
        Ok(())
    }
}

/// Check if `first` was modified strictly after `second`.
///
/// A symlink is never more recent than anything, since it only points at
/// content that lives elsewhere.
///
/// # Errors
///
/// - Return [`TrackError::Io`] if modification times cannot be read.
pub fn is_more_recent(first: &Path, second: &Path) -> Result<bool> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |err| TrackError::Io { source: err, path }
    };

    if symlink_metadata(first)
        .map_err(io_err(first))?
        .file_type()
        .is_symlink()
    {
        return Ok(false);
    }

    let first_time = metadata(first)
        .and_then(|meta| meta.modified())
        .map_err(io_err(first))?;
    let second_time = metadata(second)
        .and_then(|meta| meta.modified())
        .map_err(io_err(second))?;

    Ok(first_time > second_time)
}

fn is_real_dir(path: &Path) -> Result<bool> {
    match symlink_metadata(path) {
        Ok(meta) => Ok(meta.is_dir()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(TrackError::Io {
            source: err,
            path: path.to_path_buf(),
        }),
    }
}

fn is_symlink(path: &Path) -> Result<bool> {
    symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .map_err(|err| TrackError::Io {
            source: err,
            path: path.to_path_buf(),
        })
}

// Both paths resolve to the same real location.
fn same_file(first: &Path, second: &Path) -> bool {
    match (canonicalize(first), canonicalize(second)) {
        (Ok(first), Ok(second)) => first == second,
        _ => false,
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = read_dir(dir)
        .and_then(|listing| {
            listing
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<std::io::Result<Vec<_>>>()
        })
        .map_err(|err| TrackError::Io {
            source: err,
            path: dir.to_path_buf(),
        })?;
    children.sort();

    Ok(children)
}

/// Tracking error types.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// Castle location cannot be planned.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Moving or removing paths fails.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Subdir registry cannot be updated.
    #[error(transparent)]
    Subdir(#[from] SubdirError),

    /// File system inspection fails.
    #[error("file system operation failed at {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl TrackError {
    /// Check if error only concerns the single path being processed.
    pub fn is_per_file(&self) -> bool {
        match self {
            Self::Plan(PlanError::InvalidPath { .. }) => true,
            Self::Link(err) => err.is_per_file(),
            _ => false,
        }
    }
}

/// Friendly result alias :3
type Result<T, E = TrackError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Options, prompt::FixedAnswer, status::MemoryReporter};

    use filetime::{set_file_mtime, FileTime};
    use pretty_assertions::assert_eq;
    use std::{
        fs::{create_dir_all, read_to_string, write},
        os::unix::fs::symlink,
    };
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        home: PathBuf,
        castle: Castle,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let home = root.path().join("home");
            create_dir_all(&home).unwrap();
            let castle = Castle::new("dotfiles", home.join(".homesick/repos/dotfiles"));
            create_dir_all(castle.root_dir()).unwrap();

            Self {
                _root: root,
                home,
                castle,
            }
        }

        fn live(&self, relative: &str, contents: &str) -> PathBuf {
            write_file(&self.home.join(relative), contents)
        }

        fn tracked(&self, relative: &str, contents: &str) -> PathBuf {
            write_file(&self.castle.root_dir().join(relative), contents)
        }
    }

    fn write_file(path: &Path, contents: &str) -> PathBuf {
        create_dir_all(path.parent().unwrap()).unwrap();
        write(path, contents).unwrap();
        path.to_path_buf()
    }

    fn set_mtime(path: &Path, unix_seconds: i64) {
        set_file_mtime(path, FileTime::from_unix_time(unix_seconds, 0)).unwrap();
    }

    // 2024-01-01 and 2024-01-02, both at midnight UTC.
    const OLDER: i64 = 1_704_067_200;
    const NEWER: i64 = 1_704_153_600;

    #[test]
    fn track_untracked_file_moves_it_into_castle() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let live = fixture.live(".vimrc", "set number");
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(&live, &fixture.castle)?;

        let target = fixture.castle.root_dir().join(".vimrc");
        assert_eq!(result, TrackOutcome::Moved(target.clone()));
        assert!(!live.exists());
        assert_eq!(read_to_string(&target)?, "set number");

        Ok(())
    }

    #[test]
    fn track_nested_untracked_file_creates_castle_dirs() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let live = fixture.live(".config/nvim/init.lua", "vim.o.number = true");
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(&live, &fixture.castle)?;

        let target = fixture.castle.root_dir().join(".config/nvim/init.lua");
        assert_eq!(result.target(), target.as_path());
        assert!(result.is_tracked());
        assert_eq!(read_to_string(&target)?, "vim.o.number = true");

        Ok(())
    }

    #[test]
    fn track_newer_live_file_replaces_stale_copy() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let live = fixture.live(".bashrc", "live");
        let tracked = fixture.tracked(".bashrc", "tracked");
        set_mtime(&live, NEWER);
        set_mtime(&tracked, OLDER);
        let prompt = FixedAnswer::no();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), &prompt);
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(&live, &fixture.castle)?;

        assert_eq!(result, TrackOutcome::Replaced(tracked.clone()));
        assert_eq!(read_to_string(&tracked)?, "live");
        assert!(!live.exists());
        assert_eq!(prompt.asked(), 0);

        Ok(())
    }

    #[test]
    fn track_older_live_file_touches_nothing() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let live = fixture.live(".bashrc", "live");
        let tracked = fixture.tracked(".bashrc", "tracked");
        set_mtime(&live, OLDER);
        set_mtime(&tracked, NEWER);
        let reporter = MemoryReporter::new();
        let engine = Reconciler::new(Options::default(), &reporter, FixedAnswer::yes());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(&live, &fixture.castle)?;

        assert_eq!(result, TrackOutcome::KeptTracked(tracked.clone()));
        assert!(!result.is_tracked());
        assert_eq!(read_to_string(&live)?, "live");
        assert_eq!(read_to_string(&tracked)?, "tracked");
        assert_eq!(
            reporter.events(),
            vec![StatusEvent::TrackedIsNewer {
                tracked: tracked.clone(),
                live: live.clone(),
            }]
        );

        Ok(())
    }

    #[test]
    fn track_equal_mtimes_keeps_tracked_copy() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let live = fixture.live(".bashrc", "live");
        let tracked = fixture.tracked(".bashrc", "tracked");
        set_mtime(&live, OLDER);
        set_mtime(&tracked, OLDER);
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::yes());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(&live, &fixture.castle)?;

        assert_eq!(result, TrackOutcome::KeptTracked(tracked));
        assert!(live.exists());

        Ok(())
    }

    #[test]
    fn track_directory_merges_into_tracked_directory() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        fixture.live(".config/app/a.txt", "a");
        fixture.tracked(".config/app/b.txt", "b");
        fixture
            .castle
            .subdirs()
            .edit(|records| {
                records.insert(".config/app");
                records.insert(".config/app/deep");
                records.insert(".local");
            })?;
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let live_dir = fixture.home.join(".config/app");
        let result = migrator.track(&live_dir, &fixture.castle)?;

        let tracked_dir = fixture.castle.root_dir().join(".config/app");
        assert_eq!(result, TrackOutcome::Merged(tracked_dir.clone()));
        assert_eq!(read_to_string(tracked_dir.join("a.txt"))?, "a");
        assert_eq!(read_to_string(tracked_dir.join("b.txt"))?, "b");
        assert!(!live_dir.exists());
        assert_eq!(
            fixture.castle.subdirs().list()?,
            vec![PathBuf::from(".local")]
        );

        Ok(())
    }

    #[test]
    fn track_directory_merge_recurses_and_live_wins_when_confirmed() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        fixture.live(".config/app/nested/shared.txt", "live");
        fixture.live(".config/app/nested/only-live.txt", "live");
        fixture.tracked(".config/app/nested/shared.txt", "tracked");
        fixture.tracked(".config/app/nested/only-tracked.txt", "tracked");
        let prompt = FixedAnswer::yes();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), &prompt);
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        migrator.track(fixture.home.join(".config/app"), &fixture.castle)?;

        let nested = fixture.castle.root_dir().join(".config/app/nested");
        assert_eq!(read_to_string(nested.join("shared.txt"))?, "live");
        assert_eq!(read_to_string(nested.join("only-live.txt"))?, "live");
        assert_eq!(read_to_string(nested.join("only-tracked.txt"))?, "tracked");
        assert_eq!(prompt.asked(), 1);

        Ok(())
    }

    #[test]
    fn track_outside_home_is_invalid_path() {
        let fixture = Fixture::new();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track("/etc/hostname", &fixture.castle);

        let err = result.unwrap_err();
        assert!(matches!(err, TrackError::Plan(PlanError::InvalidPath { .. })));
        assert!(err.is_per_file());
    }

    #[test]
    fn track_missing_file_is_not_found() {
        let fixture = Fixture::new();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let err = migrator
            .track(fixture.home.join(".nope"), &fixture.castle)
            .unwrap_err();

        assert!(matches!(err, TrackError::Link(LinkError::NotFound { .. })));
        assert!(err.is_per_file());
    }

    #[test]
    fn track_under_pretend_changes_nothing() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let live_file = fixture.live(".vimrc", "set number");
        fixture.live(".config/app/a.txt", "a");
        fixture.tracked(".config/app/b.txt", "b");
        fixture
            .castle
            .subdirs()
            .edit(|records| records.insert(".config/app"))?;
        let reporter = MemoryReporter::new();
        let engine = Reconciler::new(Options::default().pretend(true), &reporter, FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        migrator.track(&live_file, &fixture.castle)?;
        migrator.track(fixture.home.join(".config/app"), &fixture.castle)?;

        assert!(live_file.exists());
        assert!(fixture.home.join(".config/app/a.txt").exists());
        assert!(!fixture.castle.root_dir().join(".vimrc").exists());
        assert!(!fixture.castle.root_dir().join(".config/app/a.txt").exists());
        assert_eq!(
            fixture.castle.subdirs().list()?,
            vec![PathBuf::from(".config/app")]
        );
        assert!(!reporter.events().is_empty());

        Ok(())
    }

    #[test]
    fn merge_leaves_entries_already_linked_into_castle_alone() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let tracked = fixture.tracked(".config/app/b.txt", "b");
        fixture.live(".config/app/a.txt", "a");
        let linked = fixture.home.join(".config/app/b.txt");
        symlink(&tracked, &linked)?;
        let reporter = MemoryReporter::new();
        let engine = Reconciler::new(Options::default().force(true), &reporter, FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let live_dir = fixture.home.join(".config/app");
        let result = migrator.track(&live_dir, &fixture.castle)?;

        let tracked_dir = fixture.castle.root_dir().join(".config/app");
        assert_eq!(result, TrackOutcome::Merged(tracked_dir.clone()));
        assert!(!symlink_metadata(&tracked)?.file_type().is_symlink());
        assert_eq!(read_to_string(&tracked)?, "b");
        assert_eq!(read_to_string(tracked_dir.join("a.txt"))?, "a");
        assert!(!live_dir.exists());
        assert!(reporter
            .events()
            .contains(&StatusEvent::Identical { destination: linked }));

        Ok(())
    }

    #[test]
    fn merge_keeps_declined_entries_in_place() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let shared = fixture.live(".config/app/shared.txt", "live edits");
        let only_live = fixture.live(".config/app/only-live.txt", "new");
        fixture.live(".config/app/fresh/x.txt", "x");
        fixture.tracked(".config/app/shared.txt", "tracked");
        let prompt = FixedAnswer::no();
        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), &prompt);
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let live_dir = fixture.home.join(".config/app");
        let result = migrator.track(&live_dir, &fixture.castle)?;

        let tracked_dir = fixture.castle.root_dir().join(".config/app");
        assert_eq!(result, TrackOutcome::PartiallyMerged(tracked_dir.clone()));
        assert!(!result.is_tracked());
        assert_eq!(prompt.asked(), 1);

        assert_eq!(read_to_string(&shared)?, "live edits");
        assert_eq!(read_to_string(tracked_dir.join("shared.txt"))?, "tracked");

        assert_eq!(read_to_string(tracked_dir.join("only-live.txt"))?, "new");
        assert_eq!(read_link(&only_live)?, canonicalize(tracked_dir.join("only-live.txt"))?);
        assert_eq!(read_to_string(tracked_dir.join("fresh/x.txt"))?, "x");
        assert_eq!(
            read_link(live_dir.join("fresh"))?,
            canonicalize(tracked_dir.join("fresh"))?
        );

        assert_eq!(
            fixture.castle.subdirs().list()?,
            vec![PathBuf::from(".config/app")]
        );

        Ok(())
    }

    #[test]
    fn merge_with_declined_nested_entry_links_merged_siblings_back() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let shared = fixture.live(".vim/nested/shared.txt", "live edits");
        fixture.tracked(".vim/nested/shared.txt", "tracked");
        fixture.live(".vim/other/o.txt", "o");
        fixture.tracked(".vim/other/t.txt", "t");
        let engine = Reconciler::new(Options::default().skip(true), MemoryReporter::new(), FixedAnswer::yes());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(fixture.home.join(".vim"), &fixture.castle)?;

        let tracked_dir = fixture.castle.root_dir().join(".vim");
        assert_eq!(result, TrackOutcome::PartiallyMerged(tracked_dir.clone()));
        assert_eq!(read_to_string(&shared)?, "live edits");
        assert_eq!(read_to_string(tracked_dir.join("other/o.txt"))?, "o");
        assert_eq!(read_to_string(tracked_dir.join("other/t.txt"))?, "t");
        assert_eq!(
            read_link(fixture.home.join(".vim/other"))?,
            canonicalize(tracked_dir.join("other"))?
        );
        assert_eq!(
            fixture.castle.subdirs().list()?,
            vec![PathBuf::from(".vim"), PathBuf::from(".vim/nested")]
        );

        Ok(())
    }

    #[test]
    fn live_file_against_tracked_directory_needs_confirmation() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let live = fixture.live(".gitconfig", "live");
        fixture.tracked(".gitconfig/old", "old");
        set_mtime(&live, NEWER);
        let target = fixture.castle.root_dir().join(".gitconfig");

        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::no());
        let migrator = TrackMigrator::new(&engine, &fixture.home);
        let result = migrator.track(&live, &fixture.castle)?;
        assert_eq!(result, TrackOutcome::Declined(target.clone()));
        assert_eq!(read_to_string(&live)?, "live");
        assert!(target.join("old").exists());

        let engine = Reconciler::new(Options::default(), MemoryReporter::new(), FixedAnswer::yes());
        let migrator = TrackMigrator::new(&engine, &fixture.home);
        let result = migrator.track(&live, &fixture.castle)?;
        assert_eq!(result, TrackOutcome::Replaced(target.clone()));
        assert_eq!(read_to_string(&target)?, "live");

        Ok(())
    }

    #[test]
    fn live_directory_against_tracked_file_is_declined_under_skip() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        fixture.live(".vim/vimrc", "live");
        let tracked = fixture.tracked(".vim", "not a directory");
        let engine = Reconciler::new(Options::default().skip(true), MemoryReporter::new(), FixedAnswer::yes());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(fixture.home.join(".vim"), &fixture.castle)?;

        assert_eq!(result, TrackOutcome::Declined(tracked.clone()));
        assert_eq!(read_to_string(&tracked)?, "not a directory");
        assert_eq!(read_to_string(fixture.home.join(".vim/vimrc"))?, "live");

        Ok(())
    }

    #[test]
    fn live_symlink_is_its_own_state() -> anyhow::Result<()> {
        let fixture = Fixture::new();
        let tracked = fixture.tracked(".vim/vimrc", "tracked");
        let tracked_dir = fixture.castle.root_dir().join(".vim");
        let live = fixture.home.join(".vim");
        symlink(&tracked_dir, &live)?;
        let reporter = MemoryReporter::new();
        let engine = Reconciler::new(Options::default(), &reporter, FixedAnswer::yes());
        let migrator = TrackMigrator::new(&engine, &fixture.home);

        let result = migrator.track(&live, &fixture.castle)?;
        assert_eq!(result, TrackOutcome::AlreadyLinked(tracked_dir.clone()));
        assert_eq!(
            reporter.take(),
            vec![StatusEvent::Identical {
                destination: live.clone()
            }]
        );

        let elsewhere = fixture.live("dotvim/vimrc", "elsewhere");
        std::fs::remove_file(&live)?;
        symlink(elsewhere.parent().unwrap(), &live)?;
        let result = migrator.track(&live, &fixture.castle)?;
        assert_eq!(result, TrackOutcome::SymlinkInTheWay(tracked_dir));
        assert!(reporter.take().iter().any(StatusEvent::is_conflict));
        assert_eq!(read_to_string(&tracked)?, "tracked");
        assert_eq!(read_to_string(&elsewhere)?, "elsewhere");

        Ok(())
    }
}
