// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Castle store management and manipulation.
//!
//! Castellan keeps every castle together in one place called the
//! __castle root__. Each castle is a directory directly below the castle root,
//! and its directory name is the castle's name. So `<castle_root>/shell` means
//! that there is a castle named "shell".
//!
//! The store is where the pieces meet: it resolves castles by name, issues
//! version control commands around file operations, and drives the
//! [`Reconciler`] and [`TrackMigrator`] over whole castles. Version control
//! steps are always discrete. They never take part in any link decision.
//!
//! # Batches
//!
//! Commands that handle many files (link, unlink, track) report per-file
//! failures and move on to the next file. Only errors that make the whole
//! command pointless, like a failing disk, abort the batch.

use crate::{
    castle::{
        subdir::SubdirError,
        vcs::{CloneSource, GitCli, VcsError, VersionControl},
        Castle, CastleError,
    },
    link::{exists, LinkError, Reconciler},
    path::{PathConfig, CASTLE_HOME},
    plan::{normalize, resolve_tracked_target, PlanError},
    prompt::{PromptError, UserPrompt},
    status::{StatusEvent, StatusReporter},
    track::{TrackError, TrackMigrator, TrackOutcome},
};

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Castles below a castle root, plus the version control used to manage them.
#[derive(Debug)]
pub struct CastleStore<V = GitCli>
where
    V: VersionControl,
{
    paths: PathConfig,
    vcs: V,
}

impl<V> CastleStore<V>
where
    V: VersionControl,
{
    /// Construct new castle store.
    pub fn new(paths: PathConfig, vcs: V) -> Self {
        Self { paths, vcs }
    }

    /// Resolved home directory and castle root.
    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    /// Version control used by the store.
    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Look up an existing castle by name.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle has no root directory.
    pub fn castle(&self, name: impl AsRef<str>) -> Result<Castle> {
        let castle = Castle::new(name.as_ref(), self.paths.castle_repo(name.as_ref()));
        if !castle.exists() {
            return Err(StoreError::CastleNotFound {
                name: name.as_ref().to_string(),
                path: castle.root_dir().to_path_buf(),
            });
        }

        Ok(castle)
    }

    /// Location of a castle's root directory.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle has no root directory.
    pub fn show_path(&self, name: impl AsRef<str>) -> Result<PathBuf> {
        Ok(self.castle(name)?.root_dir().to_path_buf())
    }

    /// Clone a castle into the castle root.
    ///
    /// Local directories are linked into the castle root instead of being
    /// cloned. A destination that already exists is reported and left as is.
    /// Submodules are initialized and updated afterwards if the castle has
    /// any. Returns the castle repository directory.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Vcs`] if uri is unknown or cloning fails.
    /// - Return [`StoreError::AlreadyInStore`] if local path is inside the
    ///   castle root already.
    /// - Return [`StoreError::InvalidName`] if no castle name can be derived.
    #[instrument(skip(self, engine), level = "debug")]
    pub fn clone_castle<R, P>(
        &self,
        uri: &str,
        name: Option<&str>,
        engine: &Reconciler<R, P>,
    ) -> Result<PathBuf>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let source = CloneSource::parse(uri)?;
        let name = name.map(ToString::to_string).unwrap_or_else(|| source.default_name());
        if name.is_empty() || Path::new(&name).components().count() != 1 {
            return Err(StoreError::InvalidName(name));
        }
        let destination = self.paths.castle_repo(&name);

        match (&source, source.url()) {
            (CloneSource::Local(path), _) => {
                if normalize(path).starts_with(normalize(self.paths.castle_root())) {
                    return Err(StoreError::AlreadyInStore(path.clone()));
                }
                engine.create_symlink(path, &destination)?;
            }
            (_, Some(url)) => {
                if exists(&destination)? {
                    engine.report(StatusEvent::Exists {
                        path: destination.clone(),
                    });
                    return Ok(destination);
                }

                if !engine.options().pretend {
                    mkdirp::mkdirp(self.paths.castle_root()).map_err(|err| StoreError::Io {
                        source: err,
                        path: self.paths.castle_root().to_path_buf(),
                    })?;
                }
                self.run_vcs(
                    engine,
                    "git clone",
                    format!("{url} to {}", destination.display()),
                    |vcs| vcs.clone_repo(&url, &destination),
                )?;
            }
            (_, None) => return Err(VcsError::UnknownUri(uri.to_string()).into()),
        }

        self.setup_submodules(&destination, engine)?;
        info!("castle {name:?} ready at {:?}", destination.display());

        Ok(destination)
    }

    /// Generate a brand new castle repository at a path.
    ///
    /// Initializes the repository unless one is already there, adds an
    /// `origin` remote on GitHub when `github.user` is configured, and
    /// creates the castle root directory.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Vcs`] if repository setup fails.
    /// - Return [`StoreError::Io`] if directories cannot be created.
    #[instrument(skip(self, engine), level = "debug")]
    pub fn generate<R, P>(&self, path: &Path, engine: &Reconciler<R, P>) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let path = normalize(&std::path::absolute(path).map_err(|err| StoreError::Io {
            source: err,
            path: path.to_path_buf(),
        })?);
        let pretend = engine.options().pretend;

        if !pretend {
            mkdirp::mkdirp(&path).map_err(|err| StoreError::Io {
                source: err,
                path: path.clone(),
            })?;
        }

        if self.vcs.is_repository(&path) {
            engine.report(StatusEvent::Vcs {
                command: "git init".into(),
                detail: "already initialized".into(),
            });
        } else {
            self.run_vcs(engine, "git init", "", |vcs| vcs.init(&path))?;
        }

        if let Some(user) = self.vcs.github_user()? {
            let repo = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let url = format!("git@github.com:{user}/{repo}.git");
            let existing = if pretend {
                None
            } else {
                self.vcs.remote_url(&path, "origin")?
            };

            if existing.is_some() {
                engine.report(StatusEvent::Vcs {
                    command: "git remote".into(),
                    detail: "origin already exists".into(),
                });
            } else {
                self.run_vcs(engine, "git remote", format!("add origin {url}"), |vcs| {
                    vcs.add_remote(&path, "origin", &url)
                })?;
            }
        }

        if !pretend {
            let root = path.join(CASTLE_HOME);
            mkdirp::mkdirp(&root).map_err(|err| StoreError::Io { source: err, path: root })?;
        }

        Ok(())
    }

    /// Link every entry of a castle into the home directory.
    ///
    /// Returns the number of entries that failed.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Link`] if a non per-file error occurs.
    #[instrument(skip(self, engine), level = "debug")]
    pub fn link<R, P>(&self, name: &str, engine: &Reconciler<R, P>) -> Result<usize>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        let subdirs = castle.subdirs().list()?;
        let mut failed = 0;
        for entry in castle.entries(&subdirs)? {
            let home_path = self.paths.home_dir().join(&entry.relative_path);
            match engine.create_symlink(&entry.absolute_path, &home_path) {
                Ok(outcome) => debug!("{:?}: {outcome:?}", home_path.display()),
                Err(err) if err.is_per_file() => {
                    failed += 1;
                    report_failure(engine, &entry.absolute_path, &err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(failed)
    }

    /// Remove every home directory symlink of a castle.
    ///
    /// Returns the number of links removed.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Link`] if links cannot be removed.
    #[instrument(skip(self, engine), level = "debug")]
    pub fn unlink<R, P>(&self, name: &str, engine: &Reconciler<R, P>) -> Result<usize>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        let subdirs = castle.subdirs().list()?;
        let mut removed = 0;
        for entry in castle.entries(&subdirs)? {
            let home_path = self.paths.home_dir().join(&entry.relative_path);
            if engine.remove_tracked_link(&home_path)? {
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Track live files with a castle, then link them back into place.
    ///
    /// Each file is moved into the castle, linked back to where it was,
    /// and staged. Nested files register their parent directory as a subdir.
    /// A file whose tracked copy is more recent is left alone entirely. A
    /// directory merge with declined entries is staged, but not linked.
    /// Returns the number of files that failed.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Track`] if a non per-file error occurs.
    #[instrument(skip(self, files, engine), level = "debug")]
    pub fn track<R, P>(
        &self,
        name: &str,
        files: impl IntoIterator<Item = impl AsRef<Path>>,
        engine: &Reconciler<R, P>,
    ) -> Result<usize>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        let mut failed = 0;
        for file in files {
            let file = file.as_ref();
            match self.track_one(file, &castle, engine) {
                Ok(()) => {}
                Err(err) if err.is_per_file() => {
                    failed += 1;
                    report_failure(engine, file, &err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(failed)
    }

    fn track_one<R, P>(&self, file: &Path, castle: &Castle, engine: &Reconciler<R, P>) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let home = self.paths.home_dir();
        let file = normalize(file);
        let planned = resolve_tracked_target(&file, home, castle).map_err(TrackError::from)?;
        let outcome = TrackMigrator::new(engine, home).track(&file, castle)?;
        let partial = matches!(outcome, TrackOutcome::PartiallyMerged(_));
        if !outcome.is_tracked() && !partial {
            debug!("{:?} not tracked: {outcome:?}", file.display());
            return Ok(());
        }

        // INVARIANT: a partial merge leaves declined entries in the live
        // directory, so it must never be linked over as a whole.
        if outcome.is_tracked() {
            if engine.options().pretend {
                engine.report(StatusEvent::SymlinkCreated {
                    source: planned.target.clone(),
                    destination: file.clone(),
                });
            } else {
                engine
                    .create_symlink(&planned.target, &file)
                    .map_err(TrackError::from)?;
            }
        }

        self.run_vcs(
            engine,
            "git add",
            planned.target.display().to_string(),
            |vcs| vcs.add(castle.repo_dir(), &planned.target),
        )?;

        let nested = planned.relative_dir != Path::new(".");
        let subdirs = castle.subdirs();
        if nested && !engine.options().pretend {
            subdirs.edit(|records| records.insert(&planned.relative_dir))?;
        }
        if nested || partial {
            self.run_vcs(
                engine,
                "git add",
                subdirs.path().display().to_string(),
                |vcs| vcs.add(castle.repo_dir(), subdirs.path()),
            )?;
        }

        Ok(())
    }

    /// Pull castle from upstream, then bring submodules up to date.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Vcs`] if Git fails.
    pub fn pull<R, P>(&self, name: &str, engine: &Reconciler<R, P>) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        self.run_vcs(engine, "git pull", "", |vcs| vcs.pull(castle.repo_dir()))?;
        self.run_vcs(engine, "git submodule", "init", |vcs| {
            vcs.submodule_init(castle.repo_dir())
        })?;
        self.run_vcs(engine, "git submodule", "update", |vcs| {
            vcs.submodule_update(castle.repo_dir())
        })
    }

    /// Push castle to upstream.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Vcs`] if Git fails.
    pub fn push<R, P>(&self, name: &str, engine: &Reconciler<R, P>) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        self.run_vcs(engine, "git push", "", |vcs| vcs.push(castle.repo_dir()))
    }

    /// Commit all changes of a castle.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Vcs`] if Git fails.
    pub fn commit<R, P>(
        &self,
        name: &str,
        message: Option<&str>,
        engine: &Reconciler<R, P>,
    ) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        self.run_vcs(engine, "git commit all", "", |vcs| {
            vcs.commit_all(castle.repo_dir(), message)
        })
    }

    /// Show working tree status of a castle.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Vcs`] if Git fails.
    pub fn status<R, P>(&self, name: &str, engine: &Reconciler<R, P>) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        self.run_vcs(engine, "git status", "", |vcs| vcs.status(castle.repo_dir()))
    }

    /// Show unstaged changes of a castle.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Vcs`] if Git fails.
    pub fn diff<R, P>(&self, name: &str, engine: &Reconciler<R, P>) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        self.run_vcs(engine, "git diff", "", |vcs| vcs.diff(castle.repo_dir()))
    }

    /// Unlink a castle and delete its repository.
    ///
    /// Asks for confirmation before deleting unless force mode is on. Returns
    /// whether the castle was removed.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CastleNotFound`] if castle does not exist.
    /// - Return [`StoreError::Prompt`] if confirmation cannot be obtained.
    /// - Return [`StoreError::Link`] if removal fails.
    #[instrument(skip(self, engine), level = "debug")]
    pub fn destroy<R, P>(&self, name: &str, engine: &Reconciler<R, P>) -> Result<bool>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        let castle = self.castle(name)?;
        self.unlink(name, engine)?;

        let options = engine.options();
        let confirmed = options.force
            || (!options.skip
                && engine
                    .prompt()
                    .confirm("This will destroy your castle irreversibly! Are you sure?")?);
        if !confirmed {
            return Ok(false);
        }

        engine.remove_tree(castle.repo_dir())?;
        Ok(true)
    }

    fn setup_submodules<R, P>(&self, repo: &Path, engine: &Reconciler<R, P>) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
    {
        if !repo.join(".gitmodules").exists() {
            return Ok(());
        }

        self.run_vcs(engine, "git submodule", "init", |vcs| vcs.submodule_init(repo))?;
        self.run_vcs(engine, "git submodule", "update", |vcs| {
            vcs.submodule_update(repo)
        })
    }

    // Report a version control step, then run it unless pretending.
    fn run_vcs<R, P, F>(
        &self,
        engine: &Reconciler<R, P>,
        command: &str,
        detail: impl Into<String>,
        call: F,
    ) -> Result<()>
    where
        R: StatusReporter,
        P: UserPrompt,
        F: FnOnce(&V) -> std::result::Result<(), VcsError>,
    {
        engine.report(StatusEvent::Vcs {
            command: command.to_string(),
            detail: detail.into(),
        });
        if engine.options().pretend {
            return Ok(());
        }

        Ok(call(&self.vcs)?)
    }
}

fn report_failure<R, P>(engine: &Reconciler<R, P>, path: &Path, err: &dyn std::error::Error)
where
    R: StatusReporter,
    P: UserPrompt,
{
    debug!("skipping {:?}: {err:?}", path.display());
    engine.report(StatusEvent::Failed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    });
}

/// All possible error types for castle store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Castle has no root directory in the castle root.
    #[error("castle {name:?} does not exist, expected {:?} to contain dotfiles", path.display())]
    CastleNotFound { name: String, path: PathBuf },

    /// Local castle already lives inside the castle root.
    #[error("castle already cloned to {:?}", .0.display())]
    AlreadyInStore(PathBuf),

    /// Castle name is empty or contains path separators.
    #[error("invalid castle name {0:?}")]
    InvalidName(String),

    /// Castle content cannot be listed.
    #[error(transparent)]
    Castle(#[from] CastleError),

    /// Subdir registry cannot be read or written.
    #[error(transparent)]
    Subdir(#[from] SubdirError),

    /// Reconciliation fails.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Tracking fails.
    #[error(transparent)]
    Track(#[from] TrackError),

    /// Path planning fails.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Confirmation prompt fails.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Version control fails.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Directory creation fails.
    #[error("failed to create directory {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl StoreError {
    /// Check if error only concerns the single path being processed.
    pub fn is_per_file(&self) -> bool {
        match self {
            Self::Link(err) => err.is_per_file(),
            Self::Track(err) => err.is_per_file(),
            Self::Plan(PlanError::InvalidPath { .. }) => true,
            _ => false,
        }
    }
}

/// Friendly result alias :3
type Result<T, E = StoreError> = std::result::Result<T, E>;
