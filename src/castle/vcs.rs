// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control plumbing for castles.
//!
//! Castles are plain Git repositories. Repository setup (initialization,
//! remotes, cloning) goes through libgit2. Day-to-day commands that the user
//! wants to see and interact with (pull, push, commit, status, diff) are
//! handed straight to the Git binary, which inherits the terminal. Output of
//! those commands is never parsed.

use auth_git2::{GitAuthenticator, Prompter};
use git2::{build::RepoBuilder, Config, ErrorCode, FetchOptions, RemoteCallbacks, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Command,
    time,
};
use tracing::{debug, info, instrument};

/// Layer of indirection for version control of castles.
pub trait VersionControl {
    /// Clone remote repository into destination.
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()>;

    /// Initialize new repository.
    fn init(&self, path: &Path) -> Result<()>;

    /// Check if path is the top-level of a repository.
    fn is_repository(&self, path: &Path) -> bool;

    /// URL of named remote, if it exists.
    fn remote_url(&self, repo: &Path, name: &str) -> Result<Option<String>>;

    /// Add named remote.
    fn add_remote(&self, repo: &Path, name: &str, url: &str) -> Result<()>;

    /// GitHub user name from global Git configuration, if set.
    fn github_user(&self) -> Result<Option<String>>;

    /// Pull from upstream.
    fn pull(&self, repo: &Path) -> Result<()>;

    /// Push to upstream.
    fn push(&self, repo: &Path) -> Result<()>;

    /// Commit all changes, opening an editor when no message is given.
    fn commit_all(&self, repo: &Path, message: Option<&str>) -> Result<()>;

    /// Initialize submodules.
    fn submodule_init(&self, repo: &Path) -> Result<()>;

    /// Update submodules recursively.
    fn submodule_update(&self, repo: &Path) -> Result<()>;

    /// Stage a path.
    fn add(&self, repo: &Path, path: &Path) -> Result<()>;

    /// Show working tree status.
    fn status(&self, repo: &Path) -> Result<()>;

    /// Show unstaged changes.
    fn diff(&self, repo: &Path) -> Result<()>;
}

/// Version control through libgit2 and the Git binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    /// Construct new Git version control.
    pub fn new() -> Self {
        Self
    }

    fn git(
        &self,
        repo: &Path,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Result<()> {
        let mut bin_args: Vec<OsString> = vec!["-C".into(), repo.as_os_str().to_owned()];
        bin_args.extend(args.into_iter().map(Into::into));
        syscall_interactive("git", bin_args)
    }
}

impl VersionControl for GitCli {
    /// Clone remote repository into destination.
    ///
    /// The progress of the clone is displayed through a progress bar. If any
    /// credentials are required, then the user is prompted for them, and the
    /// progress bar is blocked for user input. The clone is configured to
    /// push to its upstream branch by default.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError::Git2`] if libgit2 operations fail.
    /// - Return [`VcsError::IndicatifStyleTemplate`] if progress bar cannot
    ///   be styled.
    #[instrument(skip(self), level = "debug")]
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
        let bar = ProgressBar::new(0)
            .with_style(ProgressStyle::with_template("{spinner} {msg}  [{bar:40}] {pos}/{len}")?)
            .with_message(url.to_string());
        bar.enable_steady_tick(time::Duration::from_millis(100));

        let prompter = ProgressPrompter { bar: bar.clone() };
        let authenticator = GitAuthenticator::default().set_prompter(prompter);
        let config = Config::open_default()?;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(authenticator.credentials(&config));
        callbacks.transfer_progress(|progress| {
            bar.set_length(progress.total_objects() as u64);
            bar.set_position(progress.received_objects() as u64);
            true
        });

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);
        let result = RepoBuilder::new().fetch_options(fetch).clone(url, destination);
        bar.finish_and_clear();

        result?.config()?.set_str("push.default", "upstream")?;
        info!("cloned {url} into {:?}", destination.display());

        Ok(())
    }

    fn init(&self, path: &Path) -> Result<()> {
        debug!("initialize repository at {:?}", path.display());
        Repository::init(path)?;
        Ok(())
    }

    fn is_repository(&self, path: &Path) -> bool {
        Repository::open(path).is_ok()
    }

    fn remote_url(&self, repo: &Path, name: &str) -> Result<Option<String>> {
        let repository = Repository::open(repo)?;
        let url = match repository.find_remote(name) {
            Ok(remote) => remote.url().map(ToString::to_string),
            Err(err) if err.code() == ErrorCode::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        Ok(url)
    }

    fn add_remote(&self, repo: &Path, name: &str, url: &str) -> Result<()> {
        Repository::open(repo)?.remote(name, url)?;
        Ok(())
    }

    fn github_user(&self) -> Result<Option<String>> {
        match Config::open_default()?.get_string("github.user") {
            Ok(user) if user.trim().is_empty() => Ok(None),
            Ok(user) => Ok(Some(user.trim().to_string())),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn pull(&self, repo: &Path) -> Result<()> {
        self.git(repo, ["pull", "--quiet"])
    }

    fn push(&self, repo: &Path) -> Result<()> {
        self.git(repo, ["push"])
    }

    fn commit_all(&self, repo: &Path, message: Option<&str>) -> Result<()> {
        match message {
            Some(message) => self.git(repo, ["commit", "-a", "-m", message]),
            None => self.git(repo, ["commit", "-v", "-a"]),
        }
    }

    fn submodule_init(&self, repo: &Path) -> Result<()> {
        self.git(repo, ["submodule", "--quiet", "init"])
    }

    fn submodule_update(&self, repo: &Path) -> Result<()> {
        self.git(repo, ["submodule", "--quiet", "update", "--init", "--recursive"])
    }

    fn add(&self, repo: &Path, path: &Path) -> Result<()> {
        self.git(repo, [OsStr::new("add"), path.as_os_str()])
    }

    fn status(&self, repo: &Path) -> Result<()> {
        self.git(repo, ["status"])
    }

    fn diff(&self, repo: &Path) -> Result<()> {
        self.git(repo, ["diff"])
    }
}

/// Where a castle gets cloned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneSource {
    /// Existing directory on the local file system.
    Local(PathBuf),

    /// GitHub `user/repo` shorthand.
    GitHub(String),

    /// Any other Git URL.
    Url(String),
}

impl CloneSource {
    /// Determine clone source from user input.
    ///
    /// Existing local paths win over everything else. Then `user/repo`
    /// shorthand, then anything that looks like a Git URL.
    ///
    /// # Errors
    ///
    /// - Return [`VcsError::UnknownUri`] if input matches no known format.
    pub fn parse(uri: &str) -> Result<Self> {
        let path = Path::new(uri);
        if path.exists() {
            let path = std::path::absolute(path).map_err(VcsError::Syscall)?;
            return Ok(Self::Local(path));
        }

        if is_github_shorthand(uri) {
            return Ok(Self::GitHub(uri.to_string()));
        }

        if uri.contains(':') && !repo_basename(uri).is_empty() {
            return Ok(Self::Url(uri.to_string()));
        }

        Err(VcsError::UnknownUri(uri.to_string()))
    }

    /// URL to clone from, if cloning goes through Git.
    pub fn url(&self) -> Option<String> {
        match self {
            Self::Local(_) => None,
            Self::GitHub(shorthand) => Some(format!("https://github.com/{shorthand}.git")),
            Self::Url(url) => Some(url.clone()),
        }
    }

    /// Castle name to use when none is given.
    pub fn default_name(&self) -> String {
        match self {
            Self::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::GitHub(uri) | Self::Url(uri) => repo_basename(uri),
        }
    }
}

fn is_github_shorthand(uri: &str) -> bool {
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    };

    match uri.split_once('/') {
        Some((user, repo)) => valid(user) && valid(repo),
        None => false,
    }
}

fn repo_basename(uri: &str) -> String {
    let last = uri
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

// Ask for clone credentials without the progress bar drawing over the prompt.
#[derive(Debug, Clone)]
struct ProgressPrompter {
    bar: ProgressBar,
}

impl ProgressPrompter {
    fn secret(&self, label: &str) -> Option<String> {
        self.bar
            .suspend(|| Password::new(label).without_confirmation().prompt().ok())
    }
}

impl Prompter for ProgressPrompter {
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("credentials required for {url}");
        let username = self.bar.suspend(|| Text::new("username").prompt().ok())?;
        Some((username, self.secret("password")?))
    }

    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("password required for {username} at {url}");
        self.secret("password")
    }

    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("passphrase required for {:?}", ssh_key_path.display());
        self.secret("passphrase")
    }
}

fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let status = Command::new(cmd.as_ref()).args(args).spawn()?.wait()?;
    if !status.success() {
        return Err(VcsError::Syscall(std::io::Error::other(format!(
            "command {:?} failed",
            cmd.as_ref()
        ))));
    }

    Ok(())
}

/// Version control error types.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// Clone source matches no known format.
    #[error("unknown repository uri format: {0}")]
    UnknownUri(String),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Git binary failed or could not be run.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = VcsError> = std::result::Result<T, E>;
