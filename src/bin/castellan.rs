// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use castellan::{
    castle::vcs::GitCli,
    config::{Options, Settings},
    link::Reconciler,
    path::{default_castle_root, default_config_path, home_dir, PathConfig},
    prompt::InquirePrompt,
    status::TracingReporter,
    store::CastleStore,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{fs::read_to_string, io::ErrorKind, path::PathBuf, process::exit};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "castellan [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub flags: GlobalFlags,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let castle_root = match settings.settings.castle_root.clone() {
            Some(root) => root,
            None => default_castle_root()?,
        };
        let store = CastleStore::new(PathConfig::new(home_dir()?, castle_root), GitCli::new());
        let options = self.flags.options();
        let engine = Reconciler::new(options, TracingReporter::new(options.quiet), InquirePrompt);
        let castle_or_default =
            |castle: Option<String>| castle.unwrap_or_else(|| settings.default_castle().into());

        match self.command {
            Command::Clone(opts) => {
                store.clone_castle(&opts.uri, opts.name.as_deref(), &engine)?;
            }
            Command::Generate(opts) => store.generate(&opts.path, &engine)?,
            Command::Link(opts) => {
                let failed = store.link(&castle_or_default(opts.castle), &engine)?;
                warn_failures(failed);
            }
            Command::Unlink(opts) => {
                store.unlink(&castle_or_default(opts.castle), &engine)?;
            }
            Command::Track(opts) => {
                let files = opts
                    .files
                    .iter()
                    .map(std::path::absolute)
                    .collect::<std::io::Result<Vec<_>>>()?;
                let failed = store.track(&castle_or_default(opts.castle), files, &engine)?;
                warn_failures(failed);
            }
            Command::Pull(opts) => store.pull(&castle_or_default(opts.castle), &engine)?,
            Command::Push(opts) => store.push(&castle_or_default(opts.castle), &engine)?,
            Command::Commit(opts) => store.commit(
                &castle_or_default(opts.castle),
                opts.message.as_deref(),
                &engine,
            )?,
            Command::Status(opts) => store.status(&castle_or_default(opts.castle), &engine)?,
            Command::Diff(opts) => store.diff(&castle_or_default(opts.castle), &engine)?,
            Command::Path(opts) => {
                let path = store.show_path(castle_or_default(opts.castle))?;
                println!("{}", path.display());
            }
            Command::Destroy(opts) => {
                store.destroy(&opts.castle, &engine)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
struct GlobalFlags {
    /// Overwrite files that already exist.
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Run but do not make any changes.
    #[arg(short, long, global = true)]
    pub pretend: bool,

    /// Skip files that already exist.
    #[arg(short, long, global = true)]
    pub skip: bool,

    /// Suppress status output.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalFlags {
    fn options(&self) -> Options {
        Options::default()
            .force(self.force)
            .pretend(self.pretend)
            .skip(self.skip)
            .quiet(self.quiet)
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Clone castle from local path, GitHub shorthand, or Git URL.
    #[command(override_usage = "castellan clone [options] <uri> [name]")]
    Clone(CloneOptions),

    /// Generate new castle repository.
    #[command(override_usage = "castellan generate [options] <path>")]
    Generate(GenerateOptions),

    /// Symlink all dotfiles of castle into home directory.
    #[command(visible_alias = "symlink")]
    Link(CastleOptions),

    /// Remove symlinks of castle from home directory.
    Unlink(CastleOptions),

    /// Move files into castle and symlink them back.
    #[command(override_usage = "castellan track [options] <file>... [--castle <castle>]")]
    Track(TrackOptions),

    /// Pull castle from upstream and update submodules.
    Pull(CastleOptions),

    /// Push castle to upstream.
    Push(CastleOptions),

    /// Commit all changes of castle.
    Commit(CommitOptions),

    /// Show working tree status of castle.
    Status(CastleOptions),

    /// Show unstaged changes of castle.
    Diff(CastleOptions),

    /// Print path to castle root directory.
    #[command(name = "path", visible_alias = "show-path")]
    Path(CastleOptions),

    /// Unlink castle and delete it.
    Destroy(DestroyOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CloneOptions {
    /// Local path, `user/repo` shorthand, or Git URL of castle.
    #[arg(required = true, value_name = "uri")]
    pub uri: String,

    /// Name to give castle instead of repository name.
    #[arg(value_name = "name")]
    pub name: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct GenerateOptions {
    /// Path to new castle repository.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CastleOptions {
    /// Name of castle, default castle if omitted.
    #[arg(value_name = "castle")]
    pub castle: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct TrackOptions {
    /// Files or directories to track.
    #[arg(required = true, value_name = "file")]
    pub files: Vec<PathBuf>,

    /// Name of castle, default castle if omitted.
    #[arg(short, long, value_name = "castle")]
    pub castle: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CommitOptions {
    /// Name of castle, default castle if omitted.
    #[arg(value_name = "castle")]
    pub castle: Option<String>,

    /// Commit message, editor opens if omitted.
    #[arg(short, long, value_name = "message")]
    pub message: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DestroyOptions {
    /// Name of castle to destroy.
    #[arg(required = true, value_name = "castle")]
    pub castle: String,
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.flags.quiet { "warn" } else { "info" };
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn load_settings() -> Result<Settings> {
    let path = default_config_path()?;
    match read_to_string(&path) {
        Ok(content) => content
            .parse::<Settings>()
            .with_context(|| format!("invalid configuration at {:?}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Settings::default()),
        Err(err) => Err(err).with_context(|| format!("cannot read {:?}", path.display())),
    }
}

fn warn_failures(failed: usize) {
    if failed > 0 {
        warn!("{failed} path(s) could not be processed");
    }
}
