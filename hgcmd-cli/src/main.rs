//! CLI for driving Mercurial through its command server.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod repo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use hgcmd::{Client, CloneOptions, Config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hgcmd", version, about = "Mercurial over the command server")]
struct Cli {
    /// Mercurial executable.
    #[arg(long, global = true, env = hgcmd::ENV_EXECUTABLE, default_value = "hg")]
    hg: PathBuf,

    /// Repository root.
    #[arg(short = 'R', long, global = true, default_value = ".")]
    repository: PathBuf,

    /// Log protocol traffic to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new repository.
    Init {
        /// Directory to create (default: the -R repository).
        path: Option<PathBuf>,
    },

    /// Copy an existing repository.
    Clone(CloneArgs),

    /// Print a file at a revision.
    Cat(repo::CatArgs),

    /// Schedule files for addition.
    Add {
        /// Files to add.
        #[arg(required = true, num_args = 1..)]
        files: Vec<String>,
    },

    /// Schedule files for removal.
    #[command(visible_alias = "rm")]
    Remove(repo::RemoveArgs),

    /// Commit changes.
    #[command(visible_alias = "ci")]
    Commit(repo::CommitArgs),

    /// Show history.
    Log(repo::LogArgs),

    /// Show changed files in the working directory.
    #[command(visible_alias = "st")]
    Status(repo::StatusArgs),

    /// Show repository heads.
    Heads(repo::HeadsArgs),

    /// Show remote paths.
    Paths {
        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Push changesets to a remote.
    Push(repo::PushArgs),

    /// Pull changesets from a remote.
    Pull(repo::PullArgs),

    /// Update the working directory.
    #[command(visible_alias = "up")]
    Update(repo::UpdateArgs),

    /// Merge another revision into the working directory.
    Merge(repo::MergeArgs),

    /// List or change the merge state of files.
    Resolve(repo::ResolveArgs),

    /// Show changesets the remote has.
    Incoming(repo::RemoteArgs),

    /// Show changesets the remote lacks.
    Outgoing(repo::RemoteArgs),

    /// Write an unversioned archive of a revision.
    Archive(repo::ArchiveArgs),

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Arguments for `hgcmd clone`.
#[derive(clap::Args)]
struct CloneArgs {
    /// Do not populate a working directory.
    #[arg(short = 'U', long)]
    noupdate: bool,

    /// Revision to check out.
    #[arg(short = 'u', long)]
    updaterev: Option<String>,

    /// Only clone this revision and its ancestors.
    #[arg(short, long)]
    rev: Option<String>,

    /// Only clone this branch.
    #[arg(short, long)]
    branch: Option<String>,

    /// Use the pull protocol.
    #[arg(long)]
    pull: bool,

    /// Source path or URL.
    source: String,

    /// Destination directory.
    dest: PathBuf,
}

/// Output format for list commands.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = cli.dispatch() {
        eprintln!("hgcmd: {e:#}");
        std::process::exit(1);
    }
}

/// Logs to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    fn dispatch(self) -> Result<()> {
        let config = Config::new(&self.hg);
        match self.command {
            Command::Init { path } => {
                let path = path.unwrap_or(self.repository);
                Client::init(&config, &path)
                    .with_context(|| format!("init {}", path.display()))
            }
            Command::Clone(args) => clone(&config, args),
            Command::Completion { shell } => {
                clap_complete::generate(shell, &mut Self::command(), "hgcmd", &mut std::io::stdout());
                Ok(())
            }
            command => {
                tracing::debug!(repo = %self.repository.display(), hg = %self.hg.display(), "connecting");
                let client = Client::connect(&config, &self.repository)
                    .with_context(|| format!("open {}", self.repository.display()))?;
                let result = run(&client, command);
                client.close()?;
                result
            }
        }
    }
}

/// Runs a command that needs a live session.
fn run(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::Cat(args) => repo::cat(client, args),
        Command::Add { files } => repo::add(client, &files),
        Command::Remove(args) => repo::remove(client, args),
        Command::Commit(args) => repo::commit(client, args),
        Command::Log(args) => repo::log(client, args),
        Command::Status(args) => repo::status(client, args),
        Command::Heads(args) => repo::heads(client, args),
        Command::Paths { format } => repo::paths(client, format),
        Command::Push(args) => repo::push(client, args),
        Command::Pull(args) => repo::pull(client, args),
        Command::Update(args) => repo::update(client, args),
        Command::Merge(args) => repo::merge(client, args),
        Command::Resolve(args) => repo::resolve(client, args),
        Command::Incoming(args) => repo::incoming(client, args),
        Command::Outgoing(args) => repo::outgoing(client, args),
        Command::Archive(args) => repo::archive(client, args),
        Command::Init { .. } | Command::Clone(_) | Command::Completion { .. } => {
            anyhow::bail!("command does not run in a session")
        }
    }
}

fn clone(config: &Config, args: CloneArgs) -> Result<()> {
    let mut opts = CloneOptions::new().noupdate(args.noupdate).pull(args.pull);
    if let Some(rev) = args.updaterev {
        opts = opts.updaterev(rev);
    }
    if let Some(rev) = args.rev {
        opts = opts.rev(rev);
    }
    if let Some(branch) = args.branch {
        opts = opts.branch(branch);
    }
    Client::clone_repo(config, &args.source, &args.dest, &opts)
        .with_context(|| format!("clone {}", args.source))?;
    println!("{}", args.dest.display());
    Ok(())
}
