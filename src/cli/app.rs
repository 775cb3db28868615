//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use super::list::ExternalDiffstat;
use super::log_message::MessageSource;
use super::output::{Output, OutputFormat};
use super::shelve::{ShelfCommands, ShelveOptions, UnshelveOptions};
use crate::domain::Depth;
use crate::storage::{Config, GitShelfStore, WorkingCopy};

/// Scratch file the message editor works on
const MESSAGE_SCRATCH: &str = "shelf-message.tmp";

#[derive(Parser)]
#[command(name = "shelf")]
#[command(author, version, about = "Set aside local edits as named patches")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Put local changes aside under a name
    Shelve(ShelveArgs),

    /// Bring shelved changes back (the youngest one if no name is given)
    Unshelve(UnshelveArgs),

    /// List shelved changes with a diffstat
    Shelves {
        #[arg(hide = true)]
        args: Vec<String>,
    },
}

#[derive(Args)]
pub struct ShelveArgs {
    /// Shelf name followed by the paths to shelve
    #[arg(value_name = "NAME")]
    pub args: Vec<String>,

    /// List shelved changes instead
    #[arg(long, short = 'l')]
    pub list: bool,

    /// Delete the named shelf instead
    #[arg(long, visible_alias = "delete")]
    pub remove: bool,

    /// Print nothing, or only summary information
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Try the operation but make no changes
    #[arg(long)]
    pub dry_run: bool,

    /// Do not revert the shelved edits from the working copy
    #[arg(long)]
    pub keep_local: bool,

    /// Limit how far below each path to look
    #[arg(long)]
    pub depth: Option<Depth>,

    /// Only shelve paths in this changelist (repeatable)
    #[arg(long = "changelist", visible_alias = "cl", value_name = "NAME")]
    pub changelists: Vec<String>,

    /// Shelf message
    #[arg(long, short = 'm', conflicts_with = "file")]
    pub message: Option<String>,

    /// Read the shelf message from a file
    #[arg(long, short = 'F')]
    pub file: Option<PathBuf>,

    /// Editor command used to write the shelf message
    #[arg(long, env = "SHELF_EDITOR")]
    pub editor_cmd: Option<String>,
}

impl ShelveArgs {
    fn options(&self) -> ShelveOptions {
        ShelveOptions {
            depth: self.depth,
            changelists: self.changelists.clone(),
            keep_local: self.keep_local,
            dry_run: self.dry_run,
            quiet: self.quiet,
        }
    }

    /// Picks the message source: inline text, then file, then an editor
    fn message_source(&self, config: &Config, store: &GitShelfStore) -> Option<MessageSource> {
        if let Some(text) = &self.message {
            return Some(MessageSource::Inline(text.clone()));
        }

        if let Some(path) = &self.file {
            return Some(MessageSource::File(path.clone()));
        }

        self.editor_cmd
            .clone()
            .or_else(|| config.global.editor.clone())
            .map(|command| MessageSource::Editor {
                command,
                scratch: store.dir().join(MESSAGE_SCRATCH),
            })
    }
}

#[derive(Args)]
pub struct UnshelveArgs {
    /// Shelf name (defaults to the youngest shelf)
    #[arg(value_name = "NAME")]
    pub args: Vec<String>,

    /// List shelved changes instead
    #[arg(long, short = 'l')]
    pub list: bool,

    /// Print nothing, or only summary information
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Try the operation but make no changes
    #[arg(long)]
    pub dry_run: bool,

    /// Keep the shelf after applying it
    #[arg(long)]
    pub keep_local: bool,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()
        .and_then(std::fs::canonicalize)
        .context("Failed to resolve current directory")?;
    let working_copy = WorkingCopy::discover(&cwd)?;
    let config = working_copy.config();

    let format = cli.format.unwrap_or(config.global.default_format);
    let output = Output::new(format, cli.verbose);

    output.verbose("Shelf CLI starting");
    output.verbose_ctx(
        "working-copy",
        &format!("root: {}", working_copy.root().display()),
    );

    let store = working_copy.store()?;
    let diffstat = ExternalDiffstat::new(config.global.diffstat_command.clone());
    let commands = ShelfCommands::new(&store, &output, &diffstat, cwd);

    match cli.command {
        Commands::Shelve(args) => {
            if args.list {
                commands.list("shelve", &args.args, !args.quiet)?
            } else if args.remove {
                commands.remove(&args.args, args.dry_run, args.quiet)?
            } else {
                let source = args.message_source(config, &store);
                commands.shelve(&args.args, &args.options(), source.as_ref())?
            }
        }

        Commands::Unshelve(args) => {
            if args.list {
                commands.list("unshelve", &args.args, !args.quiet)?
            } else {
                let opts = UnshelveOptions {
                    keep_local: args.keep_local,
                    dry_run: args.dry_run,
                    quiet: args.quiet,
                };
                commands.unshelve(&args.args, opts)?
            }
        }

        Commands::Shelves { args } => commands.shelves(&args)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}
