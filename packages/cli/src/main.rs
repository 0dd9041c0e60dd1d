mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, children, delete, history, init, link, sanitize, show, validate, ApplyArgs,
    ChildrenArgs, Context, DeleteArgs, HistoryArgs, HistoryStep, InitArgs, LinkArgs, SanitizeArgs,
    ShowArgs, ValidateArgs,
};
use config::ConfigOverrides;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Folio CLI - inspect and edit block documents
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the document store
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log engine activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a document store with a config file and a first page
    Init(InitArgs),

    /// Print a document's blocks
    Show(ShowArgs),

    /// Check a document or a JSON block file against the schema
    Validate(ValidateArgs),

    /// Repair a JSON block file into a valid document
    Sanitize(SanitizeArgs),

    /// Apply a JSON command to a document
    Apply(ApplyArgs),

    /// Undo the last structural change
    Undo(HistoryArgs),

    /// Redo the last undone change
    Redo(HistoryArgs),

    /// Create a child document and link it from a document
    Link(LinkArgs),

    /// List a document's child documents
    Children(ChildrenArgs),

    /// Delete a document and its history
    Delete(DeleteArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        root,
        overrides,
        command,
        ..
    } = cli;

    if let Command::Init(args) = command {
        return init(args, &root).await;
    }

    let config = config::load(&root, &overrides)?;
    let ctx = Context::new(root, config);

    match command {
        Command::Init(_) => Ok(()),
        Command::Show(args) => show(args, &ctx).await,
        Command::Validate(args) => validate(args, &ctx).await,
        Command::Sanitize(args) => sanitize(args, &ctx),
        Command::Apply(args) => apply(args, &ctx).await,
        Command::Undo(args) => history(args, HistoryStep::Undo, &ctx).await,
        Command::Redo(args) => history(args, HistoryStep::Redo, &ctx).await,
        Command::Link(args) => link(args, &ctx).await,
        Command::Children(args) => children(args, &ctx).await,
        Command::Delete(args) => delete(args, &ctx).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
