use super::Context;
use anyhow::{anyhow, Context as _, Result};
use clap::Args;
use colored::Colorize;
use folio_schema::{check_document_value, sanitize as sanitize_blocks, Violation};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Document id, or path to a JSON file (block array or stored document)
    pub target: String,
}

#[derive(Debug, Args)]
pub struct SanitizeArgs {
    /// JSON file holding a block array or a stored document
    pub input: PathBuf,

    /// Title used when the input has no usable blocks
    #[arg(long)]
    pub title: Option<String>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn validate(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let path = Path::new(&args.target);
    let blocks = if path.is_file() {
        read_blocks_value(path)?
    } else {
        let raw = ctx.load(&args.target).await?;
        serde_json::from_str(&raw.blocks_json)
            .with_context(|| format!("blocksJSON of {} is not JSON", raw.id))?
    };

    match check_document_value(&blocks) {
        Ok(blocks) => {
            println!(
                "{} {} is valid ({} top-level blocks)",
                "✓".green(),
                args.target.bright_white(),
                blocks.len()
            );
            Ok(())
        }
        Err(violation) => Err(invalid(&args.target, &violation)),
    }
}

fn invalid(target: &str, violation: &Violation) -> anyhow::Error {
    anyhow!("{target} is not a valid document: {violation}")
}

pub fn sanitize(args: SanitizeArgs, ctx: &Context) -> Result<()> {
    let value = match read_blocks_value(&args.input) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Unreadable input, starting from an empty document");
            Value::Null
        }
    };

    let title = args.title.as_deref().unwrap_or(&ctx.config.untitled_title);
    let blocks = sanitize_blocks(&value, title);
    let json = serde_json::to_string_pretty(&blocks)?;

    match args.output {
        Some(output) => {
            fs::write(&output, json)?;
            println!(
                "{} Wrote {} blocks to {}",
                "✓".green(),
                blocks.len(),
                output.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Read a block array from a file. Stored documents are unwrapped through
/// their `blocksJSON` field.
fn read_blocks_value(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not JSON", path.display()))?;

    match value.get("blocksJSON").and_then(Value::as_str) {
        Some(inner) => serde_json::from_str(inner)
            .with_context(|| format!("blocksJSON in {} is not JSON", path.display())),
        None => Ok(value),
    }
}
