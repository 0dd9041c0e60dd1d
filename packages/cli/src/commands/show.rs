use super::Context;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::Document;
use folio_schema::{Block, BlockType, TextRun, PROP_CHECKED, PROP_TARGET_ID, PROP_TARGET_TITLE};
use folio_workspace::Storage;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Document id
    pub id: String,

    /// Print the sanitized blocks as JSON instead of an outline
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ChildrenArgs {
    /// Parent document id
    pub id: String,
}

pub async fn show(args: ShowArgs, ctx: &Context) -> Result<()> {
    let raw = ctx.load(&args.id).await?;
    let document = Document::from_raw(&raw, &ctx.config.untitled_title);

    if args.json {
        println!("{}", serde_json::to_string_pretty(document.blocks.as_ref())?);
        return Ok(());
    }

    let icon = document.metadata.icon.as_deref().unwrap_or("📄");
    println!("{} {}", icon, document.metadata.title.bold());
    println!(
        "{}",
        format!(
            "id {} · updated {}",
            document.id,
            document.metadata.updated_at.format("%Y-%m-%d %H:%M")
        )
        .dimmed()
    );
    println!();

    for line in outline(&document.blocks, 0) {
        println!("{line}");
    }

    Ok(())
}

pub async fn children(args: ChildrenArgs, ctx: &Context) -> Result<()> {
    let children = ctx.storage().list_children(&args.id).await?;

    if children.is_empty() {
        println!("{} {} has no child documents", "ℹ".blue(), args.id);
        return Ok(());
    }

    for child in children {
        println!(
            "  {} {}  {}",
            child.icon.as_deref().unwrap_or("📄"),
            child.title,
            child.id.dimmed()
        );
    }

    Ok(())
}

/// Render blocks as indented text lines
pub fn outline(blocks: &[Block], depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let indent = "  ".repeat(depth);
    let mut number = 0;

    for block in blocks {
        number = if block.block_type == BlockType::NumberedListItem {
            number + 1
        } else {
            0
        };

        let text = render_runs(&block.content);
        let line = match block.block_type {
            BlockType::Heading => {
                let level = block.heading_level().unwrap_or(1) as usize;
                format!("{} {}", "#".repeat(level), text).bold().to_string()
            }
            BlockType::Paragraph => text,
            BlockType::BulletListItem => format!("• {text}"),
            BlockType::NumberedListItem => format!("{number}. {text}"),
            BlockType::CheckListItem => {
                let checked = block
                    .props
                    .get(PROP_CHECKED)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                format!("[{}] {text}", if checked { "x" } else { " " })
            }
            BlockType::Quote => format!("│ {}", text.italic()),
            BlockType::Code => format!("`{text}`"),
            BlockType::Link => format!(
                "→ {} {}",
                block.prop_str(PROP_TARGET_TITLE).unwrap_or_default().underline(),
                format!("({})", block.prop_str(PROP_TARGET_ID).unwrap_or_default()).dimmed()
            ),
        };

        lines.push(format!("{indent}{line}"));
        lines.extend(outline(&block.children, depth + 1));
    }

    lines
}

fn render_runs(runs: &[TextRun]) -> String {
    runs.iter()
        .map(|run| {
            let mut text = run.text.normal();
            if run.styles.bold {
                text = text.bold();
            }
            if run.styles.italic {
                text = text.italic();
            }
            if run.styles.underline {
                text = text.underline();
            }
            text.to_string()
        })
        .collect()
}
