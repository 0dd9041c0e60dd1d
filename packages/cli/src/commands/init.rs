use super::Context;
use crate::config::DEFAULT_CONFIG_NAME;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_workspace::EngineConfig;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Title of the first page
    #[arg(default_value = "Getting started")]
    pub title: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub async fn init(args: InitArgs, root: &Path) -> Result<()> {
    let config_path = root.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Folio store...".bright_blue().bold());

    if !root.exists() {
        fs::create_dir_all(root)?;
        println!("  {} Created {}/", "✓".green(), root.display());
    }

    let config = EngineConfig::default();
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let ctx = Context::new(root.to_path_buf(), config);
    let session = ctx.sessions().create(&args.title, None).await?;
    let id = session.id().to_string();
    session.close().await?;
    println!("  {} Created page {} ({})", "✓".green(), args.title, id.dimmed());

    println!();
    println!("{}", "✅ Store initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: folio show {id}");
    println!(
        "  2. Run: folio apply {id} '{{\"action\":\"INSERT_CONTENT\",\"content\":\"Hello\"}}'"
    );

    Ok(())
}
