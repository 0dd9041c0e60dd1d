use super::Context;
use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::{Command, CommandReport};
use folio_workspace::{SessionHandle, WorkspaceResult};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Document id
    pub id: String,

    /// Command JSON, e.g. '{"action":"DELETE_BLOCKS","target":{"blockIds":["b1"]}}'
    pub command: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Document id
    pub id: String,
}

#[derive(Debug, Clone, Copy)]
pub enum HistoryStep {
    Undo,
    Redo,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Parent document id
    pub id: String,

    /// Title of the new child document
    pub title: String,

    /// Icon shown on the link
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Document id
    pub id: String,
}

/// Run one command in a short-lived session, always closing it.
///
/// Callers check the document exists first: opening an unknown id starts a
/// fresh document.
async fn run_in_session(ctx: &Context, id: &str, command: Command) -> Result<CommandReport> {
    let session = ctx.sessions().open(id).await?;
    let result = session.execute(command).await;
    let closed = close(session).await;

    let report = result?;
    closed?;
    Ok(report)
}

async fn close(session: SessionHandle) -> WorkspaceResult<()> {
    session.close().await.map(|_| ())
}

fn print_report(report: &CommandReport) {
    println!(
        "{} {} affected {} block(s) {}",
        "✓".green(),
        report.action.bright_white(),
        report.affected,
        format!("(version {})", report.version).dimmed()
    );
}

pub async fn apply(args: ApplyArgs, ctx: &Context) -> Result<()> {
    let command: Command =
        serde_json::from_str(&args.command).context("Command is not valid command JSON")?;
    ctx.load(&args.id).await?;

    let report = run_in_session(ctx, &args.id, command).await?;
    print_report(&report);
    Ok(())
}

pub async fn history(args: HistoryArgs, step: HistoryStep, ctx: &Context) -> Result<()> {
    let command = match step {
        HistoryStep::Undo => Command::Undo,
        HistoryStep::Redo => Command::Redo,
    };

    ctx.load(&args.id).await?;

    let report = run_in_session(ctx, &args.id, command).await?;
    if report.affected == 0 {
        let what = match step {
            HistoryStep::Undo => "undo",
            HistoryStep::Redo => "redo",
        };
        println!("{} Nothing to {what}", "ℹ".blue());
    } else {
        print_report(&report);
    }
    Ok(())
}

pub async fn link(args: LinkArgs, ctx: &Context) -> Result<()> {
    ctx.load(&args.id).await?;

    let command = Command::CreateLinkedDocument {
        title: args.title,
        icon: args.icon,
    };
    let report = run_in_session(ctx, &args.id, command).await?;
    print_report(&report);
    Ok(())
}

pub async fn delete(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let session = ctx.sessions().open(&args.id).await?;
    if session.delete_document().await? {
        println!("{} Deleted {}", "✓".green(), args.id);
    } else {
        println!("{} {} did not exist", "⚠️".yellow(), args.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_editor::Document;
    use folio_workspace::EngineConfig;

    #[tokio::test]
    async fn test_apply_undo_redo_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(dir.path().to_path_buf(), EngineConfig::default());
        let session = ctx.sessions().create("Inbox", None).await.unwrap();
        let id = session.id().to_string();
        session.close().await.unwrap();

        let texts = |raw: &folio_schema::RawDocument| -> Vec<String> {
            Document::from_raw(raw, "Untitled")
                .blocks
                .iter()
                .map(|b| b.plain_text())
                .collect()
        };

        apply(
            ApplyArgs {
                id: id.clone(),
                command: r#"{"action":"INSERT_CONTENT","content":"call mom"}"#.to_string(),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(texts(&ctx.load(&id).await.unwrap()), vec!["Inbox", "call mom"]);

        history(HistoryArgs { id: id.clone() }, HistoryStep::Undo, &ctx)
            .await
            .unwrap();
        assert_eq!(texts(&ctx.load(&id).await.unwrap()), vec!["Inbox"]);

        history(HistoryArgs { id: id.clone() }, HistoryStep::Redo, &ctx)
            .await
            .unwrap();
        assert_eq!(texts(&ctx.load(&id).await.unwrap()), vec!["Inbox", "call mom"]);
    }

    #[tokio::test]
    async fn test_apply_to_missing_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(dir.path().to_path_buf(), EngineConfig::default());

        let result = apply(
            ApplyArgs {
                id: "ghost".to_string(),
                command: r#"{"action":"UNDO"}"#.to_string(),
            },
            &ctx,
        )
        .await;
        assert!(result.is_err());
        assert!(ctx.storage().list_all().await.unwrap().is_empty());
    }
}
