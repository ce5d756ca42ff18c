use super::{prepare_knowledge_base, SourceArgs};
use crate::print_stdout;
use crate::settings::Settings;
use anyhow::{Context as AnyhowContext, Result};
use clap::Args;
use docchat_assistant::{resources, Route};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to answer
    pub question: String,

    #[command(flatten)]
    pub sources: SourceArgs,

    /// Answer from general knowledge even when documents are loaded
    #[arg(long)]
    pub no_rag: bool,

    /// Print the reply as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct AskOutput {
    pub reply: String,
    pub route: Route,
    pub source: Option<String>,
    pub chunks: usize,
    pub warnings: Vec<String>,
}

pub async fn run(args: AskArgs, settings: &Settings) -> Result<()> {
    let assistant =
        resources::shared(&settings.assistant()).context("Failed to initialise assistant")?;

    let (report, warnings) =
        prepare_knowledge_base(&assistant, &args.sources, &settings.sources).await?;
    if !args.json {
        for warning in &warnings {
            eprintln!("warning: {warning}");
        }
    }

    let reply = assistant
        .respond(&args.question, !args.no_rag)
        .await
        .context("Failed to answer question")?;

    if args.json {
        let output = AskOutput {
            reply: reply.text,
            route: reply.route,
            source: assistant.active_source().await,
            chunks: report.map_or(0, |r| r.chunks),
            warnings,
        };
        print_stdout(&serde_json::to_string_pretty(&output)?)?;
    } else {
        print_stdout(&reply.text)?;
    }
    Ok(())
}
