use super::{prepare_knowledge_base, SourceArgs};
use crate::print_stdout;
use crate::settings::Settings;
use anyhow::{Context as AnyhowContext, Result};
use clap::Args;
use docchat_assistant::{resources, Transcript};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Answer from general knowledge even when documents are loaded
    #[arg(long)]
    pub no_rag: bool,
}

enum Input<'a> {
    Quit,
    History,
    Skip,
    Question(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Skip,
        "/quit" | "/exit" => Input::Quit,
        "/history" => Input::History,
        question => Input::Question(question),
    }
}

fn render_history(transcript: &Transcript) -> String {
    transcript
        .turns()
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line-oriented chat over stdin. Each line is one question.
pub async fn run(args: ChatArgs, settings: &Settings) -> Result<()> {
    let assistant =
        resources::shared(&settings.assistant()).context("Failed to initialise assistant")?;

    let (report, warnings) =
        prepare_knowledge_base(&assistant, &args.sources, &settings.sources).await?;
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(report) = report.filter(|r| r.chunks > 0) {
        eprintln!(
            "Knowledge base ready: {} ({} chunks)",
            report.source.as_deref().unwrap_or("-"),
            report.chunks
        );
    }

    let mut transcript = Transcript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match classify(&line) {
            Input::Skip => continue,
            Input::Quit => break,
            Input::History => {
                if !transcript.is_empty() {
                    print_stdout(&render_history(&transcript))?;
                }
            }
            Input::Question(question) => {
                transcript.push_user(question);
                match assistant.respond(question, !args.no_rag).await {
                    Ok(reply) => {
                        print_stdout(&reply.text)?;
                        transcript.push_assistant(reply.text);
                    }
                    Err(err) => eprintln!("error: {err:#}"),
                }
            }
        }
    }

    log::debug!("Chat ended after {} turns", transcript.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify() {
        assert!(matches!(classify("  "), Input::Skip));
        assert!(matches!(classify("/quit"), Input::Quit));
        assert!(matches!(classify(" /history "), Input::History));
        assert!(matches!(classify(" what? "), Input::Question("what?")));
    }

    #[test]
    fn test_render_history() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.push_assistant("Hi! How can I help you today?");
        assert_eq!(
            render_history(&transcript),
            "user: hi\nassistant: Hi! How can I help you today?"
        );
    }
}
