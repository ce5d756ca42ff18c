use super::{load_sources, SourceArgs};
use crate::print_stdout;
use crate::settings::Settings;
use anyhow::{Context as AnyhowContext, Result};
use clap::Args;
use docchat_chunker::{Chunk, Chunker};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ChunkArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Debug, Serialize)]
pub struct ChunkOutput {
    pub source: Option<String>,
    pub chunk_size: usize,
    pub overlap: usize,
    pub chunks: Vec<Chunk>,
    pub warnings: Vec<String>,
}

/// Print the chunks a knowledge-base build would index, without embedding them.
pub async fn run(args: ChunkArgs, settings: &Settings) -> Result<()> {
    if args.sources.is_empty() {
        anyhow::bail!("Nothing to chunk: pass --file or --url");
    }

    let chunker = Chunker::new(settings.rag.chunker_config()).context("Invalid chunking parameters")?;
    let loaded = load_sources(&args.sources, &settings.sources).await;
    let mut warnings = loaded.warnings;

    let mut chunks = Vec::new();
    for text in &loaded.texts {
        let chunked = chunker.chunk_raw(text);
        for warning in chunked.warnings {
            let message = warning.to_string();
            if !warnings.contains(&message) {
                warnings.push(message);
            }
        }
        for chunk in chunked.chunks {
            chunks.push(Chunk::new(chunks.len(), chunk.text));
        }
    }

    let output = ChunkOutput {
        source: loaded.label.map(|label| label.to_string()),
        chunk_size: settings.rag.chunk_size,
        overlap: chunker.config().resolve().0,
        chunks,
        warnings,
    };
    print_stdout(&serde_json::to_string_pretty(&output)?)?;
    Ok(())
}
