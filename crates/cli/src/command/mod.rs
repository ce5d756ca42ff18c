pub mod ask;
pub mod chat;
pub mod chunk;

use crate::settings::SourceSettings;
use crate::sources::{load_file, load_url};
use anyhow::Result;
use clap::Args;
use docchat_assistant::{Assistant, BuildReport, SourceLabel};
use std::path::PathBuf;

/// Documents to build the knowledge base from
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Local document (.txt, .md, .pdf); repeatable
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Web page to scrape
    #[arg(long, value_name = "URL", conflicts_with = "files")]
    pub url: Option<String>,
}

impl SourceArgs {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.url.is_none()
    }
}

/// Extracted text plus the failures met along the way.
#[derive(Debug, Default)]
pub struct LoadedSources {
    pub label: Option<SourceLabel>,
    pub texts: Vec<String>,
    pub warnings: Vec<String>,
}

/// Read every requested document. Failures become warnings, never errors.
pub async fn load_sources(args: &SourceArgs, settings: &SourceSettings) -> LoadedSources {
    let mut loaded = LoadedSources::default();

    if let Some(url) = &args.url {
        loaded.label = Some(SourceLabel::Url(url.clone()));
        match load_url(url, settings.fetch_timeout()).await {
            Ok(text) => loaded.texts.push(text),
            Err(err) => {
                log::warn!("{err}");
                loaded.warnings.push(err.to_string());
            }
        }
    } else if !args.files.is_empty() {
        loaded.label = Some(SourceLabel::Files(args.files.len()));
        for path in &args.files {
            match load_file(path) {
                Ok(text) => loaded.texts.push(text),
                Err(err) => {
                    log::warn!("{err}");
                    loaded.warnings.push(err.to_string());
                }
            }
        }
    }

    loaded
}

/// Build the knowledge base from `args`, if any sources were given.
///
/// Returns the build report (when a build was attempted) and every warning
/// raised by loading or chunking.
pub async fn prepare_knowledge_base(
    assistant: &Assistant,
    args: &SourceArgs,
    settings: &SourceSettings,
) -> Result<(Option<BuildReport>, Vec<String>)> {
    let LoadedSources {
        label,
        texts,
        mut warnings,
    } = load_sources(args, settings).await;

    let Some(label) = label else {
        return Ok((None, warnings));
    };
    if texts.is_empty() {
        return Ok((None, warnings));
    }

    let report = assistant.build_knowledge_base(label, &texts).await?;
    warnings.extend(report.warnings.iter().cloned());
    Ok((Some(report), warnings))
}
