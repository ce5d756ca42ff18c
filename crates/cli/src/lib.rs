use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use command::ask::AskArgs;
use command::chat::ChatArgs;
use command::chunk::ChunkArgs;
use docchat_generator::GenerationMode;
use docchat_vector_store::{EmbeddingMode, DEFAULT_MODEL_ID};
use settings::{Overrides, Settings};
use std::io;
use std::path::PathBuf;

mod command;
mod models;
mod settings;
mod sources;

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Ask questions about web pages and documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Settings file (default: ./docchat.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override embedding backend
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedModeFlag>,

    /// Override embedding model id
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Model directory (overrides DOCCHAT_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Override generation backend
    #[arg(long, global = true, value_enum)]
    gen_mode: Option<GenModeFlag>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true)]
    llm_endpoint: Option<String>,

    /// Generation model name
    #[arg(long, global = true)]
    llm_model: Option<String>,

    #[command(flatten)]
    rag: RagFlags,
}

#[derive(Args)]
struct RagFlags {
    /// Words per chunk
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Words shared by consecutive chunks
    #[arg(long, global = true)]
    overlap: Option<usize>,

    /// Chunks retrieved per question
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Minimum top score for answering from the documents (0.0-1.0)
    #[arg(long, global = true)]
    threshold: Option<f32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question, optionally from documents
    Ask(AskArgs),

    /// Interactive question answering over stdin
    Chat(ChatArgs),

    /// Print the chunks documents would be split into (JSON)
    Chunk(ChunkArgs),

    /// Download an embedding model into the model dir
    #[command(name = "install-model")]
    InstallModel(InstallModelArgs),
}

#[derive(Args)]
struct InstallModelArgs {
    /// Model id
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// Re-download files that already exist
    #[arg(long)]
    force: bool,

    /// Output JSON report
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum EmbedModeFlag {
    Fast,
    Stub,
}

impl EmbedModeFlag {
    const fn as_domain(self) -> EmbeddingMode {
        match self {
            Self::Fast => EmbeddingMode::Fast,
            Self::Stub => EmbeddingMode::Stub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum GenModeFlag {
    Http,
    Stub,
}

impl GenModeFlag {
    const fn as_domain(self) -> GenerationMode {
        match self {
            Self::Http => GenerationMode::Http,
            Self::Stub => GenerationMode::Stub,
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            embed_mode: self.embed_mode.map(EmbedModeFlag::as_domain),
            embed_model: self.embed_model.clone(),
            model_dir: self.model_dir.clone(),
            gen_mode: self.gen_mode.map(GenModeFlag::as_domain),
            llm_endpoint: self.llm_endpoint.clone(),
            llm_model: self.llm_model.clone(),
            chunk_size: self.rag.chunk_size,
            overlap: self.rag.overlap,
            top_k: self.rag.top_k,
            threshold: self.rag.threshold,
        }
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ORT is extremely noisy
    if !verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Ask(args) => args.json,
        Commands::Chunk(_) => true,
        Commands::InstallModel(args) => args.json,
        Commands::Chat(_) => false,
    };
    init_logging(cli.quiet || json_output, cli.verbose);

    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())?;

    match cli.command {
        Commands::Ask(args) => command::ask::run(args, &settings).await?,
        Commands::Chat(args) => command::chat::run(args, &settings).await?,
        Commands::Chunk(args) => command::chunk::run(args, &settings).await?,
        Commands::InstallModel(args) => run_install_model(args, &settings).await?,
    }

    Ok(())
}

async fn run_install_model(args: InstallModelArgs, settings: &Settings) -> Result<()> {
    let model_dir = settings.embedding.resolved_model_dir();
    let report = models::install_model(&args.model, &model_dir, args.force).await?;

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&report)?)?;
    } else {
        eprintln!("Model: {} ({})", report.model, report.model_dir);
        for file in &report.files {
            let state = if file.downloaded { "downloaded" } else { "kept" };
            print_stdout(&format!("{}  {} ({state})", file.sha256, file.path))?;
        }
    }

    Ok(())
}
