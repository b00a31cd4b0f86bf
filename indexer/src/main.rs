use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::builder::SinkError;
use engine::tokenizer::TokenizerConfig;
use engine::{BuildOptions, BuildProgress, IndexBuilder, IndexPaths, IndexStore, JsonlArchive, ProgressSink};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the full-text index for an article archive", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every article of the archive, resuming an interrupted build
    Build {
        /// Archive path (JSONL file or directory of JSON/JSONL files)
        #[arg(long, env = "WIKI_ARCHIVE")]
        archive: PathBuf,
        /// Output index directory
        #[arg(long, env = "WIKI_INDEX", default_value = "./wiki_index")]
        output: PathBuf,
        /// Articles committed per batch
        #[arg(long, default_value_t = engine::config::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Discard any existing index instead of resuming it
        #[arg(long, default_value_t = false)]
        replace: bool,
        /// Index raw words without English stemming
        #[arg(long, default_value_t = false)]
        no_stem: bool,
    },
    /// Show how far the index at OUTPUT has been built
    Status {
        #[arg(long, env = "WIKI_INDEX", default_value = "./wiki_index")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { archive, output, batch_size, replace, no_stem } => {
            let options = BuildOptions {
                batch_size,
                resume: !replace,
                tokenizer: TokenizerConfig { stem: !no_stem, ..TokenizerConfig::default() },
            };
            build_index(archive, output, options).await
        }
        Commands::Status { output } => show_status(output),
    }
}

async fn build_index(archive: PathBuf, output: PathBuf, options: BuildOptions) -> Result<()> {
    let archive = JsonlArchive::open(&archive)
        .with_context(|| format!("opening archive {}", archive.display()))?;
    let builder = IndexBuilder::open(&IndexPaths::new(&output), options)
        .with_context(|| format!("opening index {}", output.display()))?;
    let cancel = builder.cancel_flag();

    let mut task = tokio::task::spawn_blocking(move || builder.build(&archive, &mut LogProgress));
    let state = tokio::select! {
        joined = &mut task => joined??,
        _ = signal::ctrl_c() => {
            tracing::warn!("interrupt received; stopping after the current batch");
            cancel.cancel();
            task.await??
        }
    };

    if state.is_complete() {
        tracing::info!(output = %output.display(), articles = state.total_articles, "index ready");
    } else {
        tracing::warn!(
            processed = state.processed(),
            total = state.total_articles,
            "index incomplete; run build again to resume"
        );
    }
    Ok(())
}

fn show_status(output: PathBuf) -> Result<()> {
    let Some(store) = IndexStore::open(&IndexPaths::new(&output))? else {
        println!("no index at {}", output.display());
        return Ok(());
    };
    let meta = store.meta();
    println!("index:      {}", output.display());
    println!("created:    {}", meta.created_at);
    println!("stemming:   {}", if meta.tokenizer.stem { "english" } else { "off" });
    match store.load_state()? {
        Some(state) => {
            let percent = if state.total_articles == 0 {
                100.0
            } else {
                state.processed() as f64 * 100.0 / state.total_articles as f64
            };
            println!("progress:   {}/{} ({percent:.1}%)", state.processed(), state.total_articles);
        }
        None => println!("progress:   not started"),
    }
    Ok(())
}

/// Logs one line per committed batch.
struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_batch(&mut self, progress: &BuildProgress) -> std::result::Result<(), SinkError> {
        let eta = progress.eta().map_or_else(|| "unknown".to_string(), format_duration);
        tracing::info!(
            processed = progress.processed,
            total = progress.total,
            percent = %format!("{:.1}", progress.percent()),
            eta = %eta,
            "indexing"
        );
        Ok(())
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
