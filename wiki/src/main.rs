mod cache;
mod interactive;
mod render;

use anyhow::{bail, Context, Result};
use cache::CachedSearch;
use clap::{Parser, Subcommand};
use engine::paginate::DEFAULT_PAGE_SIZE;
use engine::{IndexPaths, JsonlArchive, ReaderConfig, SessionController};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "wiki")]
#[command(about = "Offline encyclopedia reader", long_about = None)]
struct Cli {
    /// Archive path (JSONL file or directory of JSON/JSONL files)
    #[arg(long, env = "WIKI_ARCHIVE", global = true)]
    archive: Option<PathBuf>,
    /// Full-text index directory; title search is used when absent
    #[arg(long, env = "WIKI_INDEX", default_value = "./wiki_index", global = true)]
    index: PathBuf,
    /// Lines per page
    #[arg(long, env = "WIKI_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE, global = true)]
    page_size: usize,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive reader (the default)
    #[command(visible_alias = "i")]
    Interactive {
        #[arg(long, default_value_t = engine::config::DEFAULT_MAX_RESULTS)]
        limit: usize,
    },
    /// Search and print the numbered results
    #[command(visible_alias = "s")]
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print result N of the last search
    #[command(visible_alias = "r")]
    Read { number: usize },
    /// Print the article with this exact title
    #[command(visible_alias = "g")]
    Get {
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Print the best match for a query
    #[command(visible_alias = "q")]
    Quick {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();
    let config = ReaderConfig { page_size: cli.page_size, ..ReaderConfig::default() };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command.unwrap_or(Commands::Interactive { limit: config.max_results }) {
        Commands::Interactive { limit } => {
            let mut session = open_session(&archive_path(cli.archive.as_deref())?, &cli.index, config)?;
            interactive::run(&mut session, limit, io::stdin().lock(), &mut out)
        }
        Commands::Search { query, limit } => {
            let archive = archive_path(cli.archive.as_deref())?;
            let mut session = open_session(&archive, &cli.index, config)?;
            let query = query.join(" ");
            let found = session.search(&query, limit)?;
            render::print_results(&mut out, found)?;
            if found.is_empty() {
                bail!("no results for {query:?}");
            }
            let cached = CachedSearch { archive, session: found.clone() };
            match cache::save(&cache::default_path(), &cached) {
                Ok(()) => writeln!(out, "\nTip: use 'wiki read <number>' to open an article from this list")?,
                Err(err) => tracing::warn!(error = %err, "could not cache search results"),
            }
            Ok(())
        }
        Commands::Read { number } => {
            let Some(cached) = cache::load(&cache::default_path())? else {
                bail!("no recent search; run 'wiki search <query>' first");
            };
            let archive = cli.archive.unwrap_or_else(|| cached.archive.clone());
            let mut session = open_session(&archive, &cli.index, config)?;
            session.adopt_session(cached.session)?;
            let view = session.open_result(number)?;
            render::print_article(&mut out, view)?;
            Ok(())
        }
        Commands::Get { title } => {
            let mut session = open_session(&archive_path(cli.archive.as_deref())?, &cli.index, config)?;
            let view = session.read_direct(&title.join(" "))?;
            render::print_article(&mut out, view)?;
            Ok(())
        }
        Commands::Quick { query } => {
            let mut session = open_session(&archive_path(cli.archive.as_deref())?, &cli.index, config)?;
            let view = session.quick(&query.join(" "))?;
            render::print_article(&mut out, view)?;
            Ok(())
        }
    }
}

fn archive_path(arg: Option<&Path>) -> Result<PathBuf> {
    match arg {
        Some(path) => Ok(path.to_path_buf()),
        None => bail!("no archive given; set WIKI_ARCHIVE or pass --archive"),
    }
}

fn open_session(archive: &Path, index: &Path, config: ReaderConfig) -> Result<SessionController<JsonlArchive>> {
    let reader = JsonlArchive::open(archive).with_context(|| format!("opening archive {}", archive.display()))?;
    let mut session = SessionController::new(reader, config)?;
    if session.attach_index(&IndexPaths::new(index)) {
        tracing::debug!(index = %index.display(), "full-text search enabled");
    }
    Ok(session)
}
