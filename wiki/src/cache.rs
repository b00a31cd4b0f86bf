//! The last search, kept in the temp dir so `wiki read N` works across runs.

use anyhow::{Context, Result};
use engine::SearchSession;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const CACHE_FILE: &str = ".wiki_last_search.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSearch {
    /// Archive the results point into.
    pub archive: PathBuf,
    pub session: SearchSession,
}

pub fn default_path() -> PathBuf {
    std::env::temp_dir().join(CACHE_FILE)
}

pub fn save(path: &Path, cached: &CachedSearch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("writing {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, cached)?;
    writer.flush().with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// `Ok(None)` when nothing has been cached yet.
pub fn load(path: &Path) -> Result<Option<CachedSearch>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };
    match serde_json::from_reader(BufReader::new(file)) {
        Ok(cached) => Ok(Some(cached)),
        Err(err) => {
            tracing::warn!(error = %err, cache = %path.display(), "ignoring unreadable search cache");
            fs::remove_file(path).ok();
            Ok(None)
        }
    }
}
