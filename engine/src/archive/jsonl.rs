use super::{fold_title, folded_lookup, Archive, ArticleRef};
use crate::{EngineError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    title: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct TitleOnly {
    title: String,
}

#[derive(Debug)]
enum Source {
    /// Byte offset of the record's line inside a `.jsonl` file.
    Line { file: usize, offset: u64 },
    /// Body of a record loaded from a `.json` file.
    Inline(String),
}

#[derive(Debug)]
struct Entry {
    title: String,
    source: Source,
}

/// Archive over `.jsonl`/`.json` dumps of `{"title": ..., "body": ...}`
/// records. JSONL bodies stay on disk and are read by offset on demand.
#[derive(Debug)]
pub struct JsonlArchive {
    files: Vec<PathBuf>,
    entries: Vec<Entry>,
    folded: HashMap<String, usize>,
}

impl JsonlArchive {
    /// Scan a file, or every `.json`/`.jsonl` file under a directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut files: Vec<PathBuf> = Vec::new();
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                    files.push(p.to_path_buf());
                }
            }
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            return Err(EngineError::archive(format!("archive not found: {}", path.display())));
        }

        let mut entries = Vec::new();
        for (file_idx, file) in files.iter().enumerate() {
            if extension(file) == Some("jsonl") {
                scan_jsonl(file, file_idx, &mut entries)?;
            } else {
                scan_json(file, &mut entries)?;
            }
        }
        // Stable sort keeps the first record of a duplicated title.
        entries.sort_by(|a, b| a.title.cmp(&b.title));
        entries.dedup_by(|a, b| a.title == b.title);
        let folded = folded_lookup(entries.iter().map(|e| e.title.as_str()));
        tracing::debug!(files = files.len(), articles = entries.len(), "opened jsonl archive");
        Ok(Self { files, entries, folded })
    }

    fn article_ref(&self, ordinal: usize) -> ArticleRef {
        ArticleRef::new(self.entries[ordinal].title.clone(), ordinal as u64)
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

fn scan_jsonl(file: &Path, file_idx: usize, entries: &mut Vec<Entry>) -> Result<()> {
    let mut reader = BufReader::new(File::open(file).map_err(EngineError::archive)?);
    let mut offset = 0u64;
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(EngineError::archive)?;
        if read == 0 {
            break;
        }
        if !line.trim().is_empty() {
            let doc: TitleOnly = serde_json::from_str(&line).map_err(|e| {
                EngineError::archive(format!("{} at byte {offset}: {e}", file.display()))
            })?;
            entries.push(Entry { title: doc.title, source: Source::Line { file: file_idx, offset } });
        }
        offset += read as u64;
    }
    Ok(())
}

fn scan_json(file: &Path, entries: &mut Vec<Entry>) -> Result<()> {
    let reader = BufReader::new(File::open(file).map_err(EngineError::archive)?);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .map_err(|e| EngineError::archive(format!("{}: {e}", file.display())))?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => Vec::new(),
    };
    for v in docs {
        let doc: InputDoc = serde_json::from_value(v)
            .map_err(|e| EngineError::archive(format!("{}: {e}", file.display())))?;
        entries.push(Entry { title: doc.title, source: Source::Inline(doc.body) });
    }
    Ok(())
}

impl Archive for JsonlArchive {
    fn resolve_title(&self, title: &str) -> Result<Option<ArticleRef>> {
        if let Ok(ordinal) = self.entries.binary_search_by(|e| e.title.as_str().cmp(title)) {
            return Ok(Some(self.article_ref(ordinal)));
        }
        Ok(self.folded.get(&fold_title(title)).map(|&ordinal| self.article_ref(ordinal)))
    }

    fn titles(&self) -> Box<dyn Iterator<Item = Result<ArticleRef>> + '_> {
        Box::new((0..self.entries.len()).map(move |ordinal| Ok(self.article_ref(ordinal))))
    }

    fn read_body(&self, article: &ArticleRef) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .get(article.locator as usize)
            .filter(|e| e.title == article.title)
            .ok_or_else(|| EngineError::archive(format!("stale reference to {:?}", article.title)))?;
        match &entry.source {
            Source::Inline(body) => Ok(body.clone().into_bytes()),
            Source::Line { file, offset } => {
                let path = &self.files[*file];
                let mut f = File::open(path).map_err(EngineError::archive)?;
                f.seek(SeekFrom::Start(*offset)).map_err(EngineError::archive)?;
                let mut line = String::new();
                BufReader::new(f).read_line(&mut line).map_err(EngineError::archive)?;
                let doc: InputDoc = serde_json::from_str(&line)
                    .map_err(|e| EngineError::archive(format!("{}: {e}", path.display())))?;
                Ok(doc.body.into_bytes())
            }
        }
    }

    fn article_count(&self) -> u64 {
        self.entries.len() as u64
    }
}
