//! On-disk layout of the secondary full-text index.
//!
//! ```text
//! <root>/meta.json     schema version + tokenizer policy (JSON)
//! <root>/store/        sled database
//!     postings         token 0x00 ordinal_be -> match count (u32 be)
//!     docs             ordinal_be            -> ArticleRef (bincode)
//!     state            "build_state"         -> IndexBuildState (bincode)
//! ```
//!
//! A batch's postings, document rows and the advanced build state are written
//! in one transaction, so a reader never observes half a batch.

use crate::archive::ArticleRef;
use crate::tokenizer::TokenizerConfig;
use crate::{EngineError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::{Batch, Transactional, Tree};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Bumped whenever the key/value layout changes.
pub const SCHEMA_VERSION: u32 = 1;

const STATE_KEY: &[u8] = b"build_state";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub schema_version: u32,
    pub tokenizer: TokenizerConfig,
    pub created_at: String,
}

/// Durable progress of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBuildState {
    /// `None` until the first batch commits.
    pub last_processed_ordinal: Option<u64>,
    pub total_articles: u64,
    pub batch_size: usize,
}

impl IndexBuildState {
    pub fn fresh(total_articles: u64, batch_size: usize) -> Self {
        Self { last_processed_ordinal: None, total_articles, batch_size }
    }

    /// Ordinal a resumed build starts at.
    pub fn next_ordinal(&self) -> u64 {
        self.last_processed_ordinal.map_or(0, |o| o + 1)
    }

    pub fn processed(&self) -> u64 {
        self.next_ordinal()
    }

    pub fn is_complete(&self) -> bool {
        self.next_ordinal() >= self.total_articles
    }
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
    meta_file: PathBuf,
    store_dir: PathBuf,
}

impl IndexPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self { meta_file: root.join("meta.json"), store_dir: root.join("store"), root }
    }
}

impl MetaFile {
    fn write(&self, paths: &IndexPaths) -> Result<()> {
        fs::create_dir_all(&paths.root)?;
        fs::write(&paths.meta_file, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// `Ok(None)` when there is no meta file. A meta file this build cannot
    /// read, or one written for another layout, is `IndexCorrupt`.
    fn read(paths: &IndexPaths) -> Result<Option<Self>> {
        let bytes = match fs::read(&paths.meta_file) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let meta: Self =
            serde_json::from_slice(&bytes).map_err(|e| EngineError::IndexCorrupt(format!("meta.json: {e}")))?;
        if meta.schema_version != SCHEMA_VERSION {
            return Err(EngineError::IndexCorrupt(format!(
                "schema version {} (expected {SCHEMA_VERSION})",
                meta.schema_version
            )));
        }
        Ok(Some(meta))
    }
}

/// Postings and document rows gathered for one batch, not yet visible.
#[derive(Debug, Default)]
pub struct PendingBatch {
    postings: BTreeMap<(String, u64), u32>,
    docs: Vec<(u64, ArticleRef)>,
}

impl PendingBatch {
    pub fn add_document(&mut self, ordinal: u64, article: ArticleRef, tokens: impl IntoIterator<Item = String>) {
        for token in tokens {
            *self.postings.entry((token, ordinal)).or_insert(0) += 1;
        }
        self.docs.push((ordinal, article));
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }
}

/// Handle on an index directory. Cheap to clone; clones share one database.
#[derive(Clone)]
pub struct IndexStore {
    db: sled::Db,
    postings: Tree,
    docs: Tree,
    state: Tree,
    meta: MetaFile,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore").field("meta", &self.meta).finish()
    }
}

impl IndexStore {
    /// Start an empty index at `paths`, discarding whatever was there.
    pub fn create(paths: &IndexPaths, tokenizer: TokenizerConfig) -> Result<Self> {
        if paths.store_dir.exists() {
            fs::remove_dir_all(&paths.store_dir)?;
        }
        fs::create_dir_all(&paths.root)?;
        let meta = MetaFile {
            schema_version: SCHEMA_VERSION,
            tokenizer,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into()),
        };
        meta.write(paths)?;
        Self::open_db(paths, meta)
    }

    /// Open an existing index. `Ok(None)` when nothing has been built at
    /// `paths`; `IndexCorrupt` when what is there cannot be trusted.
    pub fn open(paths: &IndexPaths) -> Result<Option<Self>> {
        match MetaFile::read(paths)? {
            Some(meta) => Self::open_db(paths, meta).map(Some),
            None if paths.store_dir.exists() => {
                Err(EngineError::IndexCorrupt("store present without meta.json".into()))
            }
            None => Ok(None),
        }
    }

    fn open_db(paths: &IndexPaths, meta: MetaFile) -> Result<Self> {
        let db = sled::open(&paths.store_dir)?;
        let postings = db.open_tree("postings")?;
        let docs = db.open_tree("docs")?;
        let state = db.open_tree("state")?;
        Ok(Self { db, postings, docs, state, meta })
    }

    pub fn meta(&self) -> &MetaFile {
        &self.meta
    }

    pub fn tokenizer(&self) -> TokenizerConfig {
        self.meta.tokenizer
    }

    pub fn load_state(&self) -> Result<Option<IndexBuildState>> {
        match self.state.get(STATE_KEY)? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Atomically publish `batch` together with the advanced `state`, then
    /// flush to disk.
    pub fn commit_batch(&self, batch: &PendingBatch, state: &IndexBuildState) -> Result<()> {
        let mut posting_batch = Batch::default();
        for ((token, ordinal), count) in &batch.postings {
            posting_batch.insert(posting_key(token, *ordinal), &count.to_be_bytes()[..]);
        }
        let mut doc_batch = Batch::default();
        for (ordinal, article) in &batch.docs {
            doc_batch.insert(&ordinal.to_be_bytes()[..], bincode::serialize(article)?);
        }
        let state_bytes = bincode::serialize(state)?;

        (&self.postings, &self.docs, &self.state)
            .transaction(|(postings, docs, state_tree)| -> ConflictableTransactionResult<()> {
                postings.apply_batch(&posting_batch)?;
                docs.apply_batch(&doc_batch)?;
                state_tree.insert(STATE_KEY, state_bytes.as_slice())?;
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(()) => EngineError::IndexCorrupt("batch commit aborted".into()),
                TransactionError::Storage(err) => EngineError::Store(err),
            })?;
        self.db.flush()?;
        Ok(())
    }

    pub fn doc(&self, ordinal: u64) -> Result<Option<ArticleRef>> {
        match self.docs.get(ordinal.to_be_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// `(ordinal, count)` for every article containing `token`, ordinal ascending.
    pub fn postings(&self, token: &str) -> Result<Vec<(u64, u32)>> {
        let mut prefix = token.as_bytes().to_vec();
        prefix.push(0);
        let mut out = Vec::new();
        for item in self.postings.scan_prefix(&prefix) {
            let (key, value) = item?;
            let ordinal_bytes: [u8; 8] = key[prefix.len()..]
                .try_into()
                .map_err(|_| EngineError::IndexCorrupt(format!("bad posting key for {token:?}")))?;
            let count_bytes: [u8; 4] = value[..]
                .try_into()
                .map_err(|_| EngineError::IndexCorrupt(format!("bad posting count for {token:?}")))?;
            out.push((u64::from_be_bytes(ordinal_bytes), u32::from_be_bytes(count_bytes)));
        }
        Ok(out)
    }

    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    /// Every `(token, ordinal, count)` in key order.
    pub fn all_postings(&self) -> Result<Vec<(String, u64, u32)>> {
        let mut out = Vec::new();
        for item in self.postings.iter() {
            let (key, value) = item?;
            let split = key.len().checked_sub(9).filter(|&i| key[i] == 0).ok_or_else(|| {
                EngineError::IndexCorrupt("posting key too short".into())
            })?;
            let token = String::from_utf8(key[..split].to_vec())
                .map_err(|e| EngineError::IndexCorrupt(e.to_string()))?;
            let ordinal_bytes: [u8; 8] = key[split + 1..]
                .try_into()
                .map_err(|_| EngineError::IndexCorrupt("bad posting key".into()))?;
            let count_bytes: [u8; 4] = value[..]
                .try_into()
                .map_err(|_| EngineError::IndexCorrupt("bad posting count".into()))?;
            out.push((token, u64::from_be_bytes(ordinal_bytes), u32::from_be_bytes(count_bytes)));
        }
        Ok(out)
    }
}

fn posting_key(token: &str, ordinal: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(token.len() + 9);
    key.extend_from_slice(token.as_bytes());
    key.push(0);
    key.extend_from_slice(&ordinal.to_be_bytes());
    key
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| EngineError::IndexCorrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_index_opens_as_none() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("idx"));
        assert!(IndexStore::open(&paths).unwrap().is_none());
    }

    fn meta(schema_version: u32) -> MetaFile {
        MetaFile { schema_version, tokenizer: TokenizerConfig::default(), created_at: String::new() }
    }

    #[test]
    fn schema_mismatch_is_corrupt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        meta(SCHEMA_VERSION + 1).write(&paths).unwrap();
        assert!(matches!(MetaFile::read(&paths), Err(EngineError::IndexCorrupt(_))));
        assert!(matches!(IndexStore::open(&paths), Err(EngineError::IndexCorrupt(_))));
        assert!(!paths.store_dir.exists());
    }

    #[test]
    fn meta_reads_back_and_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        assert_eq!(MetaFile::read(&paths).unwrap(), None);
        meta(SCHEMA_VERSION).write(&paths).unwrap();
        assert_eq!(MetaFile::read(&paths).unwrap(), Some(meta(SCHEMA_VERSION)));
        fs::write(&paths.meta_file, "{\"schema_version\": ").unwrap();
        assert!(matches!(MetaFile::read(&paths), Err(EngineError::IndexCorrupt(_))));
    }

    #[test]
    fn committed_batch_is_readable() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let store = IndexStore::create(&paths, TokenizerConfig::default()).unwrap();
        assert_eq!(store.load_state().unwrap(), None);

        let mut batch = PendingBatch::default();
        batch.add_document(0, ArticleRef::new("Alpha", 0), ["rust".to_string(), "rust".to_string()]);
        batch.add_document(1, ArticleRef::new("Beta", 1), ["rust".to_string(), "sled".to_string()]);
        let state = IndexBuildState { last_processed_ordinal: Some(1), total_articles: 5, batch_size: 2 };
        store.commit_batch(&batch, &state).unwrap();

        assert_eq!(store.postings("rust").unwrap(), vec![(0, 2), (1, 1)]);
        assert_eq!(store.postings("rus").unwrap(), vec![]);
        assert_eq!(store.doc(1).unwrap(), Some(ArticleRef::new("Beta", 1)));
        assert_eq!(store.load_state().unwrap(), Some(state));
        assert_eq!(store.document_count(), 2);
    }
}
