//! Search and navigation engine for an offline encyclopedia reader.
//!
//! Queries resolve against the archive's titles or, when one has been built,
//! a secondary full-text index; opened articles are cleaned, wrapped, paged
//! and recorded in a back/forward history.

pub mod archive;
pub mod builder;
pub mod cleaner;
pub mod config;
mod error;
pub mod fulltext;
pub mod history;
pub mod paginate;
pub mod persist;
pub mod session;
pub mod title_search;
pub mod tokenizer;

pub use archive::{Archive, ArticleRef, JsonlArchive, MemoryArchive};
pub use builder::{BuildProgress, CancelFlag, IndexBuilder, NoProgress, ProgressSink};
pub use config::{BuildOptions, ReaderConfig};
pub use error::{EngineError, Result};
pub use fulltext::FullTextIndex;
pub use history::{History, HistoryEntry};
pub use paginate::{ArticleView, Page};
pub use persist::{IndexBuildState, IndexPaths, IndexStore};
pub use session::{SearchSession, SearchSource, SessionController, SessionState};
pub use title_search::TitleIndex;

use serde::{Deserialize, Serialize};

/// One entry of a ranked result list. `rank` is the 1-based number the
/// user selects it by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub rank: usize,
    pub title: String,
    pub article: ArticleRef,
    /// Matched-token count for full-text hits; `None` for title hits.
    pub score: Option<f32>,
}
