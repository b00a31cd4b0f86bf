//! The archive collaborator: a sorted-by-title article corpus.
//!
//! The engine only ever reads through [`Archive`]; the two implementations
//! here cover tests ([`MemoryArchive`]) and plain JSONL dumps ([`JsonlArchive`]).

mod jsonl;
mod memory;

pub use jsonl::JsonlArchive;
pub use memory::MemoryArchive;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle to one article. `locator` is meaningful only to the archive
/// that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub locator: u64,
}

impl ArticleRef {
    pub fn new(title: impl Into<String>, locator: u64) -> Self {
        Self { title: title.into(), locator }
    }
}

/// Read-only access to an article archive. Implementations are shared between
/// interactive readers and the index builder, hence `Send + Sync`.
pub trait Archive: Send + Sync {
    /// Exact lookup; spaces and underscores are interchangeable.
    fn resolve_title(&self, title: &str) -> Result<Option<ArticleRef>>;

    /// Every article in the archive's native (title) order. Restartable:
    /// each call starts from the first article.
    fn titles(&self) -> Box<dyn Iterator<Item = Result<ArticleRef>> + '_>;

    /// Raw markup of one article.
    fn read_body(&self, article: &ArticleRef) -> Result<Vec<u8>>;

    fn article_count(&self) -> u64;
}

impl<T: Archive + ?Sized> Archive for Arc<T> {
    fn resolve_title(&self, title: &str) -> Result<Option<ArticleRef>> {
        (**self).resolve_title(title)
    }

    fn titles(&self) -> Box<dyn Iterator<Item = Result<ArticleRef>> + '_> {
        (**self).titles()
    }

    fn read_body(&self, article: &ArticleRef) -> Result<Vec<u8>> {
        (**self).read_body(article)
    }

    fn article_count(&self) -> u64 {
        (**self).article_count()
    }
}

/// Case- and separator-insensitive form of a title, used for every title
/// comparison outside the archive's native order.
pub fn fold_title(title: &str) -> String {
    title.trim().replace('_', " ").to_lowercase()
}

/// Folded title -> first ordinal with that folded form.
fn folded_lookup<'a>(titles: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (ordinal, title) in titles.enumerate() {
        map.entry(fold_title(title)).or_insert(ordinal);
    }
    map
}
