use crate::persist::{IndexPaths, IndexStore};
use crate::tokenizer::tokenize;
use crate::{EngineError, Result, SearchResult};
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FullTextMatches {
    pub results: Vec<SearchResult>,
    /// Articles matching at least one query token.
    pub total: usize,
}

/// Query side of the secondary index.
#[derive(Debug, Clone)]
pub struct FullTextIndex {
    store: IndexStore,
}

impl FullTextIndex {
    pub fn new(store: IndexStore) -> Self {
        Self { store }
    }

    /// `Ok(None)` when no index has been built at `paths`.
    pub fn open(paths: &IndexPaths) -> Result<Option<Self>> {
        Ok(IndexStore::open(paths)?.map(Self::new))
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Rank articles by how many distinct query tokens they contain, ties by
    /// title. Only committed batches are searched: the committed ordinal is
    /// read once up front and later postings are ignored.
    pub fn search(&self, query: &str, max_results: usize) -> Result<FullTextMatches> {
        if max_results == 0 {
            return Err(EngineError::constraint("max_results must be positive"));
        }
        let empty = FullTextMatches { results: Vec::new(), total: 0 };
        let Some(committed) = self.store.load_state()?.and_then(|s| s.last_processed_ordinal) else {
            return Ok(empty);
        };
        let mut tokens = tokenize(query, &self.store.tokenizer());
        tokens.sort();
        tokens.dedup();
        if tokens.is_empty() {
            return Ok(empty);
        }

        let mut matched: HashMap<u64, u32> = HashMap::new();
        for token in &tokens {
            for (ordinal, _count) in self.store.postings(token)? {
                if ordinal <= committed {
                    *matched.entry(ordinal).or_insert(0) += 1;
                }
            }
        }
        let total = matched.len();

        // Titles are only needed for articles that can still make the cut.
        let mut counts: Vec<u32> = matched.values().copied().collect();
        let cutoff = if counts.len() > max_results {
            *counts.select_nth_unstable_by_key(max_results - 1, |c| Reverse(*c)).1
        } else {
            0
        };
        let mut candidates = Vec::new();
        for (ordinal, count) in matched.into_iter().filter(|(_, c)| *c >= cutoff) {
            let article = self
                .store
                .doc(ordinal)?
                .ok_or_else(|| EngineError::IndexCorrupt(format!("posting for unknown document {ordinal}")))?;
            candidates.push((count, article));
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.title.cmp(&b.1.title)));

        let results: Vec<SearchResult> = candidates
            .into_iter()
            .take(max_results)
            .enumerate()
            .map(|(i, (count, article))| SearchResult {
                rank: i + 1,
                title: article.title.clone(),
                article,
                score: Some(count as f32),
            })
            .collect();
        tracing::debug!(query, tokens = tokens.len(), total, returned = results.len(), "full-text search");
        Ok(FullTextMatches { results, total })
    }
}
