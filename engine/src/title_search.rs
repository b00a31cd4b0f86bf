//! Title lookup over the archive's title list.
//!
//! Titles are folded once (lowercase, `_` as space) and kept sorted by folded
//! form, so the window of prefix matches is found by binary search. Interior
//! substring matches need the rest of the list scanned, which is also what
//! makes the reported total exact.

use crate::archive::{fold_title, Archive, ArticleRef};
use crate::{EngineError, Result, SearchResult};

#[derive(Debug, Clone)]
struct TitleEntry {
    folded: String,
    ordinal: u64,
    article: ArticleRef,
}

/// Results of one title search: at most `max_results` hits, plus the number
/// of titles that matched in total.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleMatches {
    pub results: Vec<SearchResult>,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    entries: Vec<TitleEntry>,
}

impl TitleIndex {
    pub fn build<A: Archive + ?Sized>(archive: &A) -> Result<Self> {
        let mut entries = Vec::with_capacity(archive.article_count() as usize);
        for (ordinal, article) in archive.titles().enumerate() {
            let article = article?;
            entries.push(TitleEntry { folded: fold_title(&article.title), ordinal: ordinal as u64, article });
        }
        entries.sort_by(|a, b| a.folded.cmp(&b.folded).then(a.ordinal.cmp(&b.ordinal)));
        tracing::debug!(titles = entries.len(), "built title index");
        Ok(Self { entries })
    }

    /// Case-insensitive prefix-then-substring search. Prefix matches rank
    /// first; each group keeps the archive's own order.
    pub fn search(&self, query: &str, max_results: usize) -> Result<TitleMatches> {
        if max_results == 0 {
            return Err(EngineError::constraint("max_results must be positive"));
        }
        let needle = fold_title(query);
        if needle.is_empty() {
            return Ok(TitleMatches { results: Vec::new(), total: 0 });
        }

        let start = self.entries.partition_point(|e| e.folded.as_str() < needle.as_str());
        let end = start + self.entries[start..].partition_point(|e| e.folded.starts_with(&needle));

        let mut prefix: Vec<&TitleEntry> = self.entries[start..end].iter().collect();
        prefix.sort_unstable_by_key(|e| e.ordinal);

        let mut interior: Vec<&TitleEntry> = self.entries[..start]
            .iter()
            .chain(&self.entries[end..])
            .filter(|e| e.folded.contains(&needle))
            .collect();
        interior.sort_unstable_by_key(|e| e.ordinal);

        let total = prefix.len() + interior.len();
        let results: Vec<SearchResult> = prefix
            .into_iter()
            .chain(interior)
            .take(max_results)
            .enumerate()
            .map(|(i, e)| SearchResult {
                rank: i + 1,
                title: e.article.title.clone(),
                article: e.article.clone(),
                score: None,
            })
            .collect();
        tracing::debug!(query, total, returned = results.len(), "title search");
        Ok(TitleMatches { results, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;

    fn index(titles: &[&str]) -> TitleIndex {
        let archive = MemoryArchive::new(titles.iter().map(|t| (*t, "")));
        TitleIndex::build(&archive).unwrap()
    }

    fn titles(m: &TitleMatches) -> Vec<&str> {
        m.results.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn prefix_matches_rank_before_substring_matches() {
        let idx = index(&["Monty Python", "Python Software Foundation", "Python (programming language)", "Cobra"]);
        let m = idx.search("python", 10).unwrap();
        assert_eq!(
            titles(&m),
            vec!["Python (programming language)", "Python Software Foundation", "Monty Python"]
        );
        assert_eq!(m.total, 3);
        assert_eq!(m.results[2].rank, 3);
    }

    #[test]
    fn truncation_keeps_true_total() {
        let idx = index(&["Ab", "Abc", "Abd", "Xab"]);
        let m = idx.search("ab", 2).unwrap();
        assert_eq!(titles(&m), vec!["Ab", "Abc"]);
        assert_eq!(m.total, 4);
    }

    #[test]
    fn underscores_match_spaces() {
        let idx = index(&["Great_Britain", "Greater London"]);
        let m = idx.search("great britain", 5).unwrap();
        assert_eq!(titles(&m), vec!["Great_Britain"]);
    }

    #[test]
    fn empty_query_and_zero_limit() {
        let idx = index(&["A"]);
        assert_eq!(idx.search("   ", 5).unwrap().total, 0);
        assert!(matches!(idx.search("a", 0), Err(EngineError::ConstraintViolation(_))));
    }

    #[test]
    fn ties_follow_archive_order_not_case() {
        // Native order is byte order: uppercase sorts before lowercase.
        let idx = index(&["python", "Python"]);
        let m = idx.search("PYTHON", 5).unwrap();
        assert_eq!(titles(&m), vec!["Python", "python"]);
    }
}
