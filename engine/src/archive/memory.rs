use super::{fold_title, folded_lookup, Archive, ArticleRef};
use crate::{EngineError, Result};
use std::collections::HashMap;

/// An archive held entirely in memory, sorted by title on construction.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    articles: Vec<(String, String)>,
    folded: HashMap<String, usize>,
}

impl MemoryArchive {
    pub fn new<I, T, B>(articles: I) -> Self
    where
        I: IntoIterator<Item = (T, B)>,
        T: Into<String>,
        B: Into<String>,
    {
        let mut articles: Vec<(String, String)> = articles
            .into_iter()
            .map(|(t, b)| (t.into(), b.into()))
            .collect();
        articles.sort_by(|a, b| a.0.cmp(&b.0));
        articles.dedup_by(|a, b| a.0 == b.0);
        let folded = folded_lookup(articles.iter().map(|(t, _)| t.as_str()));
        Self { articles, folded }
    }

    fn article_ref(&self, ordinal: usize) -> ArticleRef {
        ArticleRef::new(self.articles[ordinal].0.clone(), ordinal as u64)
    }
}

impl Archive for MemoryArchive {
    fn resolve_title(&self, title: &str) -> Result<Option<ArticleRef>> {
        if let Ok(ordinal) = self.articles.binary_search_by(|(t, _)| t.as_str().cmp(title)) {
            return Ok(Some(self.article_ref(ordinal)));
        }
        Ok(self.folded.get(&fold_title(title)).map(|&ordinal| self.article_ref(ordinal)))
    }

    fn titles(&self) -> Box<dyn Iterator<Item = Result<ArticleRef>> + '_> {
        Box::new((0..self.articles.len()).map(move |ordinal| Ok(self.article_ref(ordinal))))
    }

    fn read_body(&self, article: &ArticleRef) -> Result<Vec<u8>> {
        match self.articles.get(article.locator as usize) {
            Some((title, body)) if *title == article.title => Ok(body.clone().into_bytes()),
            _ => Err(EngineError::archive(format!(
                "no article at locator {} for {:?}",
                article.locator, article.title
            ))),
        }
    }

    fn article_count(&self) -> u64 {
        self.articles.len() as u64
    }
}
