//! One reader's session: search, open, page and navigate history.
//!
//! All state lives on [`SessionController`]; every action runs to completion
//! and either applies fully or leaves the session as it was.

use crate::archive::{Archive, ArticleRef};
use crate::cleaner::clean;
use crate::config::ReaderConfig;
use crate::fulltext::FullTextIndex;
use crate::history::History;
use crate::paginate::{wrap_text, ArticleView};
use crate::persist::IndexPaths;
use crate::title_search::TitleIndex;
use crate::{EngineError, Result, SearchResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ShowingResults,
    ReadingArticle,
    Closed,
}

/// Which search produced a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchSource {
    Title,
    FullText,
}

/// The most recent result list and the query behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    pub query: String,
    pub source: SearchSource,
    pub results: Vec<SearchResult>,
    /// Matches found before truncation to the requested limit.
    pub total_matches: usize,
}

impl SearchSession {
    /// 1-based lookup, matching the numbers shown to the user.
    pub fn get(&self, n: usize) -> Option<&SearchResult> {
        n.checked_sub(1).and_then(|i| self.results.get(i))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

pub struct SessionController<A: Archive> {
    archive: A,
    config: ReaderConfig,
    titles: Option<TitleIndex>,
    fulltext: Option<FullTextIndex>,
    state: SessionState,
    search: Option<SearchSession>,
    view: Option<ArticleView>,
    history: History,
}

impl<A: Archive> SessionController<A> {
    pub fn new(archive: A, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            archive,
            config,
            titles: None,
            fulltext: None,
            state: SessionState::Idle,
            search: None,
            view: None,
            history: History::new(),
        })
    }

    /// Try to use the index at `paths`. A missing index is silently skipped;
    /// a corrupt one disables full-text search and is logged.
    pub fn attach_index(&mut self, paths: &IndexPaths) -> bool {
        match FullTextIndex::open(paths) {
            Ok(Some(index)) => {
                self.fulltext = Some(index);
                true
            }
            Ok(None) => {
                tracing::debug!(index = %paths.root.display(), "no full-text index; using title search");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, index = %paths.root.display(), "full-text search disabled");
                false
            }
        }
    }

    pub fn has_fulltext(&self) -> bool {
        self.fulltext.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn search_session(&self) -> Option<&SearchSession> {
        self.search.as_ref()
    }

    pub fn view(&self) -> Option<&ArticleView> {
        self.view.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run a query and make its results the active search session. Uses the
    /// full-text index when one is attached and finds anything, title search
    /// otherwise.
    pub fn search(&mut self, query: &str, limit: usize) -> Result<&SearchSession> {
        self.ensure_open()?;
        if limit == 0 {
            return Err(EngineError::constraint("search limit must be positive"));
        }
        let session = self.run_search(query, limit)?;
        self.sync_history_page();
        self.view = None;
        self.state = SessionState::ShowingResults;
        Ok(self.search.insert(session))
    }

    fn run_search(&mut self, query: &str, limit: usize) -> Result<SearchSession> {
        match self.fulltext_index().and_then(|index| index.search(query, limit)) {
            Ok(found) if found.total > 0 => {
                return Ok(SearchSession {
                    query: query.to_string(),
                    source: SearchSource::FullText,
                    results: found.results,
                    total_matches: found.total,
                });
            }
            Ok(_) => tracing::debug!(query, "no full-text hits; trying titles"),
            Err(EngineError::IndexUnavailable) => {}
            Err(err) => {
                tracing::warn!(error = %err, "full-text search failed; disabling it");
                self.fulltext = None;
            }
        }
        let found = self.title_index()?.search(query, limit)?;
        Ok(SearchSession {
            query: query.to_string(),
            source: SearchSource::Title,
            results: found.results,
            total_matches: found.total,
        })
    }

    fn fulltext_index(&self) -> Result<&FullTextIndex> {
        self.fulltext.as_ref().ok_or(EngineError::IndexUnavailable)
    }

    fn title_index(&mut self) -> Result<&TitleIndex> {
        let index = match self.titles.take() {
            Some(index) => index,
            None => TitleIndex::build(&self.archive)?,
        };
        Ok(self.titles.insert(index))
    }

    /// Install a result list produced elsewhere, e.g. by an earlier process.
    pub fn adopt_session(&mut self, session: SearchSession) -> Result<()> {
        self.ensure_open()?;
        self.sync_history_page();
        self.search = Some(session);
        self.view = None;
        self.state = SessionState::ShowingResults;
        Ok(())
    }

    /// Drop the result list and any open article; history is kept.
    pub fn clear_search(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.sync_history_page();
        self.search = None;
        self.view = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Open result `n` (1-based) of the active search session.
    pub fn open_result(&mut self, n: usize) -> Result<&ArticleView> {
        self.ensure_open()?;
        let session = self
            .search
            .as_ref()
            .ok_or_else(|| EngineError::constraint("no active search; run a query first"))?;
        let article = match session.get(n) {
            Some(result) => result.article.clone(),
            None if session.is_empty() => {
                return Err(EngineError::constraint(format!("no results for {:?}", session.query)))
            }
            None => {
                return Err(EngineError::constraint(format!(
                    "result number must be between 1 and {}",
                    session.len()
                )))
            }
        };
        self.open_article(article)
    }

    /// Open an article by exact title.
    pub fn read_direct(&mut self, title: &str) -> Result<&ArticleView> {
        self.ensure_open()?;
        let article = self
            .archive
            .resolve_title(title)?
            .ok_or_else(|| EngineError::NotFound(title.to_string()))?;
        self.open_article(article)
    }

    /// Search and open the best hit in one step.
    pub fn quick(&mut self, query: &str) -> Result<&ArticleView> {
        let first = self.search(query, 1)?.get(1).map(|r| r.article.clone());
        match first {
            Some(article) => self.open_article(article),
            None => Err(EngineError::NotFound(query.to_string())),
        }
    }

    fn open_article(&mut self, article: ArticleRef) -> Result<&ArticleView> {
        let view = self.load_view(article.clone(), 0)?;
        self.sync_history_page();
        self.history.visit(article, 0);
        self.state = SessionState::ReadingArticle;
        Ok(self.view.insert(view))
    }

    fn load_view(&self, article: ArticleRef, page: usize) -> Result<ArticleView> {
        let body = self.archive.read_body(&article)?;
        let text = wrap_text(&clean(&String::from_utf8_lossy(&body)), self.config.wrap_width)?;
        let mut view = ArticleView::new(article, &text, self.config.page_size)?;
        view.goto_page(page);
        tracing::debug!(title = %view.article.title, pages = view.page_count(), "article opened");
        Ok(view)
    }

    fn sync_history_page(&mut self) {
        if let Some(view) = &self.view {
            self.history.update_current_page(view.current_page_index());
        }
    }

    fn view_mut(&mut self) -> Result<&mut ArticleView> {
        self.ensure_open()?;
        self.view.as_mut().ok_or_else(|| EngineError::constraint("no article is open"))
    }

    /// Advance a page; stays put on the last page.
    pub fn next_page(&mut self) -> Result<&ArticleView> {
        let view = self.view_mut()?;
        view.next_page();
        let page = view.current_page_index();
        self.history.update_current_page(page);
        self.current_view()
    }

    pub fn prev_page(&mut self) -> Result<&ArticleView> {
        let view = self.view_mut()?;
        view.prev_page();
        let page = view.current_page_index();
        self.history.update_current_page(page);
        self.current_view()
    }

    fn current_view(&self) -> Result<&ArticleView> {
        self.view.as_ref().ok_or_else(|| EngineError::constraint("no article is open"))
    }

    pub fn back(&mut self) -> Result<&ArticleView> {
        self.ensure_open()?;
        let target = self.history.peek_back().cloned().ok_or(EngineError::NoHistory)?;
        let view = self.load_view(target.article, target.saved_page)?;
        self.sync_history_page();
        self.history.back();
        self.state = SessionState::ReadingArticle;
        Ok(self.view.insert(view))
    }

    pub fn forward(&mut self) -> Result<&ArticleView> {
        self.ensure_open()?;
        let target = self.history.peek_forward().cloned().ok_or(EngineError::NoHistory)?;
        let view = self.load_view(target.article, target.saved_page)?;
        self.sync_history_page();
        self.history.forward();
        self.state = SessionState::ReadingArticle;
        Ok(self.view.insert(view))
    }

    /// Change the page size, re-splitting the open article if any.
    pub fn resize(&mut self, page_size: usize) -> Result<()> {
        self.ensure_open()?;
        if page_size == 0 {
            return Err(EngineError::constraint("page size must be positive"));
        }
        self.config.page_size = page_size;
        if let Some(view) = self.view.as_mut() {
            view.repaginate(page_size)?;
            let page = view.current_page_index();
            self.history.update_current_page(page);
        }
        Ok(())
    }

    /// End the session and release everything it holds.
    pub fn quit(&mut self) {
        self.search = None;
        self.view = None;
        self.history.clear();
        self.titles = None;
        self.fulltext = None;
        self.state = SessionState::Closed;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(EngineError::constraint("session is closed"));
        }
        Ok(())
    }
}
