use crate::archive::ArticleRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub article: ArticleRef,
    pub saved_page: usize,
}

/// Browser-style history: a back list, the current entry and a forward list.
/// Neither list ever holds the current entry.
#[derive(Debug, Default, Clone)]
pub struct History {
    back: Vec<HistoryEntry>,
    current: Option<HistoryEntry>,
    forward: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh navigation. Clears the forward list.
    pub fn visit(&mut self, article: ArticleRef, page: usize) {
        if let Some(prev) = self.current.take() {
            self.back.push(prev);
        }
        self.current = Some(HistoryEntry { article, saved_page: page });
        self.forward.clear();
    }

    /// Step back; `None` (and no change) when there is nothing behind.
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        let entry = self.back.pop()?;
        if let Some(prev) = self.current.replace(entry) {
            self.forward.push(prev);
        }
        self.current.as_ref()
    }

    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        let entry = self.forward.pop()?;
        if let Some(prev) = self.current.replace(entry) {
            self.back.push(prev);
        }
        self.current.as_ref()
    }

    /// The entry `back` would move to, without moving.
    pub fn peek_back(&self) -> Option<&HistoryEntry> {
        self.back.last()
    }

    pub fn peek_forward(&self) -> Option<&HistoryEntry> {
        self.forward.last()
    }

    pub fn update_current_page(&mut self, page: usize) {
        if let Some(current) = self.current.as_mut() {
            current.saved_page = page;
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.current.as_ref()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Entries reachable from here, the current one included.
    pub fn len(&self) -> usize {
        self.back.len() + self.forward.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.back.clear();
        self.current = None;
        self.forward.clear();
    }
}
