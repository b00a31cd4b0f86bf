use crate::archive::ArticleRef;
use crate::{EngineError, Result};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_WRAP_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub lines: Vec<String>,
}

/// Split `text` into pages of `page_size` lines. Empty text yields one empty
/// page so a view always has something to show.
pub fn paginate(text: &str, page_size: usize) -> Result<Vec<Page>> {
    if page_size == 0 {
        return Err(EngineError::constraint("page size must be positive"));
    }
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    Ok(paginate_lines(lines, page_size))
}

fn paginate_lines(lines: Vec<String>, page_size: usize) -> Vec<Page> {
    if lines.is_empty() {
        return vec![Page { index: 0, lines: Vec::new() }];
    }
    lines
        .chunks(page_size)
        .enumerate()
        .map(|(index, chunk)| Page { index, lines: chunk.to_vec() })
        .collect()
}

/// Word-wrap every paragraph to `width` columns. Blank lines survive as-is,
/// continuation lines keep the paragraph's leading indent, and words longer
/// than a line are hard-split.
pub fn wrap_text(text: &str, width: usize) -> Result<String> {
    if width == 0 {
        return Err(EngineError::constraint("wrap width must be positive"));
    }
    let mut out: Vec<String> = Vec::new();
    for paragraph in text.lines() {
        let indent: String = paragraph.chars().take_while(|c| *c == ' ').collect();
        let mut line = String::new();
        let mut line_len = 0usize;
        let mut emitted = false;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            loop {
                let lead = if line_len == 0 { indent.chars().count().min(width - 1) } else { 1 };
                if line_len + lead + word.len() <= width {
                    if line_len == 0 {
                        line.extend(indent.chars().take(lead));
                    } else {
                        line.push(' ');
                    }
                    line.extend(word.iter());
                    line_len += lead + word.len();
                    break;
                }
                if line_len > 0 {
                    out.push(std::mem::take(&mut line));
                    line_len = 0;
                    emitted = true;
                    continue;
                }
                let room = width - lead;
                let rest = word.split_off(room);
                line.extend(indent.chars().take(lead));
                line.extend(word.iter());
                out.push(std::mem::take(&mut line));
                emitted = true;
                word = rest;
            }
        }
        if line_len > 0 || !emitted {
            out.push(line);
        }
    }
    Ok(out.join("\n"))
}

/// An open article split into pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleView {
    pub article: ArticleRef,
    pages: Vec<Page>,
    page_size: usize,
    current_page: usize,
}

impl ArticleView {
    pub fn new(article: ArticleRef, text: &str, page_size: usize) -> Result<Self> {
        let pages = paginate(text, page_size)?;
        Ok(Self { article, pages, page_size, current_page: 0 })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page
    }

    pub fn current_page(&self) -> &Page {
        &self.pages[self.current_page]
    }

    /// Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        if self.current_page + 1 < self.pages.len() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to `index`, clamped to the last page.
    pub fn goto_page(&mut self, index: usize) {
        self.current_page = index.min(self.pages.len() - 1);
    }

    /// Re-split with a new page size, staying on the page that holds the
    /// first line of the page previously shown.
    pub fn repaginate(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(EngineError::constraint("page size must be positive"));
        }
        let first_line = self.current_page * self.page_size;
        let lines: Vec<String> = std::mem::take(&mut self.pages)
            .into_iter()
            .flat_map(|p| p.lines)
            .collect();
        self.pages = paginate_lines(lines, page_size);
        self.page_size = page_size;
        self.goto_page(first_line / page_size);
        Ok(())
    }
}
