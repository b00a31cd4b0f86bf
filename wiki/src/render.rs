use engine::{ArticleView, History, SearchSession, SearchSource};
use std::io::{self, Write};

const BANNER_WIDTH: usize = 80;
const TITLE_COLUMNS: usize = 70;

/// Numbered result list, titles cut to fit one line.
pub fn print_results<W: Write>(out: &mut W, session: &SearchSession) -> io::Result<()> {
    if session.is_empty() {
        return writeln!(out, "No results found for: {}", session.query);
    }
    let source = match session.source {
        SearchSource::FullText => "full text",
        SearchSource::Title => "titles",
    };
    if session.total_matches > session.len() {
        writeln!(
            out,
            "Showing {} of {} results for '{}' ({source}):\n",
            session.len(),
            session.total_matches,
            session.query
        )?;
    } else {
        writeln!(out, "Found {} result(s) for '{}' ({source}):\n", session.len(), session.query)?;
    }
    for result in &session.results {
        writeln!(out, "{:3}. {}", result.rank, truncate(&result.title, TITLE_COLUMNS))?;
    }
    Ok(())
}

/// The whole article between `=` banners.
pub fn print_article<W: Write>(out: &mut W, view: &ArticleView) -> io::Result<()> {
    let rule = "=".repeat(BANNER_WIDTH);
    writeln!(out, "{rule}")?;
    writeln!(out, "{}", view.article.title.to_uppercase())?;
    writeln!(out, "{rule}\n")?;
    for page in view.pages() {
        for line in &page.lines {
            writeln!(out, "{line}")?;
        }
    }
    writeln!(out, "\n{rule}")
}

/// The current page and a navigation footer. Back and forward are only
/// offered when history has somewhere to go.
pub fn print_page<W: Write>(out: &mut W, view: &ArticleView, history: &History) -> io::Result<()> {
    writeln!(out, "{}\n", view.article.title)?;
    for line in &view.current_page().lines {
        writeln!(out, "{line}")?;
    }
    writeln!(out, "\n{}", footer(view, history))
}

fn footer(view: &ArticleView, history: &History) -> String {
    let mut keys = String::from("[n]ext [p]rev");
    if history.can_go_back() {
        keys.push_str(" [b]ack");
    }
    if history.can_go_forward() {
        keys.push_str(" [f]orward");
    }
    format!(
        "Page {}/{}  {keys}, Enter for results, [q]uit",
        view.current_page_index() + 1,
        view.page_count()
    )
}

fn truncate(title: &str, columns: usize) -> String {
    if title.chars().count() <= columns {
        return title.to_string();
    }
    let cut: String = title.chars().take(columns - 3).collect();
    format!("{cut}...")
}
