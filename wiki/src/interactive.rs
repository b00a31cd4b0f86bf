//! Line-oriented reader loop: type a query, pick a number, page through.

use crate::render::{print_page, print_results};
use anyhow::Result;
use engine::{Archive, SessionController, SessionState};
use std::io::{BufRead, Write};

const GREETING: &str = "Type a query and press Enter. q to quit.";

pub fn run<A, R, W>(session: &mut SessionController<A>, limit: usize, input: R, out: &mut W) -> Result<()>
where
    A: Archive,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{GREETING}")?;
    let mut lines = input.lines();
    loop {
        let prompt = match session.state() {
            SessionState::ReadingArticle => "> ",
            SessionState::ShowingResults if session.search_session().is_some_and(|s| !s.is_empty()) => {
                "Open # / new query / q > "
            }
            _ => "Query> ",
        };
        write!(out, "{prompt}")?;
        out.flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let command = line.trim();
        if command.eq_ignore_ascii_case("q") {
            break;
        }
        let step = if session.state() == SessionState::ReadingArticle {
            reading(session, command, out)
        } else {
            browsing(session, command, limit, out)
        };
        match step {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => writeln!(out, "{err}")?,
            Err(err) => {
                session.quit();
                return Err(err.into());
            }
        }
    }
    session.quit();
    Ok(())
}

fn browsing<A: Archive, W: Write>(
    session: &mut SessionController<A>,
    command: &str,
    limit: usize,
    out: &mut W,
) -> engine::Result<()> {
    if command.is_empty() {
        if session.search_session().is_some() {
            session.clear_search()?;
            writeln!(out, "{GREETING}")?;
        } else {
            writeln!(out, "Empty query; try again or q to quit.")?;
        }
        return Ok(());
    }
    let has_results = session.search_session().is_some_and(|s| !s.is_empty());
    if has_results {
        if let Ok(n) = command.parse::<usize>() {
            session.open_result(n)?;
            return print_current(session, out);
        }
    }
    let found = session.search(command, limit)?;
    print_results(out, found)?;
    Ok(())
}

fn reading<A: Archive, W: Write>(session: &mut SessionController<A>, command: &str, out: &mut W) -> engine::Result<()> {
    match command.to_ascii_lowercase().as_str() {
        "n" | "next" => {
            session.next_page()?;
        }
        "p" | "prev" => {
            session.prev_page()?;
        }
        "f" | "forward" | ">" => {
            session.forward()?;
        }
        "b" | "back" | "<" if !session.history().can_go_back() => return show_results(session, out),
        "b" | "back" | "<" => {
            session.back()?;
        }
        "" => return show_results(session, out),
        other => {
            writeln!(out, "Unknown command {other:?}")?;
            return Ok(());
        }
    }
    print_current(session, out)
}

fn print_current<A: Archive, W: Write>(session: &SessionController<A>, out: &mut W) -> engine::Result<()> {
    if let Some(view) = session.view() {
        print_page(out, view, session.history())?;
    }
    Ok(())
}

/// Leave the article and list the last results again.
fn show_results<A: Archive, W: Write>(session: &mut SessionController<A>, out: &mut W) -> engine::Result<()> {
    match session.search_session().cloned() {
        Some(search) => {
            session.adopt_session(search)?;
            if let Some(search) = session.search_session() {
                print_results(out, search)?;
            }
        }
        None => {
            session.clear_search()?;
            writeln!(out, "{GREETING}")?;
        }
    }
    Ok(())
}
