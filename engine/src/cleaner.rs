//! Article markup -> readable plain text.
//!
//! Navigational furniture (navboxes, sidebars, tables of contents, infoboxes,
//! maintenance banners, reference lists) is dropped as whole subtrees, lists
//! that precede the first paragraph are treated as navigation preambles, and
//! what remains becomes one line per paragraph, heading or list item.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{node::Element, ElementRef, Html, Node, Selector};

/// Class/id substrings that mark a subtree as navigation or metadata.
pub const DENY_TOKENS: &[&str] = &[
    "sidebar",
    "navbox",
    "toc",
    "infobox",
    "metadata",
    "ambox",
    "hatnote",
    "mw-collapsible",
    "reference",
    "reflist",
    "catlinks",
    "mw-editsection",
    "navigation-not-searchable",
];

/// Tags whose whole subtree never contains article prose.
pub const DENY_TAGS: &[&str] = &[
    "script", "style", "nav", "aside", "noscript", "head", "footer", "template", "form", "button",
];

/// ARIA roles of navigational landmarks.
pub const DENY_ROLES: &[&str] = &["navigation", "complementary", "banner", "contentinfo", "note", "search"];

/// Characters treated as list bullets by the leading-line cleanup.
pub const BULLET_MARKERS: &[char] = &['•', '*', '-', '·', '◦', '▪', '–'];

const UNORDERED_MARKER: &str = "• ";

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<[A-Za-z!/]").expect("valid regex");
    static ref BODY_SEL: Selector = Selector::parse("body").expect("valid selector");
}

/// Convert raw article markup into normalized plain text. Never fails:
/// markup the structured pass cannot make sense of degrades to its raw text.
pub fn clean(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    if !TAG_RE.is_match(raw) {
        let mut lines = plain_lines(raw);
        strip_leading_bullets(&mut lines);
        return finish(lines);
    }

    let doc = Html::parse_document(raw);
    let root = doc.select(&BODY_SEL).next().unwrap_or_else(|| doc.root_element());

    let mut out = TextBuilder::default();
    let mut ctx = Walk::default();
    walk(root, &mut out, &mut ctx);
    let mut lines = out.finish();

    if lines.is_empty() && !ctx.removed_any {
        tracing::debug!("structured extraction empty, using raw text");
        lines = plain_lines(&root.text().collect::<Vec<_>>().join(" "));
    }
    strip_leading_bullets(&mut lines);
    finish(lines)
}

#[derive(Debug, Default)]
struct Walk {
    seen_paragraph: bool,
    removed_any: bool,
    lists: Vec<ListState>,
}

#[derive(Debug)]
struct ListState {
    ordered: bool,
    next: u32,
}

fn walk(el: ElementRef<'_>, out: &mut TextBuilder, ctx: &mut Walk) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    visit(child_el, out, ctx);
                }
            }
            _ => {}
        }
    }
}

fn visit(el: ElementRef<'_>, out: &mut TextBuilder, ctx: &mut Walk) {
    let element = el.value();
    if is_noise(element) {
        ctx.removed_any = true;
        return;
    }
    match element.name() {
        "br" => out.break_line(),
        "p" => {
            let has_text = el.text().any(|t| !t.trim().is_empty());
            block_break(out, ctx);
            walk(el, out, ctx);
            block_break(out, ctx);
            ctx.seen_paragraph |= has_text;
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "table" | "blockquote" => {
            block_break(out, ctx);
            walk(el, out, ctx);
            block_break(out, ctx);
        }
        "ul" | "ol" | "dl" if !ctx.seen_paragraph => {
            ctx.removed_any = true;
        }
        "ul" | "ol" => {
            let ordered = element.name() == "ol";
            let start = element.attr("start").and_then(|s| s.trim().parse().ok()).unwrap_or(1);
            out.break_line();
            ctx.lists.push(ListState { ordered, next: start });
            walk(el, out, ctx);
            ctx.lists.pop();
            if ctx.lists.is_empty() {
                out.break_block();
            } else {
                out.break_line();
            }
        }
        "li" => {
            out.break_line();
            let depth = ctx.lists.len().max(1);
            let marker = match ctx.lists.last_mut() {
                Some(list) if list.ordered => {
                    let m = format!("{}. ", list.next);
                    list.next += 1;
                    m
                }
                _ => UNORDERED_MARKER.to_string(),
            };
            out.set_marker(format!("{}{}", "  ".repeat(depth - 1), marker));
            walk(el, out, ctx);
            out.break_line();
            out.clear_marker();
        }
        "pre" => {
            out.break_block();
            let text: String = el.text().collect();
            for line in text.lines() {
                out.push_raw_line(line.trim_end());
            }
            out.break_block();
        }
        "tr" => {
            out.break_line();
            let mut cells = Vec::new();
            for cell in el.children().filter_map(ElementRef::wrap) {
                if is_noise(cell.value()) {
                    continue;
                }
                let mut sub = TextBuilder::default();
                walk(cell, &mut sub, ctx);
                let text = sub.finish().join(" ");
                if !text.trim().is_empty() {
                    cells.push(text.trim().to_string());
                }
            }
            if !cells.is_empty() {
                out.push_raw_line(&cells.join(" | "));
            }
        }
        "dt" | "dd" | "div" | "section" | "article" | "main" | "header" | "figure" | "figcaption"
        | "caption" => {
            out.break_line();
            walk(el, out, ctx);
            out.break_line();
        }
        _ => walk(el, out, ctx),
    }
}

/// Paragraph-level boundary; inside a list item it only ends the line so
/// items stay contiguous.
fn block_break(out: &mut TextBuilder, ctx: &Walk) {
    if ctx.lists.is_empty() {
        out.break_block();
    } else {
        out.break_line();
    }
}

fn is_noise(element: &Element) -> bool {
    if DENY_TAGS.contains(&element.name()) {
        return true;
    }
    if let Some(role) = element.attr("role") {
        let role = role.trim().to_ascii_lowercase();
        if DENY_ROLES.contains(&role.as_str()) {
            return true;
        }
    }
    ["class", "id"].iter().filter_map(|attr| element.attr(attr)).any(|value| {
        let value = value.to_ascii_lowercase();
        DENY_TOKENS.iter().any(|token| value.contains(token))
    })
}

/// Accumulates inline text into lines, collapsing whitespace.
#[derive(Debug, Default)]
struct TextBuilder {
    lines: Vec<String>,
    current: String,
    pending_space: bool,
    marker: Option<String>,
}

impl TextBuilder {
    fn push_text(&mut self, text: &str) {
        if text.starts_with(char::is_whitespace) {
            self.pending_space = true;
        }
        for word in text.split_whitespace() {
            if self.current.is_empty() {
                if let Some(marker) = self.marker.take() {
                    self.current.push_str(&marker);
                }
            } else if self.pending_space {
                self.current.push(' ');
            }
            self.current.push_str(word);
            self.pending_space = true;
        }
        if !text.ends_with(char::is_whitespace) && !text.trim().is_empty() {
            self.pending_space = false;
        }
    }

    fn set_marker(&mut self, marker: String) {
        self.marker = Some(marker);
    }

    fn clear_marker(&mut self) {
        self.marker = None;
    }

    fn push_raw_line(&mut self, line: &str) {
        self.break_line();
        let marker = self.marker.take().unwrap_or_default();
        self.lines.push(format!("{marker}{line}"));
    }

    /// Flush the current line. A pending list marker survives empty breaks
    /// and is consumed by the first text that follows.
    fn break_line(&mut self) {
        let line = self.current.trim_end();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
        self.current.clear();
        self.pending_space = false;
    }

    fn break_block(&mut self) {
        self.break_line();
        if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.break_line();
        self.lines
    }
}

fn plain_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}

/// Removes bullet markers from the leading run of bullet-led lines.
fn strip_leading_bullets(lines: &mut Vec<String>) {
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        let trimmed = lines[i].trim_start();
        if !trimmed.starts_with(BULLET_MARKERS) {
            break;
        }
        let stripped = trimmed.trim_start_matches(|c: char| BULLET_MARKERS.contains(&c) || c.is_whitespace());
        if stripped.is_empty() {
            lines.remove(i);
        } else {
            lines[i] = stripped.to_string();
            i += 1;
        }
    }
}

/// Trim blank lines at both ends and collapse blank runs to one.
fn finish(lines: Vec<String>) -> String {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(if blank { String::new() } else { line });
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
