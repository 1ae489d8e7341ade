use lazy_static::lazy_static;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::{Captures, Regex};
use std::ops::Range;

use crate::markdown::markdown_options;

pub const PAGE_BREAK_HTML: &str = "<div class=\"pagebreak\"></div>";

lazy_static! {
    static ref STRIKE_RE: Regex = Regex::new(r"~~([^~]+)~~").unwrap();
    static ref MARK_RE: Regex = Regex::new(r"==([^=]+)==").unwrap();
    static ref SUP_RE: Regex = Regex::new(r"\^([^\^\s\[\]]+)\^").unwrap();
    static ref SUB_RE: Regex = Regex::new(r"~([^~\s]+)~").unwrap();
    static ref PAGE_BREAK_RE: Regex =
        Regex::new(r"(?i)<!--\s*pagebreak\s*-->|\\pagebreak|<pagebreak\s*/>").unwrap();
}

/// Rewrites the extended inline syntax into HTML that the Markdown stage
/// passes through untouched. Code blocks and code spans are left alone.
pub fn preprocess(md: &str) -> String {
    let mut out = String::with_capacity(md.len() + md.len() / 8);
    let mut pos = 0;
    for code in code_ranges(md) {
        if code.start < pos {
            continue;
        }
        rewrite_lines(&md[pos..code.start], &mut out);
        out.push_str(&md[code.clone()]);
        pos = code.end;
    }
    rewrite_lines(&md[pos..], &mut out);
    out
}

/// Byte ranges of fenced and indented code blocks and of inline code spans,
/// as the Markdown parser itself sees them.
fn code_ranges(md: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut depth = 0usize;
    for (event, range) in Parser::new_ext(md, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                if depth == 0 {
                    ranges.push(range);
                }
                depth += 1;
            }
            Event::End(TagEnd::CodeBlock) => depth = depth.saturating_sub(1),
            Event::Code(_) if depth == 0 => ranges.push(range),
            _ => {}
        }
    }
    ranges
}

// Line by line so a pattern never spans a setext underline or a block edge.
fn rewrite_lines(text: &str, out: &mut String) {
    for line in text.split_inclusive('\n') {
        out.push_str(&rewrite_inline(line));
    }
}

fn rewrite_inline(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = PAGE_BREAK_RE.replace_all(text, PAGE_BREAK_HTML);
    // Doubled tildes go first so `~~x~~` never reads as an empty subscript.
    let text = STRIKE_RE.replace_all(&text, "<del>$1</del>");
    let text = MARK_RE.replace_all(&text, "<mark>$1</mark>");
    let text = SUP_RE.replace_all(&text, "<sup>$1</sup>");
    let hay: &str = &text;
    let text = SUB_RE.replace_all(hay, |caps: &Captures| {
        let m = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let touches_tilde =
            hay[..m.0].ends_with('~') || hay[m.1..].starts_with('~');
        if touches_tilde {
            caps[0].to_string()
        } else {
            format!("<sub>{}</sub>", &caps[1])
        }
    });
    text.into_owned()
}
