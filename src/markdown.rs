use pulldown_cmark::{html, Event, Options, Parser};

use crate::preprocess::preprocess;

pub(crate) fn markdown_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts.insert(Options::ENABLE_SMART_PUNCTUATION);
    // Strikethrough is left to the preprocessor: the built-in extension also
    // consumes single tildes, which are subscript here.
    opts
}

/// Every newline inside a paragraph is kept as a line break.
pub fn markdown_to_html_string(md: &str) -> String {
    let parser = Parser::new_ext(md, markdown_options()).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Preprocesses the extended syntax, then renders HTML.
pub fn render(md: &str) -> String {
    markdown_to_html_string(&preprocess(md))
}
