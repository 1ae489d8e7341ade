use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::{debug, info, trace, warn};

use crate::image::ImageLoader;
use crate::model::{
    Block, Document, Paragraph, ParagraphStyle, Run, RunRole, RunStyle, Table, TableCell, TableRow,
};

const BULLET: &str = "\u{2022} ";
const CHECKED: &str = "\u{2611} ";
const UNCHECKED: &str = "\u{2610} ";

/// The closed set of elements the Markdown stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Heading(u8),
    P,
    Bold,
    Italic,
    Code,
    Strike,
    Sup,
    Sub,
    Mark,
    Blockquote,
    Ul,
    Ol,
    Li,
    Table,
    Tr,
    Cell { header: bool },
    Img,
    A,
    Br,
    Hr,
    Div,
    Pre,
    Input,
    Unknown,
}

impl Tag {
    pub fn from_name(name: &str) -> Tag {
        match name {
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            "p" => Tag::P,
            "strong" | "b" => Tag::Bold,
            "em" | "i" => Tag::Italic,
            "code" => Tag::Code,
            "del" | "s" | "strike" => Tag::Strike,
            "sup" => Tag::Sup,
            "sub" => Tag::Sub,
            "mark" => Tag::Mark,
            "blockquote" => Tag::Blockquote,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "tr" => Tag::Tr,
            "td" => Tag::Cell { header: false },
            "th" => Tag::Cell { header: true },
            "img" => Tag::Img,
            "a" => Tag::A,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            "div" => Tag::Div,
            "pre" => Tag::Pre,
            "input" => Tag::Input,
            _ => Tag::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ListFrame {
    ordered: bool,
    counter: u32,
    /// Set once an item in this list carries a checkbox.
    task: bool,
}

#[derive(Debug, Default)]
struct TableBuffer {
    rows: Vec<Vec<TableCell>>,
    cell: Option<TableCell>,
}

impl TableBuffer {
    fn finish_cell(&mut self) {
        let Some(mut cell) = self.cell.take() else {
            return;
        };
        trim_runs(&mut cell.runs);
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        if let Some(row) = self.rows.last_mut() {
            row.push(cell);
        }
    }
}

#[derive(Debug)]
struct PendingLink {
    href: Option<String>,
    text: String,
}

/// Per-conversion state for turning HTML events into a [`Document`].
pub struct Translator<'a> {
    images: &'a ImageLoader,
    doc: Document,
    current: Option<Paragraph>,
    style: RunStyle,
    lists: Vec<ListFrame>,
    open_items: u32,
    table: Option<TableBuffer>,
    in_blockquote: bool,
    in_pre: bool,
    link: Option<PendingLink>,
}

impl<'a> Translator<'a> {
    pub fn new(images: &'a ImageLoader) -> Self {
        Self {
            images,
            doc: Document::default(),
            current: None,
            style: RunStyle::default(),
            lists: Vec::new(),
            open_items: 0,
            table: None,
            in_blockquote: false,
            in_pre: false,
            link: None,
        }
    }

    pub fn start(&mut self, tag: Tag, attrs: &[(String, String)]) {
        trace!("start {tag:?}");
        match tag {
            Tag::Heading(level) => self.open(ParagraphStyle::Heading(level)),
            Tag::P => self.start_p(),
            Tag::Bold => self.style.bold = true,
            Tag::Italic => self.style.italic = true,
            Tag::Code => {
                if !self.in_pre {
                    self.style.code = true;
                }
            }
            Tag::Strike => self.style.strike = true,
            Tag::Sup => self.style.superscript = true,
            Tag::Sub => self.style.subscript = true,
            Tag::Mark => self.style.highlight = true,
            Tag::Blockquote => {
                self.in_blockquote = true;
                self.open(ParagraphStyle::Quote);
            }
            Tag::Ul | Tag::Ol => {
                self.close();
                let start = attr_get(attrs, "start")
                    .and_then(|s| s.trim().parse::<u32>().ok())
                    .unwrap_or(1);
                self.lists.push(ListFrame {
                    ordered: tag == Tag::Ol,
                    counter: start.saturating_sub(1),
                    task: false,
                });
            }
            Tag::Li => self.start_item(),
            Tag::Input => self.checkbox(attrs),
            Tag::Table => {
                self.close();
                if self.table.is_none() {
                    self.table = Some(TableBuffer::default());
                }
            }
            Tag::Tr => {
                if let Some(t) = self.table.as_mut() {
                    t.finish_cell();
                    t.rows.push(Vec::new());
                }
            }
            Tag::Cell { header } => {
                if let Some(t) = self.table.as_mut() {
                    t.finish_cell();
                    t.cell = Some(TableCell {
                        runs: Vec::new(),
                        header,
                    });
                }
            }
            Tag::Img => self.image(attrs),
            Tag::A => {
                let href = attr_get(attrs, "href").and_then(|h| sanitize_href(&h));
                self.link = Some(PendingLink {
                    href,
                    text: String::new(),
                });
            }
            Tag::Br => {
                if self.current.is_some() || self.in_cell() {
                    self.push_run(Run::line_break());
                }
            }
            Tag::Hr => {
                self.close();
                self.doc.blocks.push(Block::Rule);
            }
            Tag::Div => {
                let class = attr_get(attrs, "class").unwrap_or_default();
                if class.split_whitespace().any(|c| c == "pagebreak") {
                    self.close();
                    self.doc.blocks.push(Block::PageBreak);
                }
            }
            Tag::Pre => {
                self.open(ParagraphStyle::CodeBlock);
                self.in_pre = true;
            }
            Tag::Unknown => {}
        }
    }

    pub fn end(&mut self, tag: Tag) {
        trace!("end {tag:?}");
        match tag {
            Tag::Heading(_) => self.close(),
            Tag::P => {
                if !self.in_cell() {
                    self.close();
                }
            }
            Tag::Bold => self.style.bold = false,
            Tag::Italic => self.style.italic = false,
            Tag::Code => self.style.code = false,
            Tag::Strike => self.style.strike = false,
            Tag::Sup => self.style.superscript = false,
            Tag::Sub => self.style.subscript = false,
            Tag::Mark => self.style.highlight = false,
            Tag::Blockquote => {
                self.close();
                self.in_blockquote = false;
            }
            Tag::Ul | Tag::Ol => {
                self.close();
                self.lists.pop();
            }
            Tag::Li => {
                self.close();
                self.open_items = self.open_items.saturating_sub(1);
            }
            Tag::Table => self.finish_table(),
            Tag::Tr | Tag::Cell { .. } => {
                if let Some(t) = self.table.as_mut() {
                    t.finish_cell();
                }
            }
            Tag::A => self.finish_link(),
            Tag::Pre => {
                self.close();
                self.in_pre = false;
            }
            Tag::Img | Tag::Br | Tag::Hr | Tag::Div | Tag::Input | Tag::Unknown => {}
        }
    }

    pub fn text(&mut self, data: &str) {
        if self.table.is_some() {
            self.cell_text(data);
            return;
        }
        if self.in_pre {
            self.code_text(data);
            return;
        }

        let collapsed = collapse_ws(&data.replace(['\r', '\n'], " "));
        let at_start = self.current.as_ref().map_or(true, |p| {
            !p.has_content() || p.runs.last().is_some_and(|r| r.role == RunRole::Break)
        });
        let text = if at_start {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if text.is_empty() {
            return;
        }
        self.ensure_container();
        let run = self.styled_run(text);
        self.push_run(run);
    }

    pub fn finish(mut self) -> Document {
        self.close();
        self.finish_table();
        self.doc
    }

    fn ensure_container(&mut self) {
        if self.current.is_none() {
            let style = self.contextual_style();
            self.current = Some(Paragraph::new(style));
        }
    }

    fn contextual_style(&self) -> ParagraphStyle {
        if self.in_pre {
            ParagraphStyle::CodeBlock
        } else if self.open_items > 0 {
            self.list_item_style()
        } else if self.in_blockquote {
            ParagraphStyle::Quote
        } else {
            ParagraphStyle::Body
        }
    }

    fn list_item_style(&self) -> ParagraphStyle {
        let ordered = self.lists.last().is_some_and(|f| f.ordered);
        let depth = self.lists.len().max(1) as u32;
        ParagraphStyle::ListItem { depth, ordered }
    }

    fn in_cell(&self) -> bool {
        self.table.as_ref().is_some_and(|t| t.cell.is_some())
    }

    fn open(&mut self, style: ParagraphStyle) {
        self.close();
        self.current = Some(Paragraph::new(style));
    }

    fn close(&mut self) {
        let Some(mut p) = self.current.take() else {
            return;
        };
        if p.style == ParagraphStyle::CodeBlock {
            while p.runs.last().is_some_and(|r| r.role == RunRole::Break) {
                p.runs.pop();
            }
        } else {
            trim_runs(&mut p.runs);
        }
        if !p.has_content() {
            return;
        }
        if p.style == ParagraphStyle::Heading(1) && self.doc.title.is_none() {
            self.doc.title = Some(p.text().trim().to_string());
        }
        self.doc.blocks.push(Block::Paragraph(p));
    }

    fn start_p(&mut self) {
        if self.in_cell() {
            return;
        }
        if self.open_items > 0 {
            let reusable = self
                .current
                .as_ref()
                .is_some_and(|p| matches!(p.style, ParagraphStyle::ListItem { .. }) && !p.has_content());
            if !reusable {
                self.open(self.list_item_style());
            }
            return;
        }
        if self.in_blockquote {
            self.open(ParagraphStyle::Quote);
        } else {
            self.open(ParagraphStyle::Body);
        }
    }

    fn start_item(&mut self) {
        self.open_items += 1;
        let style = self.list_item_style();
        self.open(style);
        let label = match self.lists.last_mut() {
            Some(frame) if frame.ordered => {
                frame.counter += 1;
                format!("{}. ", frame.counter)
            }
            _ => BULLET.to_string(),
        };
        if let Some(p) = self.current.as_mut() {
            p.runs
                .push(Run::new(label, RunStyle::default(), RunRole::Label));
        }
    }

    fn checkbox(&mut self, attrs: &[(String, String)]) {
        let is_checkbox = attr_get(attrs, "type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox"));
        if !is_checkbox {
            return;
        }
        let glyph = if attr_get(attrs, "checked").is_some() {
            CHECKED
        } else {
            UNCHECKED
        };
        let mut ordered = false;
        let depth = self.lists.len();
        if let Some(frame) = self.lists.last_mut() {
            if !frame.task {
                debug!("list at depth {} holds task items", depth);
            }
            frame.task = true;
            ordered = frame.ordered;
        }
        self.ensure_container();
        let Some(p) = self.current.as_mut() else {
            return;
        };
        // Task items in a bulleted list show the box in place of the bullet.
        let replaces_bullet =
            !ordered && p.runs.last().is_some_and(|r| r.role == RunRole::Label);
        if replaces_bullet {
            if let Some(last) = p.runs.last_mut() {
                last.text = glyph.to_string();
            }
        } else {
            p.runs
                .push(Run::new(glyph, RunStyle::default(), RunRole::Label));
        }
    }

    fn styled_run(&mut self, text: &str) -> Run {
        match self.link.as_mut() {
            Some(link) => {
                link.text.push_str(text);
                Run::new(text, self.style, RunRole::Link)
            }
            None => Run::new(text, self.style, RunRole::Text),
        }
    }

    fn push_run(&mut self, run: Run) {
        if let Some(t) = self.table.as_mut() {
            if let Some(cell) = t.cell.as_mut() {
                merge_push(&mut cell.runs, run);
            }
            return;
        }
        self.ensure_container();
        if let Some(p) = self.current.as_mut() {
            merge_push(&mut p.runs, run);
        }
    }

    fn cell_text(&mut self, data: &str) {
        let Some(cell) = self.table.as_ref().and_then(|t| t.cell.as_ref()) else {
            return;
        };
        let at_start = cell.runs.iter().all(|r| r.text.trim().is_empty());
        let collapsed = collapse_ws(&data.replace(['\r', '\n'], " "));
        let text = if at_start {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if text.is_empty() {
            return;
        }
        let run = self.styled_run(text);
        self.push_run(run);
    }

    fn code_text(&mut self, data: &str) {
        self.ensure_container();
        let normalized = data.replace("\r\n", "\n").replace('\r', "\n");
        for (i, line) in normalized.split('\n').enumerate() {
            if i > 0 {
                self.push_run(Run::line_break());
            }
            if !line.is_empty() {
                self.push_run(Run::new(line, RunStyle::default(), RunRole::Text));
            }
        }
    }

    fn finish_link(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        let Some(href) = link.href else {
            return;
        };
        let text = link.text.trim();
        // In-document anchors such as footnote references have no useful target.
        if text.is_empty()
            || text == href
            || href.starts_with('#')
            || href.strip_prefix("mailto:") == Some(text)
        {
            return;
        }
        self.push_run(Run::new(
            format!(" ({href})"),
            RunStyle::default(),
            RunRole::LinkTarget,
        ));
    }

    fn image(&mut self, attrs: &[(String, String)]) {
        let Some(src) = attr_get(attrs, "src").filter(|s| !s.trim().is_empty()) else {
            warn!("image tag without src skipped");
            return;
        };
        let alt = attr_get(attrs, "alt")
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        if self.table.is_some() {
            let label = format!("[image: {}]", alt.as_deref().unwrap_or(&src));
            self.push_run(Run::new(label, RunStyle::default(), RunRole::Placeholder));
            return;
        }

        let width = attr_get(attrs, "width")
            .and_then(|w| w.trim().trim_end_matches("px").parse::<u32>().ok());
        let resume = self.current.as_ref().map(|p| p.style);
        self.close();

        info!("processing image: {src}");
        match self.images.load(&src, width, alt.clone()) {
            Ok(img) => {
                self.doc.blocks.push(Block::Image(img));
                if let Some(alt) = alt {
                    debug!("image caption: {alt}");
                    let mut caption = Paragraph::centered(ParagraphStyle::Caption);
                    let style = RunStyle {
                        italic: true,
                        ..RunStyle::default()
                    };
                    caption.runs.push(Run::new(alt, style, RunRole::Caption));
                    self.doc.blocks.push(Block::Paragraph(caption));
                }
            }
            Err(e) => {
                warn!("failed to load image '{src}': {e:#}");
                let mut placeholder = Paragraph::centered(ParagraphStyle::Body);
                let style = RunStyle {
                    italic: true,
                    ..RunStyle::default()
                };
                placeholder.runs.push(Run::new(
                    format!("[image could not be loaded: {src}]"),
                    style,
                    RunRole::Placeholder,
                ));
                self.doc.blocks.push(Block::Paragraph(placeholder));
            }
        }

        if let Some(style) = resume {
            self.current = Some(Paragraph::new(style));
        }
    }

    fn finish_table(&mut self) {
        let Some(mut buf) = self.table.take() else {
            return;
        };
        buf.finish_cell();
        let rows: Vec<TableRow> = buf
            .rows
            .into_iter()
            .map(|cells| TableRow { cells })
            .collect();
        let table = Table { rows };
        if table.rows.is_empty() || table.column_count() == 0 {
            warn!("table has no rows or columns; skipped");
            return;
        }
        info!(
            "creating table with {} rows and {} columns",
            table.rows.len(),
            table.column_count()
        );
        self.doc.blocks.push(Block::Table(table));
    }
}

fn merge_push(runs: &mut Vec<Run>, run: Run) {
    if let Some(last) = runs.last_mut() {
        let mergeable = matches!(run.role, RunRole::Text | RunRole::Link);
        if mergeable && last.role == run.role && last.style == run.style {
            last.text.push_str(&run.text);
            return;
        }
    }
    runs.push(run);
}

/// Drops whitespace at the outer edges of a run sequence.
fn trim_runs(runs: &mut Vec<Run>) {
    if let Some(first) = runs.iter_mut().find(|r| r.role != RunRole::Label) {
        if first.role != RunRole::Break {
            first.text = first.text.trim_start().to_string();
        }
    }
    while let Some(last) = runs.last_mut() {
        if matches!(last.role, RunRole::Break | RunRole::Label) {
            break;
        }
        last.text = last.text.trim_end().to_string();
        if !last.text.is_empty() {
            break;
        }
        runs.pop();
    }
}

fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
                in_ws = true;
            }
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

fn sanitize_href(href: &str) -> Option<String> {
    let h = href.trim();
    if h.is_empty() {
        return None;
    }
    let low = h.to_ascii_lowercase();
    if low.starts_with("javascript:") || low.starts_with("data:") || low.starts_with("vbscript:") {
        return None;
    }
    Some(h.to_string())
}

fn html5_parse(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

fn tag_lower(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

fn attrs_vec(node: &Handle) -> Vec<(String, String)> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn attr_get(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.to_string())
}

fn body_children(dom: &RcDom) -> Vec<Handle> {
    fn find_body(node: &Handle) -> Option<Handle> {
        if tag_lower(node).as_deref() == Some("body") {
            return Some(node.clone());
        }
        node.children.borrow().iter().find_map(find_body)
    }
    let Some(body) = find_body(&dom.document) else {
        return dom.document.children.borrow().clone();
    };
    let children = body.children.borrow().clone();
    children
}

fn walk(node: &Handle, t: &mut Translator<'_>) {
    match &node.data {
        NodeData::Text { contents } => t.text(&contents.borrow()),
        NodeData::Element { .. } => {
            let Some(name) = tag_lower(node) else { return };
            let tag = Tag::from_name(&name);
            let attrs = attrs_vec(node);
            t.start(tag, &attrs);
            for c in node.children.borrow().iter() {
                walk(c, t);
            }
            t.end(tag);
        }
        _ => {}
    }
}

/// Walks HTML from the Markdown stage and builds the document. Never fails:
/// unknown tags are skipped and broken images become placeholders.
pub fn translate(html: &str, images: &ImageLoader) -> Document {
    let wrapped = if html.to_ascii_lowercase().contains("<html") {
        html.to_string()
    } else {
        format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"></head><body>{}</body></html>",
            html
        )
    };
    let dom = html5_parse(&wrapped);
    let mut translator = Translator::new(images);
    for node in body_children(&dom) {
        walk(&node, &mut translator);
    }
    let doc = translator.finish();
    debug!("translated {} blocks", doc.blocks.len());
    doc
}
