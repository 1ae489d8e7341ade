use crate::image::ImageFormat;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strike: bool,
    pub superscript: bool,
    pub subscript: bool,
    pub highlight: bool,
}

impl RunStyle {
    pub fn is_plain(&self) -> bool {
        *self == RunStyle::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRole {
    Text,
    Link,
    /// The ` (href)` suffix following link text.
    LinkTarget,
    /// Bullet, counter or checkbox in front of a list item.
    Label,
    Caption,
    Placeholder,
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
    pub role: RunRole,
}

impl Run {
    pub fn new(text: impl Into<String>, style: RunStyle, role: RunRole) -> Self {
        Self {
            text: text.into(),
            style,
            role,
        }
    }

    pub fn line_break() -> Self {
        Self::new("", RunStyle::default(), RunRole::Break)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Body,
    Heading(u8),
    Quote,
    CodeBlock,
    ListItem { depth: u32, ordered: bool },
    Caption,
}

impl ParagraphStyle {
    pub fn style_id(&self) -> Option<String> {
        match self {
            ParagraphStyle::Body => None,
            ParagraphStyle::Heading(level) => Some(format!("Heading{level}")),
            ParagraphStyle::Quote => Some("Quote".to_string()),
            ParagraphStyle::CodeBlock => Some("CodeBlock".to_string()),
            ParagraphStyle::ListItem { .. } => Some("ListParagraph".to_string()),
            ParagraphStyle::Caption => Some("Caption".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub style: ParagraphStyle,
    pub alignment: Alignment,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(style: ParagraphStyle) -> Self {
        Self {
            style,
            alignment: Alignment::Left,
            runs: Vec::new(),
        }
    }

    pub fn centered(style: ParagraphStyle) -> Self {
        Self {
            alignment: Alignment::Center,
            ..Self::new(style)
        }
    }

    /// Labels alone do not count: a list item with only a bullet is still empty.
    pub fn has_content(&self) -> bool {
        self.runs.iter().any(|r| match r.role {
            RunRole::Break => true,
            RunRole::Label => false,
            _ => !r.text.trim().is_empty(),
        })
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for r in &self.runs {
            if r.role == RunRole::Break {
                out.push('\n');
            } else {
                out.push_str(&r.text);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub runs: Vec<Run>,
    pub header: bool,
}

impl TableCell {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    pub fn has_header_row(&self) -> bool {
        self.rows
            .first()
            .is_some_and(|r| r.cells.iter().any(|c| c.header))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub src: String,
    pub caption: Option<String>,
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Image(Image),
    Rule,
    PageBreak,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image(i) => Some(i),
            _ => None,
        })
    }
}
