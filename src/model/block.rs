//! Block-level AST nodes.

use super::{Inline, Table};
use serde::{Deserialize, Serialize};

/// A block-level node.
///
/// The variant set is closed; anything else in the input is rejected at
/// deserialization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Block {
    /// A heading at levels 1 through 9.
    Header(Header),

    /// A body paragraph of inline content.
    Paragraph(Vec<Inline>),

    /// A verbatim code block. Line breaks are preserved as written.
    CodeBlock(CodeBlock),

    /// A quoted group of blocks, indented per nesting level.
    BlockQuote(Vec<Block>),

    /// A thematic break.
    HorizontalRule,

    /// An unordered list.
    BulletList(BulletList),

    /// A numbered list.
    OrderedList(OrderedList),

    /// A table.
    Table(Table),

    /// A block-level image, rendered in its own paragraph.
    Image(Image),
}

impl Block {
    /// Create a paragraph from plain text.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(vec![Inline::text(text)])
    }

    /// Create a header from a level and plain text.
    pub fn header(level: u8, text: impl Into<String>) -> Self {
        Block::Header(Header {
            level,
            content: vec![Inline::text(text)],
        })
    }
}

/// A heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Heading level, 1 through 9.
    pub level: u8,

    /// Inline content of the heading.
    #[serde(default)]
    pub content: Vec<Inline>,
}

/// A verbatim code block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    /// The code text, possibly spanning multiple lines.
    pub text: String,

    /// Source language tag, cosmetic only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// An unordered list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletList {
    /// List items, each a sequence of blocks.
    #[serde(default)]
    pub items: Vec<Vec<Block>>,
}

/// A numbered list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedList {
    /// Starting number for the visible sequence.
    #[serde(default = "default_start")]
    pub start: u32,

    /// List items, each a sequence of blocks.
    #[serde(default)]
    pub items: Vec<Vec<Block>>,
}

fn default_start() -> u32 {
    1
}

/// An image reference with optional declared dimensions.
///
/// Dimensions are strings with an optional unit suffix (`px`, `in`, `cm`,
/// `mm`, `pt`, `%`); a bare number means pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Relative path to the image file.
    pub source: String,

    /// Alternative text.
    #[serde(default)]
    pub alt: String,

    /// Declared display width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,

    /// Declared display height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,

    /// Image title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Image {
    /// Create an image reference from a source path.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alt: String::new(),
            width: None,
            height: None,
            title: None,
        }
    }
}
