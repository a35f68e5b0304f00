//! Inline-level AST nodes.

use super::Image;
use serde::{Deserialize, Serialize};

/// An inline node within a paragraph, heading, or table cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Inline {
    /// A literal text run.
    Text(String),

    /// A single word space.
    Space,

    /// A hard line break within the paragraph.
    LineBreak,

    /// Bold content.
    Strong(Vec<Inline>),

    /// Italic content.
    Emphasis(Vec<Inline>),

    /// Struck-through content.
    Strikethrough(Vec<Inline>),

    /// Underlined content.
    Underline(Vec<Inline>),

    /// Superscript content.
    Superscript(Vec<Inline>),

    /// Subscript content.
    Subscript(Vec<Inline>),

    /// An inline code span. Rendered as plain text; monospace styling is
    /// the reference package's concern.
    Code(CodeSpan),

    /// A hyperlink wrapping styled children.
    Link(Link),

    /// An image anchored inline with the surrounding text.
    InlineImage(Image),

    /// A reference to a footnote body in the document root.
    FootnoteReference(FootnoteReference),
}

impl Inline {
    /// Create a text run.
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text(text.into())
    }

    /// Create a link with plain text children.
    pub fn link(url: impl Into<String>, text: impl Into<String>) -> Self {
        Inline::Link(Link {
            url: url.into(),
            children: vec![Inline::text(text)],
            title: None,
        })
    }

    /// Create a footnote reference.
    pub fn footnote_ref(id: impl Into<String>) -> Self {
        Inline::FootnoteReference(FootnoteReference { id: id.into() })
    }
}

/// An inline code span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSpan {
    /// The verbatim code text.
    pub text: String,
}

/// A hyperlink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Target URL.
    pub url: String,

    /// Visible inline content.
    #[serde(default)]
    pub children: Vec<Inline>,

    /// Link title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A reference to a footnote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootnoteReference {
    /// Footnote id, looked up in the document's footnote map.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Inline {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_text() {
        let inline = parse(r#"{"t": "Text", "c": "hello"}"#);
        match inline {
            Inline::Text(s) => assert_eq!(s, "hello"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unit_variants() {
        assert!(matches!(parse(r#"{"t": "Space"}"#), Inline::Space));
        assert!(matches!(parse(r#"{"t": "LineBreak"}"#), Inline::LineBreak));
    }

    #[test]
    fn test_parse_nested_emphasis() {
        let inline = parse(
            r#"{"t": "Strong", "c": [{"t": "Emphasis", "c": [{"t": "Text", "c": "both"}]}]}"#,
        );
        match inline {
            Inline::Strong(children) => {
                assert!(matches!(children[0], Inline::Emphasis(_)));
            }
            other => panic!("expected strong, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_link() {
        let inline = parse(
            r#"{"t": "Link", "c": {"url": "https://example.com", "children": [{"t": "Text", "c": "site"}]}}"#,
        );
        match inline {
            Inline::Link(link) => {
                assert_eq!(link.url, "https://example.com");
                assert_eq!(link.children.len(), 1);
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_footnote_reference() {
        let inline = parse(r#"{"t": "FootnoteReference", "c": {"id": "fn1"}}"#);
        match inline {
            Inline::FootnoteReference(r) => assert_eq!(r.id, "fn1"),
            other => panic!("expected footnote reference, got {:?}", other),
        }
    }
}
