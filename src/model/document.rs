//! Document root type.

use super::Block;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The root of an input document AST.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document title, written into the output package manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Top-level blocks in document order.
    #[serde(default)]
    pub blocks: Vec<Block>,

    /// Footnote bodies keyed by footnote id, referenced from
    /// [`Inline::FootnoteReference`](super::Inline::FootnoteReference).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub footnotes: BTreeMap<String, Vec<Block>>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document from blocks.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    /// Set the title and return self.
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Parse a document from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the document to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check whether the document has any content.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Inline;

    #[test]
    fn test_parse_minimal() {
        let doc = Document::from_json(r#"{"blocks": []}"#).unwrap();
        assert!(doc.is_empty());
        assert!(doc.title.is_none());
    }

    #[test]
    fn test_parse_with_title_and_blocks() {
        let json = r#"{
            "title": "Report",
            "blocks": [
                {"t": "Paragraph", "c": [{"t": "Text", "c": "hello"}]}
            ]
        }"#;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Report"));
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn test_parse_footnotes() {
        let json = r#"{
            "blocks": [],
            "footnotes": {
                "1": [{"t": "Paragraph", "c": [{"t": "Text", "c": "note"}]}]
            }
        }"#;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.footnotes.len(), 1);
        assert!(doc.footnotes.contains_key("1"));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{
            "blocks": [],
            "meta": {"generator": "something"},
            "version": 3
        }"#;
        assert!(Document::from_json(json).is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let doc = Document::with_blocks(vec![crate::model::Block::Paragraph(vec![
            Inline::text("round trip"),
        ])])
        .titled("T");
        let json = doc.to_json().unwrap();
        let back = Document::from_json(&json).unwrap();
        assert_eq!(back.title.as_deref(), Some("T"));
        assert_eq!(back.blocks.len(), 1);
    }
}
