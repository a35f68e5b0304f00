//! Rendering: document AST to section body paragraphs.
//!
//! A [`RenderContext`] carries the per-conversion mutable state: the style
//! part being augmented with derived properties, the character-property and
//! numbering caches, the image registry, and the id counters. Renderers
//! thread a [`Nesting`] value down the block tree; the sum of its counters
//! is bounded by the configured maximum depth.

mod block;
mod charpr;
mod image;
mod inline;
mod list;
mod numbering;
mod table;

pub use image::{EmbeddedImage, ImageRegistry};
pub use numbering::ListKind;

use std::collections::{BTreeMap, HashMap};

use crate::config::ConvertOptions;
use crate::error::{Error, Result};
use crate::model::{Block, Document};
use crate::template::{CharFormat, PageLayout, StyleMap, StyleRef, StylePart, Template};
use crate::xml::XmlElement;

use charpr::CharPropertyCache;
use numbering::NumberingManager;

/// Nesting counters threaded through the block tree.
///
/// `list`, `quote`, and `boxed` count enclosing list levels, quote levels,
/// and boxed constructs (table cells, footnote bodies). `cell_style`
/// overrides the body style inside a table cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nesting {
    pub list: u8,
    pub quote: u8,
    pub boxed: u8,
    pub cell_style: Option<StyleRef>,
}

impl Nesting {
    /// Combined depth across all nesting kinds.
    pub fn total(self) -> u8 {
        self.list
            .saturating_add(self.quote)
            .saturating_add(self.boxed)
    }

    fn into_list(self) -> Self {
        Self {
            list: self.list.saturating_add(1),
            ..self
        }
    }

    fn into_quote(self) -> Self {
        Self {
            quote: self.quote.saturating_add(1),
            ..self
        }
    }

    fn into_cell(self, style: StyleRef) -> Self {
        Self {
            boxed: self.boxed.saturating_add(1),
            cell_style: Some(style),
            ..self
        }
    }

    fn into_box(self) -> Self {
        Self {
            boxed: self.boxed.saturating_add(1),
            ..self
        }
    }
}

/// Mutable state for one conversion.
pub struct RenderContext<'a> {
    pub options: &'a ConvertOptions,
    /// Page geometry from the template.
    pub page: PageLayout,
    /// Placeholder styles resolved from the template, read-only.
    pub style_map: &'a StyleMap,
    /// The conversion's working copy of the style part; derived character
    /// properties, numberings, and border fills are appended here.
    pub styles: StylePart,
    /// Images registered so far, in registration order.
    pub images: ImageRegistry,
    footnotes: &'a BTreeMap<String, Vec<Block>>,
    char_props: CharPropertyCache,
    numbering: NumberingManager,
    quote_para_prs: HashMap<(u32, u8), u32>,
    rule_para_prs: HashMap<u32, u32>,
    object_id: u32,
    field_id: u32,
    instance_id: u32,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        template: &'a Template,
        options: &'a ConvertOptions,
        document: &'a Document,
    ) -> Self {
        Self {
            options,
            page: template.page(),
            style_map: template.style_map(),
            styles: template.styles().clone(),
            images: ImageRegistry::new(),
            footnotes: &document.footnotes,
            char_props: CharPropertyCache::default(),
            numbering: NumberingManager::default(),
            quote_para_prs: HashMap::new(),
            rule_para_prs: HashMap::new(),
            object_id: 0,
            field_id: 0,
            instance_id: 0,
        }
    }

    /// Character property for `base` with `format` applied, interned once
    /// per distinct signature.
    pub fn char_pr(&mut self, base: u32, format: &CharFormat) -> u32 {
        self.char_props.resolve(&mut self.styles, base, format)
    }

    /// Style for a list marker paragraph at the given depth.
    pub fn list_style(&mut self, kind: ListKind, depth: u8, start: u32) -> StyleRef {
        self.numbering.list_style(
            &mut self.styles,
            self.style_map,
            self.options,
            kind,
            depth,
            start,
        )
    }

    /// Paragraph property for quoted content, indented per level.
    pub fn quote_para_pr(&mut self, base: u32, depth: u8) -> u32 {
        if let Some(&cached) = self.quote_para_prs.get(&(base, depth)) {
            return cached;
        }
        let indent = self.options.blockquote_indent_per_level * u32::from(depth);
        let derived = self.styles.derive_quote_para_pr(base, indent);
        self.quote_para_prs.insert((base, depth), derived);
        derived
    }

    /// Paragraph property for a thematic break.
    pub fn rule_para_pr(&mut self, base: u32) -> u32 {
        if let Some(&cached) = self.rule_para_prs.get(&base) {
            return cached;
        }
        let derived = self.styles.derive_rule_para_pr(base);
        self.rule_para_prs.insert(base, derived);
        derived
    }

    /// Body of the footnote with the given id, if the document defines one.
    pub fn footnote(&self, id: &str) -> Option<Vec<Block>> {
        self.footnotes.get(id).cloned()
    }

    /// Fails with a conversion error when the combined nesting depth
    /// exceeds the configured maximum.
    pub fn check_depth(&self, nesting: Nesting) -> Result<()> {
        let max = self.options.max_nesting_depth;
        if nesting.total() > max {
            return Err(Error::Conversion(format!(
                "nesting depth {} exceeds the maximum of {max}",
                nesting.total()
            )));
        }
        Ok(())
    }

    /// Total width available to tables: the template's text width, or the
    /// configured fallback when the template carried no page setup.
    pub fn table_total_width(&self) -> u64 {
        if self.page.from_template {
            u64::from(self.page.text_width())
        } else {
            self.options.table_total_width
        }
    }

    /// Ids are sequential per conversion, so identical input yields
    /// identical output bytes.
    pub fn next_object_id(&mut self) -> u32 {
        self.object_id += 1;
        self.object_id
    }

    pub fn next_field_id(&mut self) -> u32 {
        self.field_id += 1;
        self.field_id
    }

    pub fn next_instance_id(&mut self) -> u32 {
        self.instance_id += 1;
        self.instance_id
    }
}

/// Renders a document's blocks into section body paragraphs.
///
/// An empty document still yields one empty body paragraph so the section
/// stays valid.
pub fn render_document(
    ctx: &mut RenderContext,
    document: &Document,
) -> Result<Vec<XmlElement>> {
    let mut paragraphs = block::render_blocks(ctx, &document.blocks, Nesting::default())?;
    if paragraphs.is_empty() {
        paragraphs.push(block::empty_paragraph(ctx.style_map.resolve("BODY")));
    }
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BulletList, Inline};

    #[test]
    fn test_empty_document_yields_one_paragraph() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let document = Document::default();
        let mut ctx = RenderContext::new(&template, &options, &document);
        let paragraphs = render_document(&mut ctx, &document).unwrap();
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].name, "hp:p");
    }

    #[test]
    fn test_mixed_document_renders_in_order() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let document = Document::with_blocks(vec![
            Block::header(1, "Title"),
            Block::paragraph("Body text."),
            Block::BulletList(BulletList {
                items: vec![vec![Block::paragraph("item")]],
            }),
        ]);
        let mut ctx = RenderContext::new(&template, &options, &document);
        let paragraphs = render_document(&mut ctx, &document).unwrap();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0].descendant("hp:t").unwrap().text(), "Title");
        assert_eq!(
            paragraphs[1].descendant("hp:t").unwrap().text(),
            "Body text."
        );
        assert_eq!(paragraphs[2].descendant("hp:t").unwrap().text(), "item");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let document = Document::with_blocks(vec![
            Block::header(1, "Title"),
            Block::Paragraph(vec![
                Inline::Strong(vec![Inline::text("bold")]),
                Inline::text(" and "),
                Inline::link("https://example.com", "a link"),
            ]),
            Block::HorizontalRule,
        ]);

        let render = || {
            let mut ctx = RenderContext::new(&template, &options, &document);
            let paragraphs = render_document(&mut ctx, &document).unwrap();
            paragraphs
                .iter()
                .map(|p| p.serialize().unwrap())
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_id_counters_are_sequential() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let document = Document::default();
        let mut ctx = RenderContext::new(&template, &options, &document);
        assert_eq!(ctx.next_object_id(), 1);
        assert_eq!(ctx.next_object_id(), 2);
        assert_eq!(ctx.next_field_id(), 1);
        assert_eq!(ctx.next_instance_id(), 1);
    }

    #[test]
    fn test_table_width_falls_back_without_page_setup() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let document = Document::default();
        let mut ctx = RenderContext::new(&template, &options, &document);
        assert_eq!(ctx.table_total_width(), u64::from(ctx.page.text_width()));

        ctx.page.from_template = false;
        assert_eq!(ctx.table_total_width(), options.table_total_width);
    }
}
