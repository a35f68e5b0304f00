//! Style part handling.
//!
//! Wraps the parsed `Contents/header.xml` tree and owns every mutation the
//! conversion applies to it: derived character properties, numbering
//! definitions, derived paragraph properties, and the border fills used by
//! generated tables and horizontal rules. New identifiers are allocated
//! sequentially above the maximum ids found at parse time, so converting the
//! same input twice yields an identical style part.

use crate::error::{Error, Result};
use crate::xml::{XmlElement, XmlNode};

/// Vertical script position for a character property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Script {
    #[default]
    None,
    Superscript,
    Subscript,
}

/// Formatting flags accumulated while walking inline nodes.
///
/// Together with the base character property id this forms the signature
/// the character-property cache deduplicates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CharFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub script: Script,
    /// Text color as `#RRGGBB`; also applied to the underline when set.
    pub color: Option<String>,
}

impl CharFormat {
    /// True when no flag is set, meaning the base property can be used
    /// unchanged.
    pub fn is_empty(&self) -> bool {
        !self.bold
            && !self.italic
            && !self.underline
            && !self.strikethrough
            && self.script == Script::None
            && self.color.is_none()
    }
}

/// Ordered-list numeral formats, cycled per level.
const ORDERED_FORMATS: [&str; 3] = ["DIGIT", "LATIN_CAPITAL", "ROMAN_SMALL"];

/// The parsed style part of a reference package.
#[derive(Debug, Clone)]
pub struct StylePart {
    root: XmlElement,
    max_char_pr_id: u32,
    max_para_pr_id: u32,
    max_numbering_id: u32,
    max_border_fill_id: u32,
    table_border_fill: Option<u32>,
    rule_border_fill: Option<u32>,
}

impl StylePart {
    /// Parse `Contents/header.xml`.
    pub fn parse(source: &str) -> Result<Self> {
        let root = XmlElement::parse(source)?;
        if root.name != "hh:head" {
            return Err(Error::Template(format!(
                "style part root is <{}>, expected <hh:head>",
                root.name
            )));
        }
        let max_char_pr_id = max_item_id(&root, "hh:charProperties", "hh:charPr");
        let max_para_pr_id = max_item_id(&root, "hh:paraProperties", "hh:paraPr");
        let max_numbering_id = max_item_id(&root, "hh:numberings", "hh:numbering");
        let max_border_fill_id = max_item_id(&root, "hh:borderFills", "hh:borderFill");
        Ok(Self {
            root,
            max_char_pr_id,
            max_para_pr_id,
            max_numbering_id,
            max_border_fill_id,
            table_border_fill: None,
            rule_border_fill: None,
        })
    }

    /// True if a `hh:charPr` with this id exists.
    pub fn char_pr_exists(&self, id: u32) -> bool {
        self.find_item("hh:charProperties", "hh:charPr", id).is_some()
    }

    /// True if a `hh:paraPr` with this id exists.
    pub fn para_pr_exists(&self, id: u32) -> bool {
        self.find_item("hh:paraProperties", "hh:paraPr", id).is_some()
    }

    /// True if a `hh:style` with this id exists.
    pub fn style_exists(&self, id: u32) -> bool {
        self.find_item("hh:styles", "hh:style", id).is_some()
    }

    /// Paragraph and character property ids declared by a `hh:style`.
    pub fn style_property_refs(&self, style_id: u32) -> Option<(u32, u32)> {
        let style = self.find_item("hh:styles", "hh:style", style_id)?;
        Some((
            parse_id(style.attr("paraPrIDRef")),
            parse_id(style.attr("charPrIDRef")),
        ))
    }

    /// Numbering id a paragraph property is bound to through its
    /// `hh:heading`, if any.
    pub fn numbering_for_para_pr(&self, para_pr: u32) -> Option<u32> {
        let node = self.find_item("hh:paraProperties", "hh:paraPr", para_pr)?;
        let heading = node.child("hh:heading")?;
        match heading.attr("type") {
            Some("NUMBER") | Some("BULLET") => {
                let id = parse_id(heading.attr("idRef"));
                if id == 0 {
                    None
                } else {
                    Some(id)
                }
            }
            _ => None,
        }
    }

    /// Clone a base character property, apply `format`, and register the
    /// result under a fresh id.
    ///
    /// Falls back to property 0 when the base id is unknown; if neither
    /// exists the base id is returned unchanged.
    pub fn derive_char_pr(&mut self, base: u32, format: &CharFormat) -> u32 {
        let base_node = match self
            .find_item("hh:charProperties", "hh:charPr", base)
            .or_else(|| self.find_item("hh:charProperties", "hh:charPr", 0))
        {
            Some(node) => node.clone(),
            None => return base,
        };

        self.max_char_pr_id += 1;
        let id = self.max_char_pr_id;
        let mut node = base_node;
        node.set_attr("id", id.to_string());

        if format.bold && node.child("hh:bold").is_none() {
            node.add_child(XmlElement::new("hh:bold"));
        }
        if format.italic && node.child("hh:italic").is_none() {
            node.add_child(XmlElement::new("hh:italic"));
        }
        if format.underline {
            if node.child("hh:underline").is_none() {
                node.add_child(XmlElement::new("hh:underline"));
            }
            if let Some(underline) = node.child_mut("hh:underline") {
                underline.set_attr("type", "BOTTOM");
                underline.set_attr("shape", "SOLID");
                underline.set_attr("color", "#000000");
            }
        }
        if format.strikethrough {
            if node.child("hh:strikeout").is_none() {
                node.add_child(XmlElement::new("hh:strikeout"));
            }
            if let Some(strikeout) = node.child_mut("hh:strikeout") {
                strikeout.set_attr("shape", "SOLID");
                strikeout.set_attr("color", "#000000");
            }
        }
        if let Some(color) = &format.color {
            if node.child("hh:textColor").is_none() {
                node.add_child(XmlElement::new("hh:textColor"));
            }
            if let Some(text_color) = node.child_mut("hh:textColor") {
                text_color.set_attr("value", color.clone());
            }
            // A colored underline must match the text color.
            if let Some(underline) = node.child_mut("hh:underline") {
                if underline.attr("type") == Some("BOTTOM") {
                    underline.set_attr("color", color.clone());
                }
            }
        }
        match format.script {
            Script::Superscript => {
                node.remove_children("hh:subscript");
                if node.child("hh:supscript").is_none() {
                    node.add_child(XmlElement::new("hh:supscript"));
                }
            }
            Script::Subscript => {
                node.remove_children("hh:supscript");
                if node.child("hh:subscript").is_none() {
                    node.add_child(XmlElement::new("hh:subscript"));
                }
            }
            Script::None => {}
        }

        if let Some(container) = self.root.descendant_mut("hh:charProperties") {
            container.add_child(node);
        }
        id
    }

    /// Register a fresh numbering definition and return its id.
    ///
    /// Ordered numberings cycle digit, capital-latin, and small-roman
    /// formats down the seven levels; bullet numberings take their marker
    /// text from `glyphs`, cycled per level. `prefixes` holds literal text
    /// prepended to the marker of the matching level.
    pub fn append_numbering(
        &mut self,
        ordered: bool,
        start: u32,
        glyphs: &[String],
        prefixes: &[String],
    ) -> u32 {
        self.max_numbering_id += 1;
        let id = self.max_numbering_id;

        let mut numbering = XmlElement::new("hh:numbering")
            .with_attr("id", id.to_string())
            .with_attr("start", start.to_string());
        for level in 1u8..=7 {
            let prefix = prefixes
                .get(level as usize - 1)
                .map(String::as_str)
                .unwrap_or("");
            let cycle = ((level - 1) % 3) as usize;
            let (num_format, text) = if ordered {
                (ORDERED_FORMATS[cycle], format!("{prefix}^{level}."))
            } else {
                let glyph = glyphs
                    .get((level as usize - 1) % glyphs.len().max(1))
                    .map(String::as_str)
                    .unwrap_or_default();
                ("DIGIT", format!("{prefix}{glyph}"))
            };
            numbering.add_child(para_head(level, num_format, &text));
        }

        self.ensure_numberings_container();
        if let Some(container) = self.root.descendant_mut("hh:numberings") {
            container.add_child(numbering);
        }
        id
    }

    /// Derive a list paragraph property from `base`: bound to `numbering`,
    /// indented by one unit per depth, with a hanging first line.
    pub fn derive_list_para_pr(
        &mut self,
        base: u32,
        numbering: u32,
        depth: u8,
        indent_per_level: u32,
    ) -> u32 {
        let base_node = match self.find_item("hh:paraProperties", "hh:paraPr", base) {
            Some(node) => node.clone(),
            None => return base,
        };

        self.max_para_pr_id += 1;
        let id = self.max_para_pr_id;
        let mut node = base_node;
        node.set_attr("id", id.to_string());

        if node.child("hh:heading").is_none() {
            node.add_child(XmlElement::new("hh:heading"));
        }
        if let Some(heading) = node.child_mut("hh:heading") {
            heading.set_attr("type", "NUMBER");
            heading.set_attr("idRef", numbering.to_string());
            // Numberings define seven levels; deeper nesting keeps the last.
            heading.set_attr("level", depth.clamp(1, 7).saturating_sub(1).to_string());
        }

        set_descendant_values(&mut node, "hc:left", u64::from(depth) * u64::from(indent_per_level));
        if let Some(intent) = node.descendant_mut("hc:intent") {
            intent.set_attr("value", format!("-{indent_per_level}"));
        }

        if let Some(container) = self.root.descendant_mut("hh:paraProperties") {
            container.add_child(node);
        }
        id
    }

    /// Derive a block-quote paragraph property: `base` with its left margin
    /// widened by `indent`.
    pub fn derive_quote_para_pr(&mut self, base: u32, indent: u32) -> u32 {
        let base_node = match self.find_item("hh:paraProperties", "hh:paraPr", base) {
            Some(node) => node.clone(),
            None => return base,
        };

        self.max_para_pr_id += 1;
        let id = self.max_para_pr_id;
        let mut node = base_node;
        node.set_attr("id", id.to_string());

        if let Some(left) = node.descendant_mut("hc:left") {
            let current = parse_id(left.attr("value"));
            left.set_attr("value", (u64::from(current) + u64::from(indent)).to_string());
        }

        if let Some(container) = self.root.descendant_mut("hh:paraProperties") {
            container.add_child(node);
        }
        id
    }

    /// Derive a paragraph property carrying a bottom border, used for
    /// horizontal rules.
    pub fn derive_rule_para_pr(&mut self, base: u32) -> u32 {
        let border_fill = self.ensure_rule_border_fill();
        let base_node = match self.find_item("hh:paraProperties", "hh:paraPr", base) {
            Some(node) => node.clone(),
            None => return base,
        };

        self.max_para_pr_id += 1;
        let id = self.max_para_pr_id;
        let mut node = base_node;
        node.set_attr("id", id.to_string());

        if node.child("hh:border").is_none() {
            node.add_child(
                XmlElement::new("hh:border")
                    .with_attr("borderFillIDRef", border_fill.to_string())
                    .with_attr("offsetLeft", "0")
                    .with_attr("offsetRight", "0")
                    .with_attr("offsetTop", "0")
                    .with_attr("offsetBottom", "0")
                    .with_attr("connect", "0")
                    .with_attr("ignoreMargin", "0"),
            );
        } else if let Some(border) = node.child_mut("hh:border") {
            border.set_attr("borderFillIDRef", border_fill.to_string());
        }

        if let Some(container) = self.root.descendant_mut("hh:paraProperties") {
            container.add_child(node);
        }
        id
    }

    /// Border fill drawn around generated table cells. Registered on first
    /// use and shared by every table in the conversion.
    pub fn ensure_table_border_fill(&mut self) -> u32 {
        if let Some(id) = self.table_border_fill {
            return id;
        }
        let id = self.append_border_fill(true);
        self.table_border_fill = Some(id);
        id
    }

    /// Border fill with only a bottom edge, used by horizontal rules.
    pub fn ensure_rule_border_fill(&mut self) -> u32 {
        if let Some(id) = self.rule_border_fill {
            return id;
        }
        let id = self.append_border_fill(false);
        self.rule_border_fill = Some(id);
        id
    }

    fn append_border_fill(&mut self, all_sides: bool) -> u32 {
        self.max_border_fill_id += 1;
        let id = self.max_border_fill_id;

        let side = |solid: bool| if solid { "SOLID" } else { "NONE" };
        let node = XmlElement::new("hh:borderFill")
            .with_attr("id", id.to_string())
            .with_attr("threeD", "0")
            .with_attr("shadow", "0")
            .with_attr("centerLine", "NONE")
            .with_attr("breakCellSeparateLine", "0")
            .with_child(
                XmlElement::new("hh:slash")
                    .with_attr("type", "NONE")
                    .with_attr("Crooked", "0")
                    .with_attr("isCounter", "0"),
            )
            .with_child(
                XmlElement::new("hh:backSlash")
                    .with_attr("type", "NONE")
                    .with_attr("Crooked", "0")
                    .with_attr("isCounter", "0"),
            )
            .with_child(border_edge("hh:leftBorder", side(all_sides), "0.12 mm"))
            .with_child(border_edge("hh:rightBorder", side(all_sides), "0.12 mm"))
            .with_child(border_edge("hh:topBorder", side(all_sides), "0.12 mm"))
            .with_child(border_edge("hh:bottomBorder", "SOLID", "0.12 mm"))
            .with_child(border_edge("hh:diagonal", "SOLID", "0.1 mm"))
            .with_child(
                XmlElement::new("hc:fillBrush").with_child(
                    XmlElement::new("hc:winBrush")
                        .with_attr("faceColor", "none")
                        .with_attr("hatchColor", "#000000")
                        .with_attr("alpha", "0"),
                ),
            );

        self.ensure_border_fills_container();
        if let Some(container) = self.root.descendant_mut("hh:borderFills") {
            container.add_child(node);
        }
        id
    }

    /// Recompute the `itemCnt` attribute of every property container.
    /// Must run after the last derivation and before serialization.
    pub fn refresh_item_counts(&mut self) {
        const CONTAINERS: [(&str, &str); 4] = [
            ("hh:charProperties", "hh:charPr"),
            ("hh:paraProperties", "hh:paraPr"),
            ("hh:numberings", "hh:numbering"),
            ("hh:borderFills", "hh:borderFill"),
        ];
        for (container, item) in CONTAINERS {
            if let Some(node) = self.root.descendant_mut(container) {
                let count = node.children_named(item).count();
                node.set_attr("itemCnt", count.to_string());
            }
        }
    }

    /// Serialize back to a standalone `header.xml` document.
    pub fn serialize(&self) -> Result<String> {
        self.root.serialize_document()
    }

    fn find_item<'a>(&'a self, container: &str, item: &'a str, id: u32) -> Option<&'a XmlElement> {
        self.root
            .descendant(container)?
            .children_named(item)
            .find(|el| parse_id(el.attr("id")) == id)
    }

    fn ensure_numberings_container(&mut self) {
        if self.root.descendant("hh:numberings").is_some() {
            return;
        }
        let container = XmlElement::new("hh:numberings").with_attr("itemCnt", "0");
        if let Some(ref_list) = self.root.descendant_mut("hh:refList") {
            let index = ref_list
                .children
                .iter()
                .position(|node| {
                    matches!(node, XmlNode::Element(el) if el.name == "hh:paraProperties")
                })
                .unwrap_or(ref_list.children.len());
            ref_list.insert_child(index, container);
        } else {
            self.root.add_child(container);
        }
    }

    fn ensure_border_fills_container(&mut self) {
        if self.root.descendant("hh:borderFills").is_some() {
            return;
        }
        let container = XmlElement::new("hh:borderFills").with_attr("itemCnt", "0");
        if let Some(ref_list) = self.root.descendant_mut("hh:refList") {
            ref_list.insert_child(0, container);
        } else {
            self.root.add_child(container);
        }
    }
}

fn para_head(level: u8, num_format: &str, text: &str) -> XmlElement {
    let mut head = XmlElement::new("hh:paraHead")
        .with_attr("start", "1")
        .with_attr("level", level.to_string())
        .with_attr("align", "LEFT")
        .with_attr("useInstWidth", "1")
        .with_attr("autoIndent", "0")
        .with_attr("widthAdjust", "0")
        .with_attr("textOffsetType", "PERCENT")
        .with_attr("textOffset", "50")
        .with_attr("numFormat", num_format)
        .with_attr("charPrIDRef", "4294967295")
        .with_attr("checkable", "0");
    if !text.is_empty() {
        head.add_text(text);
    }
    head
}

fn border_edge(name: &str, kind: &str, width: &str) -> XmlElement {
    XmlElement::new(name)
        .with_attr("type", kind)
        .with_attr("width", width)
        .with_attr("color", "#000000")
}

fn set_descendant_values(node: &mut XmlElement, name: &str, value: u64) {
    if let Some(el) = node.descendant_mut(name) {
        el.set_attr("value", value.to_string());
    }
}

fn max_item_id(root: &XmlElement, container: &str, item: &str) -> u32 {
    root.descendant(container)
        .map(|node| {
            node.children_named(item)
                .map(|el| parse_id(el.attr("id")))
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0)
}

fn parse_id(value: Option<&str>) -> u32 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}
