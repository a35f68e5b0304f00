//! Placeholder resolution.
//!
//! Scans the template's body skeleton for placeholder tokens (`H1`, `BODY`,
//! `CELL_TOP_LEFT`, `LIST_ORDERED_3`, ...) and harvests the style identifiers
//! attached to each token's enclosing paragraph and run. The resulting
//! [`StyleMap`] is read-only for the rest of the conversion. Page geometry is
//! extracted from the section properties in the same pass.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::template::styles::StylePart;
use crate::xml::XmlElement;

/// Every placeholder token recognized in template body text.
pub const TOKENS: [&str; 36] = [
    "H1",
    "H2",
    "H3",
    "H4",
    "H5",
    "H6",
    "H7",
    "H8",
    "H9",
    "BODY",
    "CELL_HEADER_LEFT",
    "CELL_HEADER_CENTER",
    "CELL_HEADER_RIGHT",
    "CELL_TOP_LEFT",
    "CELL_TOP_CENTER",
    "CELL_TOP_RIGHT",
    "CELL_MIDDLE_LEFT",
    "CELL_MIDDLE_CENTER",
    "CELL_MIDDLE_RIGHT",
    "CELL_BOTTOM_LEFT",
    "CELL_BOTTOM_CENTER",
    "CELL_BOTTOM_RIGHT",
    "LIST_BULLET_1",
    "LIST_BULLET_2",
    "LIST_BULLET_3",
    "LIST_BULLET_4",
    "LIST_BULLET_5",
    "LIST_BULLET_6",
    "LIST_BULLET_7",
    "LIST_ORDERED_1",
    "LIST_ORDERED_2",
    "LIST_ORDERED_3",
    "LIST_ORDERED_4",
    "LIST_ORDERED_5",
    "LIST_ORDERED_6",
    "LIST_ORDERED_7",
];

/// The identifier triple needed to apply a template look to generated
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRef {
    /// `paraPrIDRef` for the paragraph.
    pub para_pr: u32,
    /// `charPrIDRef` for runs inside the paragraph.
    pub char_pr: u32,
    /// `styleIDRef` for the paragraph.
    pub style: u32,
}

/// How a header level is rendered, classified from where its placeholder
/// sat in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Placeholder stood alone in a plain paragraph.
    #[default]
    Plain,
    /// Literal text preceded the placeholder; it is replayed before the
    /// header content.
    Prefix,
    /// Placeholder sat inside a table; the header is wrapped in a
    /// single-cell table.
    Table,
}

/// Placeholder-to-style mapping harvested from one template.
#[derive(Debug, Clone)]
pub struct StyleMap {
    entries: HashMap<String, StyleRef>,
    prefixes: HashMap<String, String>,
    header_modes: HashMap<u8, HeaderMode>,
    default_ref: StyleRef,
}

impl StyleMap {
    /// Style for a token, falling back to the template's default style.
    pub fn resolve(&self, token: &str) -> StyleRef {
        self.lookup(token).unwrap_or(self.default_ref)
    }

    /// Style for a token only if the template actually provided it.
    pub fn lookup(&self, token: &str) -> Option<StyleRef> {
        self.entries.get(token).copied()
    }

    /// Literal text captured ahead of a placeholder, if any.
    pub fn prefix(&self, token: &str) -> Option<&str> {
        self.prefixes.get(token).map(String::as_str)
    }

    /// Rendering mode for a header level.
    pub fn header_mode(&self, level: u8) -> HeaderMode {
        self.header_modes.get(&level).copied().unwrap_or_default()
    }

    /// The fallback style used when a placeholder is absent.
    pub fn default_ref(&self) -> StyleRef {
        self.default_ref
    }
}

/// Page geometry from the template's section properties.
#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
    /// False when the template carried no page setup and the A4 defaults
    /// are in effect.
    pub from_template: bool,
}

impl PageLayout {
    /// Width available to content between the left and right margins.
    pub fn text_width(&self) -> u32 {
        self.width
            .saturating_sub(self.margin_left)
            .saturating_sub(self.margin_right)
    }
}

impl Default for PageLayout {
    /// A4 portrait with standard margins, in HWP units.
    fn default() -> Self {
        Self {
            width: 59528,
            height: 84188,
            margin_left: 8504,
            margin_right: 8504,
            margin_top: 5668,
            margin_bottom: 4252,
            from_template: false,
        }
    }
}

/// Scan the body skeleton and build the style map and page layout.
///
/// The first occurrence of each token wins. Every harvested identifier is
/// checked against the style part; a reference to a property that does not
/// exist there is a [`Error::Style`].
pub fn resolve_styles(section: &XmlElement, styles: &StylePart) -> Result<(StyleMap, PageLayout)> {
    let default_ref = default_style_ref(styles);
    let mut map = StyleMap {
        entries: HashMap::new(),
        prefixes: HashMap::new(),
        header_modes: HashMap::new(),
        default_ref,
    };

    scan_element(section, false, &mut map);

    for (token, style_ref) in &map.entries {
        if !styles.para_pr_exists(style_ref.para_pr) {
            return Err(Error::Style(format!(
                "placeholder '{}' references paragraph property {} which does not exist",
                token, style_ref.para_pr
            )));
        }
        if !styles.char_pr_exists(style_ref.char_pr) {
            return Err(Error::Style(format!(
                "placeholder '{}' references character property {} which does not exist",
                token, style_ref.char_pr
            )));
        }
    }

    Ok((map, page_layout(section)))
}

fn default_style_ref(styles: &StylePart) -> StyleRef {
    match styles.style_property_refs(0) {
        Some((para_pr, char_pr)) => StyleRef {
            para_pr,
            char_pr,
            style: 0,
        },
        None => StyleRef {
            para_pr: 0,
            char_pr: 0,
            style: 0,
        },
    }
}

fn scan_element(el: &XmlElement, in_table: bool, map: &mut StyleMap) {
    if el.name == "hp:p" {
        harvest_paragraph(el, in_table, map);
    }
    let inside = in_table || el.name == "hp:tbl";
    for child in el.elements() {
        scan_element(child, inside, map);
    }
}

fn harvest_paragraph(para: &XmlElement, in_table: bool, map: &mut StyleMap) {
    let para_pr = parse_id(para.attr("paraPrIDRef"));
    let style = parse_id(para.attr("styleIDRef"));

    for run in para.children_named("hp:run") {
        let char_pr = parse_id(run.attr("charPrIDRef"));
        let style_ref = StyleRef {
            para_pr,
            char_pr,
            style,
        };
        for t in run.children_named("hp:t") {
            let text = t.text();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            record_token(trimmed, style_ref, in_table, map);
        }
    }
}

fn record_token(trimmed: &str, style_ref: StyleRef, in_table: bool, map: &mut StyleMap) {
    if TOKENS.contains(&trimmed) {
        insert_entry(map, trimmed, style_ref, None, in_table);
        return;
    }

    // Longest token first so a hypothetical overlapping pair resolves
    // stably.
    let mut by_length: Vec<&str> = TOKENS.iter().copied().filter(|t| prefix_eligible(t)).collect();
    by_length.sort_by_key(|t| std::cmp::Reverse(t.len()));
    for token in by_length {
        if let Some(prefix) = trimmed.strip_suffix(token) {
            if !prefix.is_empty() {
                insert_entry(map, token, style_ref, Some(prefix.to_string()), in_table);
                return;
            }
        }
    }
}

fn insert_entry(
    map: &mut StyleMap,
    token: &str,
    style_ref: StyleRef,
    prefix: Option<String>,
    in_table: bool,
) {
    if map.entries.contains_key(token) {
        return;
    }
    map.entries.insert(token.to_string(), style_ref);
    let has_prefix = prefix.is_some();
    if let Some(prefix) = prefix {
        map.prefixes.insert(token.to_string(), prefix);
    }
    if let Some(level) = header_level(token) {
        let mode = if in_table {
            HeaderMode::Table
        } else if has_prefix {
            HeaderMode::Prefix
        } else {
            HeaderMode::Plain
        };
        map.header_modes.insert(level, mode);
    }
}

/// Tokens that may carry literal prefix text: headers and list markers.
fn prefix_eligible(token: &str) -> bool {
    header_level(token).is_some() || token.starts_with("LIST_")
}

fn header_level(token: &str) -> Option<u8> {
    let digits = token.strip_prefix('H')?;
    let level: u8 = digits.parse().ok()?;
    if (1..=9).contains(&level) {
        Some(level)
    } else {
        None
    }
}

fn page_layout(section: &XmlElement) -> PageLayout {
    let mut layout = PageLayout::default();
    let page_pr = section
        .descendant("hp:secPr")
        .and_then(|sec_pr| sec_pr.descendant("hp:pagePr"));
    let Some(page_pr) = page_pr else {
        return layout;
    };

    if let Some(width) = page_pr.attr("width").and_then(|v| v.parse().ok()) {
        layout.width = width;
        layout.from_template = true;
    }
    if let Some(height) = page_pr.attr("height").and_then(|v| v.parse().ok()) {
        layout.height = height;
    }
    if let Some(margin) = page_pr.child("hp:margin") {
        if let Some(left) = margin.attr("left").and_then(|v| v.parse().ok()) {
            layout.margin_left = left;
        }
        if let Some(right) = margin.attr("right").and_then(|v| v.parse().ok()) {
            layout.margin_right = right;
        }
        if let Some(top) = margin.attr("top").and_then(|v| v.parse().ok()) {
            layout.margin_top = top;
        }
        if let Some(bottom) = margin.attr("bottom").and_then(|v| v.parse().ok()) {
            layout.margin_bottom = bottom;
        }
    }
    layout
}

fn parse_id(value: Option<&str>) -> u32 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}
