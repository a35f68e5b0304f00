//! List numbering allocation.

use std::collections::HashMap;

use crate::config::ConvertOptions;
use crate::template::{StyleMap, StylePart, StyleRef};

/// List marker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    fn token(self, depth: u8) -> String {
        match self {
            ListKind::Bullet => format!("LIST_BULLET_{depth}"),
            ListKind::Ordered => format!("LIST_ORDERED_{depth}"),
        }
    }
}

/// Allocates numbering definitions and list paragraph properties.
///
/// Numberings are shared per (kind, depth, start): sibling lists with the
/// same signature continue one visible sequence, while an explicit `start`
/// override gets its own definition and restarts. Derived paragraph
/// properties are shared per (numbering, depth).
#[derive(Debug, Default)]
pub struct NumberingManager {
    numberings: HashMap<(ListKind, u8, u32), u32>,
    para_prs: HashMap<(u32, u8), u32>,
}

impl NumberingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the style for a list paragraph at `depth` (1-based).
    ///
    /// A `LIST_*` placeholder whose paragraph property already carries a
    /// numbering binding wins for default-start lists. Otherwise a numbering
    /// is generated (or reused) and a list paragraph property derived from
    /// the placeholder or default style.
    pub fn list_style(
        &mut self,
        styles: &mut StylePart,
        style_map: &StyleMap,
        options: &ConvertOptions,
        kind: ListKind,
        depth: u8,
        start: u32,
    ) -> StyleRef {
        let clamped = depth.clamp(1, 7);
        let token = kind.token(clamped);

        if start == 1 {
            if let Some(entry) = style_map.lookup(&token) {
                if styles.numbering_for_para_pr(entry.para_pr).is_some() {
                    return entry;
                }
            }
        }

        let base = style_map.resolve(&token);
        let numbering = match self.numberings.get(&(kind, clamped, start)) {
            Some(&id) => id,
            None => {
                let prefixes = marker_prefixes(style_map, kind);
                let id = styles.append_numbering(
                    kind == ListKind::Ordered,
                    start,
                    &options.bullet_glyphs,
                    &prefixes,
                );
                self.numberings.insert((kind, clamped, start), id);
                id
            }
        };
        let para_pr = match self.para_prs.get(&(numbering, depth)) {
            Some(&id) => id,
            None => {
                let id = styles.derive_list_para_pr(
                    base.para_pr,
                    numbering,
                    depth,
                    options.blockquote_indent_per_level,
                );
                self.para_prs.insert((numbering, depth), id);
                id
            }
        };
        StyleRef { para_pr, ..base }
    }
}

/// Literal placeholder prefixes for each of the seven marker levels.
fn marker_prefixes(style_map: &StyleMap, kind: ListKind) -> Vec<String> {
    (1u8..=7)
        .map(|level| {
            style_map
                .prefix(&kind.token(level))
                .unwrap_or("")
                .to_string()
        })
        .collect()
}
