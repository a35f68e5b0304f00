//! Character property derivation cache.

use std::collections::HashMap;

use crate::template::{CharFormat, StylePart};

/// Deduplicates derived character properties within one conversion.
///
/// Keyed by (base property id, format signature); the same combination of
/// base style and formatting flags always resolves to the same derived id,
/// no matter how often it occurs in the document.
#[derive(Debug, Default)]
pub struct CharPropertyCache {
    cache: HashMap<(u32, CharFormat), u32>,
}

impl CharPropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Character property id for `base` with `format` applied.
    ///
    /// An empty format is the base property itself; nothing is derived or
    /// cached for it.
    pub fn resolve(&mut self, styles: &mut StylePart, base: u32, format: &CharFormat) -> u32 {
        if format.is_empty() {
            return base;
        }
        if let Some(&id) = self.cache.get(&(base, format.clone())) {
            return id;
        }
        let id = styles.derive_char_pr(base, format);
        self.cache.insert((base, format.clone()), id);
        id
    }

    /// Number of derived properties registered so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
