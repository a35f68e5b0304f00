//! Table types.

use super::Block;
use serde::{Deserialize, Serialize};

/// A table structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Column specifications, one per grid column.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    /// Number of header rows (0 = no header).
    #[serde(default)]
    pub header_rows: u8,

    /// Rows in the table.
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of grid columns.
    ///
    /// Falls back to the widest row when no column specs are given.
    pub fn column_count(&self) -> usize {
        if !self.columns.is_empty() {
            return self.columns.len();
        }
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(|c| c.colspan as usize).sum())
            .max()
            .unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get header rows.
    pub fn header(&self) -> &[TableRow] {
        let n = (self.header_rows as usize).min(self.rows.len());
        &self.rows[..n]
    }

    /// Get body rows (non-header).
    pub fn body(&self) -> &[TableRow] {
        let n = (self.header_rows as usize).min(self.rows.len());
        &self.rows[n..]
    }

    /// Get the alignment for a grid column, defaulting to left.
    pub fn column_alignment(&self, index: usize) -> Alignment {
        self.columns
            .get(index)
            .map(|c| c.alignment)
            .unwrap_or_default()
    }
}

/// A column specification carrying alignment and an optional width weight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Horizontal alignment for cells in this column.
    #[serde(default)]
    pub alignment: Alignment,

    /// Relative width weight, typically the separator dash count.
    /// `None` means the column takes an equal share.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl ColumnSpec {
    /// Create an equal-width column with the given alignment.
    pub fn aligned(alignment: Alignment) -> Self {
        Self {
            alignment,
            weight: None,
        }
    }

    /// Create a weighted column.
    pub fn weighted(weight: u32) -> Self {
        Self {
            alignment: Alignment::default(),
            weight: Some(weight),
        }
    }
}

/// A table row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in the row.
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

impl TableRow {
    /// Create a row with cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self { cells }
    }

    /// Create a row of plain-text cells.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(TableCell::text).collect())
    }
}

/// A table cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell content, a sequence of blocks.
    #[serde(default)]
    pub content: Vec<Block>,

    /// Number of rows this cell spans.
    #[serde(default = "default_span")]
    pub rowspan: u8,

    /// Number of columns this cell spans.
    #[serde(default = "default_span")]
    pub colspan: u8,

    /// Alignment override; the column alignment applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
}

fn default_span() -> u8 {
    1
}

impl TableCell {
    /// Create a cell with plain text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Block::paragraph(text)],
            rowspan: 1,
            colspan: 1,
            alignment: None,
        }
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            rowspan: 1,
            colspan: 1,
            alignment: None,
        }
    }

    /// Set colspan and return self.
    pub fn colspan(mut self, span: u8) -> Self {
        self.colspan = span;
        self
    }

    /// Set rowspan and return self.
    pub fn rowspan(mut self, span: u8) -> Self {
        self.rowspan = span;
        self
    }

    /// Set alignment and return self.
    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Check if this cell spans multiple rows or columns.
    pub fn is_merged(&self) -> bool {
        self.rowspan > 1 || self.colspan > 1
    }
}

/// Horizontal alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
}
