//! Document model types for the input AST.
//!
//! This module defines the block/inline tree produced by an external
//! markdown parser and consumed by the renderers. Nodes arrive as JSON
//! tagged by kind (`{"t": "Header", "c": {...}}`); unknown extra fields
//! are ignored for forward compatibility.

mod block;
mod document;
mod inline;
mod table;

pub use block::{Block, BulletList, CodeBlock, Header, Image, OrderedList};
pub use document::Document;
pub use inline::{CodeSpan, FootnoteReference, Inline, Link};
pub use table::{Alignment, ColumnSpec, Table, TableCell, TableRow};
