//! List rendering.

use crate::error::Result;
use crate::model::Block;
use crate::xml::XmlElement;

use super::{block, ListKind, Nesting, RenderContext};

/// Renders a list's items as marker paragraphs at the next list depth.
///
/// Sibling lists of the same kind, depth, and start share a numbering
/// definition through the render context, so an ordered sequence continues
/// across them; an explicit start begins a fresh sequence.
pub(crate) fn render_list(
    ctx: &mut RenderContext,
    kind: ListKind,
    start: u32,
    items: &[Vec<Block>],
    nesting: Nesting,
    out: &mut Vec<XmlElement>,
) -> Result<()> {
    let nested = nesting.into_list();
    ctx.check_depth(nested)?;
    let style = ctx.list_style(kind, nested.list, start);

    for item in items {
        for child in item {
            match child {
                Block::Paragraph(content) => {
                    out.push(block::inline_paragraph(ctx, content, style, nested, false)?);
                }
                Block::BulletList(inner) => {
                    render_list(ctx, ListKind::Bullet, 1, &inner.items, nested, out)?;
                }
                Block::OrderedList(inner) => {
                    render_list(ctx, ListKind::Ordered, inner.start, &inner.items, nested, out)?;
                }
                other => block::render_block(ctx, other, nested, out)?,
            }
        }
    }
    Ok(())
}
