//! Table layout and rendering.

use std::collections::HashSet;

use crate::error::Result;
use crate::model::{Alignment, Table};
use crate::template::StyleRef;
use crate::xml::XmlElement;

use super::{block, Nesting, RenderContext};

/// Vertical band of a cell; crossed with alignment it selects one of the
/// twelve cell placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Header,
    Top,
    Middle,
    Bottom,
}

impl Band {
    fn token(self, alignment: Alignment) -> String {
        let band = match self {
            Band::Header => "HEADER",
            Band::Top => "TOP",
            Band::Middle => "MIDDLE",
            Band::Bottom => "BOTTOM",
        };
        let align = match alignment {
            Alignment::Left => "LEFT",
            Alignment::Center => "CENTER",
            Alignment::Right => "RIGHT",
        };
        format!("CELL_{band}_{align}")
    }
}

/// Renders a table inside its anchor paragraph.
pub fn render_table(
    ctx: &mut RenderContext,
    table: &Table,
    nesting: Nesting,
) -> Result<XmlElement> {
    let anchor_style = nesting
        .cell_style
        .unwrap_or_else(|| ctx.style_map.resolve("BODY"));
    if table.is_empty() {
        return Ok(block::empty_paragraph(anchor_style));
    }

    let total = ctx.table_total_width();
    let widths = column_widths(total, table);
    let row_count = table.rows.len();
    let col_count = widths.len();
    let header_count = usize::from(table.header_rows).min(row_count);
    let body_count = row_count - header_count;

    let border_fill = ctx.styles.ensure_table_border_fill();
    let mut tbl = table_element(ctx.next_object_id(), row_count, col_count, border_fill, total);

    let mut occupied: HashSet<(usize, usize)> = HashSet::new();
    for (row_index, row) in table.rows.iter().enumerate() {
        let band = row_band(row_index, header_count, body_count);
        let mut tr = XmlElement::new("hp:tr");
        let mut col = 0usize;
        for cell in &row.cells {
            while occupied.contains(&(row_index, col)) {
                col += 1;
            }
            if col >= col_count {
                break;
            }
            let colspan = usize::from(cell.colspan.max(1)).min(col_count - col);
            let rowspan = usize::from(cell.rowspan.max(1)).min(row_count - row_index);
            for r in row_index..row_index + rowspan {
                for c in col..col + colspan {
                    occupied.insert((r, c));
                }
            }

            let alignment = cell.alignment.unwrap_or(table.column_alignment(col));
            let style = ctx.style_map.resolve(&band.token(alignment));
            let cell_nesting = nesting.into_cell(style);
            ctx.check_depth(cell_nesting)?;
            let content = block::render_blocks(ctx, &cell.content, cell_nesting)?;

            let width: u64 = widths[col..col + colspan].iter().sum();
            tr.add_child(cell_element(
                ctx.next_instance_id(),
                border_fill,
                band == Band::Header,
                col,
                row_index,
                colspan,
                rowspan,
                width,
                content,
            ));
            col += colspan;
        }
        tbl.add_child(tr);
    }

    Ok(anchor_paragraph(anchor_style, tbl))
}

/// Wraps already-rendered paragraphs in a single-cell table spanning the
/// text width. Used for header styles the template presents boxed.
pub fn boxed_paragraphs(
    ctx: &mut RenderContext,
    anchor_style: StyleRef,
    paragraphs: Vec<XmlElement>,
) -> XmlElement {
    let total = ctx.table_total_width();
    let border_fill = ctx.styles.ensure_table_border_fill();
    let mut tbl = table_element(ctx.next_object_id(), 1, 1, border_fill, total);
    let mut tr = XmlElement::new("hp:tr");
    tr.add_child(cell_element(
        ctx.next_instance_id(),
        border_fill,
        false,
        0,
        0,
        1,
        1,
        total,
        paragraphs,
    ));
    tbl.add_child(tr);
    anchor_paragraph(anchor_style, tbl)
}

fn table_element(
    id: u32,
    row_count: usize,
    col_count: usize,
    border_fill: u32,
    total: u64,
) -> XmlElement {
    XmlElement::new("hp:tbl")
        .with_attr("id", id.to_string())
        .with_attr("zOrder", "0")
        .with_attr("numberingType", "TABLE")
        .with_attr("textWrap", "TOP_AND_BOTTOM")
        .with_attr("textFlow", "BOTH_SIDES")
        .with_attr("lock", "0")
        .with_attr("dropcapstyle", "None")
        .with_attr("pageBreak", "CELL")
        .with_attr("repeatHeader", "1")
        .with_attr("rowCnt", row_count.to_string())
        .with_attr("colCnt", col_count.to_string())
        .with_attr("cellSpacing", "0")
        .with_attr("borderFillIDRef", border_fill.to_string())
        .with_attr("noAdjust", "0")
        .with_child(
            XmlElement::new("hp:sz")
                .with_attr("width", total.to_string())
                .with_attr("widthRelTo", "ABSOLUTE")
                .with_attr("height", (row_count as u64 * 1000).to_string())
                .with_attr("heightRelTo", "ABSOLUTE")
                .with_attr("protect", "0"),
        )
        .with_child(
            XmlElement::new("hp:pos")
                .with_attr("treatAsChar", "0")
                .with_attr("affectLSpacing", "0")
                .with_attr("flowWithText", "1")
                .with_attr("allowOverlap", "0")
                .with_attr("holdAnchorAndSO", "0")
                .with_attr("vertRelTo", "PARA")
                .with_attr("horzRelTo", "COLUMN")
                .with_attr("vertAlign", "TOP")
                .with_attr("horzAlign", "LEFT")
                .with_attr("vertOffset", "0")
                .with_attr("horzOffset", "0"),
        )
        .with_child(
            XmlElement::new("hp:outMargin")
                .with_attr("left", "0")
                .with_attr("right", "0")
                .with_attr("top", "0")
                .with_attr("bottom", "1417"),
        )
        .with_child(
            XmlElement::new("hp:inMargin")
                .with_attr("left", "510")
                .with_attr("right", "510")
                .with_attr("top", "141")
                .with_attr("bottom", "141"),
        )
}

#[allow(clippy::too_many_arguments)]
fn cell_element(
    sub_list_id: u32,
    border_fill: u32,
    header: bool,
    col: usize,
    row: usize,
    colspan: usize,
    rowspan: usize,
    width: u64,
    content: Vec<XmlElement>,
) -> XmlElement {
    let mut sub_list = XmlElement::new("hp:subList")
        .with_attr("id", sub_list_id.to_string())
        .with_attr("textDirection", "HORIZONTAL")
        .with_attr("lineWrap", "BREAK")
        .with_attr("vertAlign", "TOP")
        .with_attr("linkListIDRef", "0")
        .with_attr("linkListNextIDRef", "0")
        .with_attr("textWidth", "0")
        .with_attr("textHeight", "0")
        .with_attr("hasTextRef", "0")
        .with_attr("hasNumRef", "0");
    for para in content {
        sub_list.add_child(para);
    }
    XmlElement::new("hp:tc")
        .with_attr("name", "")
        .with_attr("header", if header { "1" } else { "0" })
        .with_attr("hasMargin", "0")
        .with_attr("protect", "0")
        .with_attr("editable", "0")
        .with_attr("dirty", "0")
        .with_attr("borderFillIDRef", border_fill.to_string())
        .with_child(sub_list)
        .with_child(
            XmlElement::new("hp:cellAddr")
                .with_attr("colAddr", col.to_string())
                .with_attr("rowAddr", row.to_string()),
        )
        .with_child(
            XmlElement::new("hp:cellSpan")
                .with_attr("colSpan", colspan.to_string())
                .with_attr("rowSpan", rowspan.to_string()),
        )
        .with_child(
            XmlElement::new("hp:cellSz")
                .with_attr("width", width.to_string())
                .with_attr("height", (rowspan as u64 * 1000).to_string()),
        )
        .with_child(
            XmlElement::new("hp:cellMargin")
                .with_attr("left", "510")
                .with_attr("right", "510")
                .with_attr("top", "141")
                .with_attr("bottom", "141"),
        )
}

fn anchor_paragraph(style: StyleRef, tbl: XmlElement) -> XmlElement {
    XmlElement::new("hp:p")
        .with_attr("paraPrIDRef", style.para_pr.to_string())
        .with_attr("styleIDRef", style.style.to_string())
        .with_attr("pageBreak", "0")
        .with_attr("columnBreak", "0")
        .with_attr("merged", "0")
        .with_child(
            XmlElement::new("hp:run")
                .with_attr("charPrIDRef", style.char_pr.to_string())
                .with_child(tbl),
        )
}

fn row_band(row_index: usize, header_count: usize, body_count: usize) -> Band {
    if row_index < header_count {
        return Band::Header;
    }
    let body_index = row_index - header_count;
    if body_index == 0 {
        Band::Top
    } else if body_index + 1 == body_count {
        Band::Bottom
    } else {
        Band::Middle
    }
}

/// Column widths summing exactly to `total`.
///
/// All-equal columns split evenly with the remainder going to the first
/// columns. Weighted columns use largest-remainder rounding, ties broken
/// left to right.
fn column_widths(total: u64, table: &Table) -> Vec<u64> {
    let count = table.column_count();
    if count == 0 {
        return Vec::new();
    }
    let weighted = table.columns.len() == count && table.columns.iter().all(|c| c.weight.is_some());
    if weighted {
        let weights: Vec<u64> = table
            .columns
            .iter()
            .map(|c| u64::from(c.weight.unwrap_or(1)))
            .collect();
        weighted_widths(total, &weights)
    } else {
        equal_widths(total, count)
    }
}

fn equal_widths(total: u64, count: usize) -> Vec<u64> {
    let share = total / count as u64;
    let remainder = (total % count as u64) as usize;
    (0..count)
        .map(|index| if index < remainder { share + 1 } else { share })
        .collect()
}

fn weighted_widths(total: u64, weights: &[u64]) -> Vec<u64> {
    let sum: u64 = weights.iter().sum();
    if sum == 0 {
        return equal_widths(total, weights.len());
    }
    let mut widths = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (index, &weight) in weights.iter().enumerate() {
        let product = u128::from(total) * u128::from(weight);
        widths.push((product / u128::from(sum)) as u64);
        remainders.push((product % u128::from(sum), index));
    }
    let assigned: u64 = widths.iter().sum();
    let shortfall = (total - assigned) as usize;
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, index) in remainders.iter().take(shortfall) {
        widths[index] += 1;
    }
    widths
}
