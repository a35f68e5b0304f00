//! Block-level rendering.

use crate::error::Result;
use crate::model::{Block, CodeBlock, Header, Image, Inline};
use crate::template::{HeaderMode, StyleRef};
use crate::xml::{XmlElement, XmlNode};

use super::{image, inline, list, table, ListKind, Nesting, RenderContext};

/// Renders a block sequence into paragraphs.
pub(crate) fn render_blocks(
    ctx: &mut RenderContext,
    blocks: &[Block],
    nesting: Nesting,
) -> Result<Vec<XmlElement>> {
    let mut out = Vec::new();
    for block in blocks {
        render_block(ctx, block, nesting, &mut out)?;
    }
    Ok(out)
}

pub(crate) fn render_block(
    ctx: &mut RenderContext,
    block: &Block,
    nesting: Nesting,
    out: &mut Vec<XmlElement>,
) -> Result<()> {
    match block {
        Block::Header(header) => render_header(ctx, header, nesting, out),
        Block::Paragraph(content) => {
            let style = body_style(ctx, nesting);
            out.push(inline_paragraph(ctx, content, style, nesting, false)?);
            Ok(())
        }
        Block::CodeBlock(code) => {
            out.push(render_code_block(ctx, code, nesting)?);
            Ok(())
        }
        Block::BlockQuote(blocks) => {
            let nested = nesting.into_quote();
            ctx.check_depth(nested)?;
            for inner in blocks {
                render_block(ctx, inner, nested, out)?;
            }
            Ok(())
        }
        Block::HorizontalRule => {
            out.push(render_rule(ctx, nesting));
            Ok(())
        }
        Block::BulletList(bullets) => {
            list::render_list(ctx, ListKind::Bullet, 1, &bullets.items, nesting, out)
        }
        Block::OrderedList(ordered) => list::render_list(
            ctx,
            ListKind::Ordered,
            ordered.start,
            &ordered.items,
            nesting,
            out,
        ),
        Block::Table(tbl) => {
            out.push(table::render_table(ctx, tbl, nesting)?);
            Ok(())
        }
        Block::Image(img) => {
            out.push(render_image_block(ctx, img, nesting)?);
            Ok(())
        }
    }
}

fn render_header(
    ctx: &mut RenderContext,
    header: &Header,
    nesting: Nesting,
    out: &mut Vec<XmlElement>,
) -> Result<()> {
    let level = header.level.clamp(1, 9);
    let token = format!("H{level}");
    let style = ctx.style_map.resolve(&token);

    // A leading hard break asks for a column break on the heading paragraph.
    let (content, column_break) = match header.content.split_first() {
        Some((Inline::LineBreak, rest)) => (rest, true),
        _ => (&header.content[..], false),
    };

    match ctx.style_map.header_mode(level) {
        HeaderMode::Plain => {
            out.push(inline_paragraph(ctx, content, style, nesting, column_break)?);
        }
        HeaderMode::Prefix => {
            let mut inlines: Vec<Inline> = Vec::with_capacity(content.len() + 1);
            if let Some(prefix) = ctx.style_map.prefix(&token) {
                inlines.push(Inline::Text(prefix.to_string()));
            }
            inlines.extend_from_slice(content);
            out.push(inline_paragraph(ctx, &inlines, style, nesting, column_break)?);
        }
        HeaderMode::Table => {
            let para = inline_paragraph(ctx, content, style, nesting, false)?;
            let mut anchor = table::boxed_paragraphs(ctx, style, vec![para]);
            if column_break {
                anchor.set_attr("columnBreak", "1");
            }
            out.push(anchor);
        }
    }
    Ok(())
}

/// A code block is one paragraph; source line breaks become `hp:lineBreak`.
fn render_code_block(
    ctx: &mut RenderContext,
    code: &CodeBlock,
    nesting: Nesting,
) -> Result<XmlElement> {
    let style = body_style(ctx, nesting);
    let mut text = XmlElement::new("hp:t");
    for (index, line) in code.text.lines().enumerate() {
        if index > 0 {
            text.children
                .push(XmlNode::Element(XmlElement::new("hp:lineBreak")));
        }
        if !line.is_empty() {
            text.add_text(line);
        }
    }
    let run = XmlElement::new("hp:run")
        .with_attr("charPrIDRef", style.char_pr.to_string())
        .with_child(text);
    Ok(paragraph(style, false).with_child(run))
}

fn render_rule(ctx: &mut RenderContext, nesting: Nesting) -> XmlElement {
    let base = nesting
        .cell_style
        .unwrap_or_else(|| ctx.style_map.resolve("BODY"));
    let para_pr = ctx.rule_para_pr(base.para_pr);
    empty_paragraph(StyleRef { para_pr, ..base })
}

fn render_image_block(
    ctx: &mut RenderContext,
    img: &Image,
    nesting: Nesting,
) -> Result<XmlElement> {
    let style = body_style(ctx, nesting);
    let pic = image::render_pic(ctx, img)?;
    let run = XmlElement::new("hp:run")
        .with_attr("charPrIDRef", style.char_pr.to_string())
        .with_child(pic);
    Ok(paragraph(style, false).with_child(run))
}

/// Base style for body-level content at the current nesting: the enclosing
/// cell style inside tables, `BODY` otherwise, with the quote indent
/// applied per quote level.
fn body_style(ctx: &mut RenderContext, nesting: Nesting) -> StyleRef {
    let base = nesting
        .cell_style
        .unwrap_or_else(|| ctx.style_map.resolve("BODY"));
    if nesting.quote > 0 {
        let para_pr = ctx.quote_para_pr(base.para_pr, nesting.quote);
        StyleRef { para_pr, ..base }
    } else {
        base
    }
}

/// Renders inline content into a paragraph, keeping an empty run when the
/// content produces none so the paragraph stays well-formed.
pub(crate) fn inline_paragraph(
    ctx: &mut RenderContext,
    content: &[Inline],
    style: StyleRef,
    nesting: Nesting,
    column_break: bool,
) -> Result<XmlElement> {
    let runs = inline::render_inlines(ctx, content, style, nesting)?;
    let mut para = paragraph(style, column_break);
    if runs.is_empty() {
        para.add_child(
            XmlElement::new("hp:run").with_attr("charPrIDRef", style.char_pr.to_string()),
        );
    } else {
        for run in runs {
            para.add_child(run);
        }
    }
    Ok(para)
}

pub(crate) fn empty_paragraph(style: StyleRef) -> XmlElement {
    paragraph(style, false)
        .with_child(XmlElement::new("hp:run").with_attr("charPrIDRef", style.char_pr.to_string()))
}

fn paragraph(style: StyleRef, column_break: bool) -> XmlElement {
    XmlElement::new("hp:p")
        .with_attr("paraPrIDRef", style.para_pr.to_string())
        .with_attr("styleIDRef", style.style.to_string())
        .with_attr("pageBreak", "0")
        .with_attr("columnBreak", if column_break { "1" } else { "0" })
        .with_attr("merged", "0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvertOptions;
    use crate::error::Error;
    use crate::model::Document;
    use crate::template::{blank, Template};

    fn context<'a>(
        template: &'a Template,
        options: &'a ConvertOptions,
    ) -> RenderContext<'a> {
        RenderContext::new(template, options, Box::leak(Box::new(Document::default())))
    }

    fn render_one(ctx: &mut RenderContext, block: Block) -> Result<Vec<XmlElement>> {
        render_blocks(ctx, &[block], Nesting::default())
    }

    /// A builtin package whose section is replaced wholesale, for driving
    /// the placeholder-dependent paths.
    fn template_with_section(body: &str) -> Template {
        let xml = format!(
            concat!(
                r#"<hs:sec xmlns:hs="http://www.hancom.co.kr/hwpml/2011/section" "#,
                r#"xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph" "#,
                r#"xmlns:hc="http://www.hancom.co.kr/hwpml/2011/core">{}</hs:sec>"#
            ),
            body
        );
        let mut entries = blank::entries();
        for entry in &mut entries {
            if entry.0 == "Contents/section0.xml" {
                entry.1 = xml.into_bytes();
                break;
            }
        }
        Template::from_entries(entries).unwrap()
    }

    #[test]
    fn test_paragraph_uses_body_style() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);
        let body = ctx.style_map.resolve("BODY");

        let out = render_one(&mut ctx, Block::paragraph("hello")).unwrap();
        assert_eq!(out.len(), 1);
        let para = &out[0];
        assert_eq!(para.attr("paraPrIDRef"), Some(body.para_pr.to_string().as_str()));
        assert_eq!(para.attr("pageBreak"), Some("0"));
        assert_eq!(para.attr("merged"), Some("0"));
        assert_eq!(para.descendant("hp:t").unwrap().text(), "hello");
    }

    #[test]
    fn test_header_uses_level_style() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);
        let h1 = ctx.style_map.resolve("H1");

        let out = render_one(&mut ctx, Block::header(1, "Title")).unwrap();
        assert_eq!(
            out[0].attr("paraPrIDRef"),
            Some(h1.para_pr.to_string().as_str())
        );
        assert_eq!(
            out[0].attr("styleIDRef"),
            Some(h1.style.to_string().as_str())
        );
    }

    #[test]
    fn test_missing_header_level_falls_back_to_default() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);
        let fallback = ctx.style_map.default_ref();

        let out = render_one(&mut ctx, Block::header(5, "Deep")).unwrap();
        assert_eq!(
            out[0].attr("paraPrIDRef"),
            Some(fallback.para_pr.to_string().as_str())
        );
    }

    #[test]
    fn test_leading_line_break_becomes_column_break() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);

        let out = render_one(
            &mut ctx,
            Block::Header(crate::model::Header {
                level: 1,
                content: vec![Inline::LineBreak, Inline::text("Title")],
            }),
        )
        .unwrap();
        assert_eq!(out[0].attr("columnBreak"), Some("1"));
        // The break itself is consumed, not rendered.
        assert!(out[0].descendant("hp:lineBreak").is_none());
        assert_eq!(out[0].descendant("hp:t").unwrap().text(), "Title");
    }

    #[test]
    fn test_header_prefix_mode_prepends_literal() {
        let template = template_with_section(concat!(
            r#"<hp:p paraPrIDRef="0" styleIDRef="0"><hp:run charPrIDRef="0"><hp:t>BODY</hp:t></hp:run></hp:p>"#,
            r#"<hp:p paraPrIDRef="2" styleIDRef="2"><hp:run charPrIDRef="2"><hp:t>Chapter H2</hp:t></hp:run></hp:p>"#,
        ));
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);

        let out = render_one(&mut ctx, Block::header(2, "Intro")).unwrap();
        assert_eq!(out[0].descendant("hp:t").unwrap().text(), "Chapter Intro");
    }

    #[test]
    fn test_header_table_mode_boxes_heading() {
        let template = template_with_section(concat!(
            r#"<hp:p paraPrIDRef="0" styleIDRef="0"><hp:run charPrIDRef="0">"#,
            r#"<hp:tbl rowCnt="1" colCnt="1"><hp:tr><hp:tc><hp:subList>"#,
            r#"<hp:p paraPrIDRef="1" styleIDRef="1"><hp:run charPrIDRef="1"><hp:t>H1</hp:t></hp:run></hp:p>"#,
            r#"</hp:subList></hp:tc></hp:tr></hp:tbl>"#,
            r#"</hp:run></hp:p>"#,
        ));
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);

        let out = render_one(&mut ctx, Block::header(1, "Boxed")).unwrap();
        assert_eq!(out.len(), 1);
        let tbl = out[0].child("hp:run").unwrap().child("hp:tbl").unwrap();
        assert_eq!(tbl.attr("rowCnt"), Some("1"));
        assert_eq!(tbl.descendant("hp:t").unwrap().text(), "Boxed");
    }

    #[test]
    fn test_code_block_preserves_line_breaks() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);

        let out = render_one(
            &mut ctx,
            Block::CodeBlock(CodeBlock {
                text: "fn main() {\n    body\n}\n".to_string(),
                language: Some("rust".to_string()),
            }),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        let text = out[0].descendant("hp:t").unwrap();
        let breaks = text
            .children
            .iter()
            .filter(|node| matches!(node, XmlNode::Element(el) if el.name == "hp:lineBreak"))
            .count();
        assert_eq!(breaks, 2);
        assert_eq!(text.text(), "fn main() {    body}");
    }

    #[test]
    fn test_block_quote_indents_per_level() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);
        let body_para_pr = ctx.style_map.resolve("BODY").para_pr;

        let out = render_one(
            &mut ctx,
            Block::BlockQuote(vec![
                Block::paragraph("level one"),
                Block::BlockQuote(vec![Block::paragraph("level two")]),
            ]),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_ne!(
            out[0].attr("paraPrIDRef"),
            Some(body_para_pr.to_string().as_str())
        );
        assert_ne!(out[0].attr("paraPrIDRef"), out[1].attr("paraPrIDRef"));
    }

    #[test]
    fn test_quote_depth_limit() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default().with_max_nesting_depth(2);
        let mut ctx = context(&template, &options);

        let nested = Block::BlockQuote(vec![Block::BlockQuote(vec![Block::BlockQuote(vec![
            Block::paragraph("too deep"),
        ])])]);
        let err = render_one(&mut ctx, nested).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_horizontal_rule_is_empty_bordered_paragraph() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);
        let body_para_pr = ctx.style_map.resolve("BODY").para_pr;

        let out = render_one(&mut ctx, Block::HorizontalRule).unwrap();
        assert_eq!(out.len(), 1);
        assert_ne!(
            out[0].attr("paraPrIDRef"),
            Some(body_para_pr.to_string().as_str())
        );
        let run = out[0].child("hp:run").unwrap();
        assert!(run.children.is_empty());
    }

    #[test]
    fn test_unreadable_image_is_image_error() {
        let template = Template::builtin().unwrap();
        let options = ConvertOptions::default();
        let mut ctx = context(&template, &options);

        let err = render_one(&mut ctx, Block::Image(Image::new("missing.png"))).unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }
}
