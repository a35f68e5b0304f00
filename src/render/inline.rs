//! Inline rendering: AST inline nodes to `hp:run` sequences.

use crate::error::Result;
use crate::model::{FootnoteReference, Inline, Link};
use crate::template::{CharFormat, Script, StyleRef};
use crate::xml::{XmlElement, XmlNode};

use super::{block, image, Nesting, RenderContext};

/// Renders an inline sequence into runs, using `base` for the underlying
/// paragraph and character style.
pub fn render_inlines(
    ctx: &mut RenderContext,
    inlines: &[Inline],
    base: StyleRef,
    nesting: Nesting,
) -> Result<Vec<XmlElement>> {
    let mut collector = RunCollector::new();
    walk(
        ctx,
        &mut collector,
        inlines,
        base,
        &CharFormat::default(),
        nesting,
    )?;
    Ok(collector.finish())
}

/// Accumulates runs, merging consecutive text with the same character
/// property into a single `hp:t`.
struct RunCollector {
    runs: Vec<XmlElement>,
    char_pr: Option<u32>,
    pending: Vec<XmlNode>,
}

impl RunCollector {
    fn new() -> Self {
        Self {
            runs: Vec::new(),
            char_pr: None,
            pending: Vec::new(),
        }
    }

    fn text(&mut self, char_pr: u32, text: &str) {
        self.switch(char_pr);
        match self.pending.last_mut() {
            Some(XmlNode::Text(existing)) => existing.push_str(text),
            _ => self.pending.push(XmlNode::Text(text.to_string())),
        }
    }

    fn line_break(&mut self, char_pr: u32) {
        self.switch(char_pr);
        self.pending
            .push(XmlNode::Element(XmlElement::new("hp:lineBreak")));
    }

    /// Appends a run carrying non-text content (controls, pictures).
    fn push_run(&mut self, run: XmlElement) {
        self.flush();
        self.runs.push(run);
    }

    fn switch(&mut self, char_pr: u32) {
        if self.char_pr != Some(char_pr) {
            self.flush();
            self.char_pr = Some(char_pr);
        }
    }

    fn flush(&mut self) {
        if let Some(char_pr) = self.char_pr.take() {
            let mut text = XmlElement::new("hp:t");
            text.children = std::mem::take(&mut self.pending);
            self.runs.push(
                XmlElement::new("hp:run")
                    .with_attr("charPrIDRef", char_pr.to_string())
                    .with_child(text),
            );
        }
    }

    fn finish(mut self) -> Vec<XmlElement> {
        self.flush();
        self.runs
    }
}

fn walk(
    ctx: &mut RenderContext,
    collector: &mut RunCollector,
    inlines: &[Inline],
    base: StyleRef,
    format: &CharFormat,
    nesting: Nesting,
) -> Result<()> {
    for inline in inlines {
        match inline {
            Inline::Text(text) => {
                let char_pr = ctx.char_pr(base.char_pr, format);
                collector.text(char_pr, text);
            }
            Inline::Space => {
                let char_pr = ctx.char_pr(base.char_pr, format);
                collector.text(char_pr, " ");
            }
            Inline::LineBreak => {
                let char_pr = ctx.char_pr(base.char_pr, format);
                collector.line_break(char_pr);
            }
            Inline::Code(code) => {
                let char_pr = ctx.char_pr(base.char_pr, format);
                collector.text(char_pr, &code.text);
            }
            Inline::Strong(children) => {
                let mut format = format.clone();
                format.bold = true;
                walk(ctx, collector, children, base, &format, nesting)?;
            }
            Inline::Emphasis(children) => {
                let mut format = format.clone();
                format.italic = true;
                walk(ctx, collector, children, base, &format, nesting)?;
            }
            Inline::Underline(children) => {
                let mut format = format.clone();
                format.underline = true;
                walk(ctx, collector, children, base, &format, nesting)?;
            }
            Inline::Strikethrough(children) => {
                let mut format = format.clone();
                format.strikethrough = true;
                walk(ctx, collector, children, base, &format, nesting)?;
            }
            Inline::Superscript(children) => {
                let mut format = format.clone();
                format.script = Script::Superscript;
                walk(ctx, collector, children, base, &format, nesting)?;
            }
            Inline::Subscript(children) => {
                let mut format = format.clone();
                format.script = Script::Subscript;
                walk(ctx, collector, children, base, &format, nesting)?;
            }
            Inline::Link(link) => {
                render_link(ctx, collector, link, base, format, nesting)?;
            }
            Inline::InlineImage(img) => {
                let pic = image::render_pic(ctx, img)?;
                let char_pr = ctx.char_pr(base.char_pr, format);
                collector.push_run(
                    XmlElement::new("hp:run")
                        .with_attr("charPrIDRef", char_pr.to_string())
                        .with_child(pic),
                );
            }
            Inline::FootnoteReference(reference) => {
                render_footnote(ctx, collector, reference, base, format, nesting)?;
            }
        }
    }
    Ok(())
}

/// Emits a hyperlink field: a begin control, the styled link content, and
/// an end control sharing the begin's field id.
fn render_link(
    ctx: &mut RenderContext,
    collector: &mut RunCollector,
    link: &Link,
    base: StyleRef,
    format: &CharFormat,
    nesting: Nesting,
) -> Result<()> {
    let field_id = ctx.next_field_id();

    // A fixed link character property replaces derivation when configured.
    let (link_base, link_format) = match ctx.options.link_style_id {
        Some(id) => (StyleRef { char_pr: id, ..base }, format.clone()),
        None => {
            let mut format = format.clone();
            format.underline = true;
            format.color = Some(ctx.options.link_color.clone());
            (base, format)
        }
    };
    let marker_char = ctx.char_pr(link_base.char_pr, &link_format);

    let command = format!("{};1;5;-1;", escape_field_url(&link.url));
    let parameters = XmlElement::new("hp:parameters")
        .with_attr("cnt", "6")
        .with_attr("name", "")
        .with_child(
            XmlElement::new("hp:integerParam")
                .with_attr("name", "Prop")
                .with_text("0"),
        )
        .with_child(string_param("Command", &command))
        .with_child(string_param("Path", &link.url))
        .with_child(string_param("Category", "HWPHYPERLINK_TYPE_URL"))
        .with_child(string_param("TargetType", "HWPHYPERLINK_TARGET_HYPERLINK"))
        .with_child(string_param("DocOpenType", "HWPHYPERLINK_JUMP_DONTCARE"));
    let begin = XmlElement::new("hp:fieldBegin")
        .with_attr("id", field_id.to_string())
        .with_attr("type", "HYPERLINK")
        .with_attr("name", "")
        .with_attr("editable", "0")
        .with_attr("dirty", "1")
        .with_attr("zorder", "-1")
        .with_attr("fieldid", field_id.to_string())
        .with_attr("metaTag", "")
        .with_child(parameters);
    collector.push_run(ctrl_run(marker_char, begin));

    if link.children.is_empty() {
        collector.text(marker_char, &link.url);
    } else {
        walk(ctx, collector, &link.children, link_base, &link_format, nesting)?;
    }

    let end = XmlElement::new("hp:fieldEnd")
        .with_attr("beginIDRef", field_id.to_string())
        .with_attr("fieldid", field_id.to_string());
    collector.push_run(ctrl_run(marker_char, end));
    Ok(())
}

/// Emits a footnote control whose body holds the rendered footnote blocks.
/// A reference without a matching definition keeps its marker text visible.
fn render_footnote(
    ctx: &mut RenderContext,
    collector: &mut RunCollector,
    reference: &FootnoteReference,
    base: StyleRef,
    format: &CharFormat,
    nesting: Nesting,
) -> Result<()> {
    let char_pr = ctx.char_pr(base.char_pr, format);
    let Some(blocks) = ctx.footnote(&reference.id) else {
        collector.text(char_pr, &format!("[^{}]", reference.id));
        return Ok(());
    };

    let inner = nesting.into_box();
    ctx.check_depth(inner)?;
    let body = block::render_blocks(ctx, &blocks, inner)?;

    let inst_id = ctx.next_instance_id();
    let mut sub_list = XmlElement::new("hp:subList")
        .with_attr("id", inst_id.to_string())
        .with_attr("textDirection", "HORIZONTAL")
        .with_attr("lineWrap", "BREAK")
        .with_attr("vertAlign", "TOP")
        .with_attr("linkListIDRef", "0")
        .with_attr("linkListNextIDRef", "0")
        .with_attr("textWidth", "0")
        .with_attr("textHeight", "0")
        .with_attr("hasTextRef", "0")
        .with_attr("hasNumRef", "0");
    for para in body {
        sub_list.add_child(para);
    }
    let footnote = XmlElement::new("hp:footNote")
        .with_attr("number", "0")
        .with_attr("instId", inst_id.to_string())
        .with_child(
            XmlElement::new("hp:autoNum")
                .with_attr("num", "0")
                .with_attr("numType", "FOOTNOTE"),
        )
        .with_child(sub_list);
    collector.push_run(ctrl_run(char_pr, footnote));
    Ok(())
}

fn ctrl_run(char_pr: u32, control: XmlElement) -> XmlElement {
    XmlElement::new("hp:run")
        .with_attr("charPrIDRef", char_pr.to_string())
        .with_child(XmlElement::new("hp:ctrl").with_child(control))
}

fn string_param(name: &str, value: &str) -> XmlElement {
    XmlElement::new("hp:stringParam")
        .with_attr("name", name)
        .with_text(value)
}

/// Colons and question marks are backslash-escaped inside field commands.
fn escape_field_url(url: &str) -> String {
    let mut escaped = String::with_capacity(url.len() + 4);
    for ch in url.chars() {
        if ch == ':' || ch == '?' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
