//! # md2hwpx
//!
//! Converts structured document ASTs into HWPX packages.
//!
//! The input is a JSON document tree (headings, paragraphs, tables, lists,
//! images, footnotes); the output is a complete `.hwpx` archive that opens
//! in Hangul word processors. Styles and page geometry come from a built-in
//! blank package or from a caller-supplied reference package.
//!
//! ## Quick Start
//!
//! ```no_run
//! use md2hwpx::convert_file;
//!
//! fn main() -> md2hwpx::Result<()> {
//!     // Read a document AST and write the HWPX package
//!     convert_file("document.json", "document.hwpx")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Full block coverage**: Headings, paragraphs, tables, lists, quotes, code
//! - **Inline formatting**: Emphasis, links, footnotes, inline code, images
//! - **Reference packages**: Styles and page setup taken from an existing `.hwpx`
//! - **Deterministic output**: Identical input produces identical bytes
//! - **Resource limits**: File size, image count, and nesting depth caps

pub mod config;
pub mod error;
pub mod model;
pub mod package;
pub mod render;
pub mod template;
pub mod xml;

// Re-export commonly used types
pub use config::ConvertOptions;
pub use error::{Error, Result};
pub use model::{
    Alignment, Block, BulletList, CodeBlock, CodeSpan, ColumnSpec, Document, FootnoteReference,
    Header, Image, Inline, Link, OrderedList, Table, TableCell, TableRow,
};
pub use render::{ImageRegistry, RenderContext};
pub use template::{HeaderMode, PageLayout, StyleMap, Template};

use std::fs;
use std::path::{Path, PathBuf};

use crate::xml::XmlElement;

/// Convert a document AST file into an HWPX package file.
///
/// # Arguments
///
/// * `input` - Path to the JSON document AST
/// * `output` - Path for the generated `.hwpx` package
///
/// # Example
///
/// ```no_run
/// use md2hwpx::convert_file;
///
/// convert_file("document.json", "document.hwpx").unwrap();
/// ```
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<()> {
    convert_file_with_options(input, output, &ConvertOptions::default())
}

/// Convert a document AST file with custom options.
///
/// # Arguments
///
/// * `input` - Path to the JSON document AST
/// * `output` - Path for the generated `.hwpx` package
/// * `options` - Conversion options
///
/// # Example
///
/// ```no_run
/// use md2hwpx::{convert_file_with_options, ConvertOptions};
///
/// let options = ConvertOptions::new().with_max_nesting_depth(6);
/// convert_file_with_options("document.json", "out.hwpx", &options).unwrap();
/// ```
pub fn convert_file_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &ConvertOptions,
) -> Result<()> {
    let input = input.as_ref();
    let metadata = fs::metadata(input)?;
    if metadata.len() > options.max_input_file_size {
        return Err(Error::Security(format!(
            "input file {} exceeds the {} byte limit",
            input.display(),
            options.max_input_file_size
        )));
    }
    let json = fs::read_to_string(input)?;
    let bytes = convert_json(&json, options)?;
    package::write_package_file(output.as_ref(), &bytes)
}

/// Convert a JSON document AST into HWPX package bytes.
///
/// # Arguments
///
/// * `json` - The document AST as a JSON string
/// * `options` - Conversion options
///
/// # Example
///
/// ```no_run
/// use md2hwpx::{convert_json, ConvertOptions};
///
/// let json = std::fs::read_to_string("document.json").unwrap();
/// let bytes = convert_json(&json, &ConvertOptions::default()).unwrap();
/// std::fs::write("document.hwpx", bytes).unwrap();
/// ```
pub fn convert_json(json: &str, options: &ConvertOptions) -> Result<Vec<u8>> {
    let document = Document::from_json(json)?;
    convert_document(&document, options)
}

/// Convert an in-memory document into HWPX package bytes using the
/// built-in blank package.
///
/// # Example
///
/// ```
/// use md2hwpx::{convert_document, Block, ConvertOptions, Document, Inline};
///
/// let document = Document::with_blocks(vec![Block::Paragraph(vec![
///     Inline::Text("Hello".to_string()),
/// ])]);
/// let bytes = convert_document(&document, &ConvertOptions::default()).unwrap();
/// assert!(bytes.starts_with(b"PK"));
/// ```
pub fn convert_document(document: &Document, options: &ConvertOptions) -> Result<Vec<u8>> {
    let template = Template::builtin()?;
    convert_with_template(&template, document, options, None)
}

/// Builder for converting documents with a reference package or a fixed
/// output title.
///
/// # Example
///
/// ```no_run
/// use md2hwpx::{Document, Md2Hwpx};
///
/// let document = Document::new();
/// let bytes = Md2Hwpx::new()
///     .with_reference_doc("styles.hwpx")
///     .with_title("Quarterly Report")
///     .convert(&document)?;
/// # Ok::<(), md2hwpx::Error>(())
/// ```
pub struct Md2Hwpx {
    options: ConvertOptions,
    reference: Option<PathBuf>,
    title: Option<String>,
}

impl Md2Hwpx {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            options: ConvertOptions::default(),
            reference: None,
            title: None,
        }
    }

    /// Replace the conversion options.
    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    /// Take styles and page setup from an existing `.hwpx` package.
    pub fn with_reference_doc(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference = Some(path.into());
        self
    }

    /// Override the package title, regardless of the document's own title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Convert an in-memory document into package bytes.
    pub fn convert(&self, document: &Document) -> Result<Vec<u8>> {
        let template = self.load_template()?;
        convert_with_template(&template, document, &self.options, self.title.as_deref())
    }

    /// Convert a JSON document AST into package bytes.
    pub fn convert_json(&self, json: &str) -> Result<Vec<u8>> {
        let document = Document::from_json(json)?;
        self.convert(&document)
    }

    /// Convert a document AST file into an HWPX package file.
    pub fn convert_file(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<()> {
        let input = input.as_ref();
        let metadata = fs::metadata(input)?;
        if metadata.len() > self.options.max_input_file_size {
            return Err(Error::Security(format!(
                "input file {} exceeds the {} byte limit",
                input.display(),
                self.options.max_input_file_size
            )));
        }
        let json = fs::read_to_string(input)?;
        let bytes = self.convert_json(&json)?;
        package::write_package_file(output.as_ref(), &bytes)
    }

    fn load_template(&self) -> Result<Template> {
        match &self.reference {
            Some(path) => Template::from_path(path, &self.options),
            None => Template::builtin(),
        }
    }
}

impl Default for Md2Hwpx {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_with_template(
    template: &Template,
    document: &Document,
    options: &ConvertOptions,
    title: Option<&str>,
) -> Result<Vec<u8>> {
    let mut ctx = RenderContext::new(template, options, document);
    let mut paragraphs = render::render_document(&mut ctx, document)?;
    attach_page_setup(template, &mut paragraphs);
    log::debug!(
        "rendered {} paragraphs, {} embedded images",
        paragraphs.len(),
        ctx.images.len()
    );
    let title = title.or(document.title.as_deref());
    package::build_package(template, &mut ctx.styles, &paragraphs, &ctx.images, title)
}

/// Moves the reference package's section setup elements into the first
/// generated paragraph's first run. Viewers read page geometry from there,
/// so a section body without them falls back to viewer defaults.
fn attach_page_setup(template: &Template, paragraphs: &mut [XmlElement]) {
    let setup = template.page_setup();
    if setup.is_empty() {
        return;
    }
    let Some(first) = paragraphs.first_mut() else {
        return;
    };
    let Some(run) = first.child_mut("hp:run") else {
        return;
    };
    for (index, element) in setup.iter().enumerate() {
        run.insert_child(index, element.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_document() -> Document {
        Document::with_blocks(vec![
            Block::Header(model::Header {
                level: 1,
                content: vec![Inline::Text("Title".to_string())],
            }),
            Block::Paragraph(vec![
                Inline::Text("Hello".to_string()),
                Inline::Space,
                Inline::Strong(vec![Inline::Text("world".to_string())]),
            ]),
        ])
    }

    fn open_archive(bytes: &[u8]) -> zip::ZipArchive<std::io::Cursor<&[u8]>> {
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = open_archive(bytes);
        let mut entry = archive.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    // ==================== Builder Pattern Tests ====================

    #[test]
    fn test_builder_state() {
        let builder = Md2Hwpx::new()
            .with_reference_doc("styles.hwpx")
            .with_title("Report")
            .with_options(ConvertOptions::new().with_max_nesting_depth(4));

        assert_eq!(builder.reference, Some(PathBuf::from("styles.hwpx")));
        assert_eq!(builder.title, Some("Report".to_string()));
        assert_eq!(builder.options.max_nesting_depth, 4);
    }

    #[test]
    fn test_builder_default() {
        let builder = Md2Hwpx::default();
        assert!(builder.reference.is_none());
        assert!(builder.title.is_none());
    }

    #[test]
    fn test_builder_missing_reference_fails() {
        let result = Md2Hwpx::new()
            .with_reference_doc("/no/such/package.hwpx")
            .convert(&Document::new());
        assert!(result.is_err());
    }

    // ==================== Conversion Tests ====================

    #[test]
    fn test_convert_document_produces_archive() {
        let bytes = convert_document(&sample_document(), &ConvertOptions::default()).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let mut archive = open_archive(&bytes);
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names[0], "mimetype");
        assert!(names.iter().any(|n| n == "Contents/header.xml"));
        assert!(names.iter().any(|n| n == "Contents/section0.xml"));
        assert!(names.iter().any(|n| n == "Contents/content.hpf"));
    }

    #[test]
    fn test_convert_empty_document() {
        let bytes = convert_document(&Document::new(), &ConvertOptions::default()).unwrap();
        let section = read_entry(&bytes, "Contents/section0.xml");
        assert!(section.contains("<hp:p"));
    }

    #[test]
    fn test_convert_is_deterministic() {
        let document = sample_document();
        let options = ConvertOptions::default();
        let first = convert_document(&document, &options).unwrap();
        let second = convert_document(&document, &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_section_carries_page_setup() {
        let bytes = convert_document(&sample_document(), &ConvertOptions::default()).unwrap();
        let section = read_entry(&bytes, "Contents/section0.xml");
        assert!(section.contains("<hp:secPr"));
        assert!(section.contains("Hello"));
    }

    #[test]
    fn test_document_title_reaches_manifest() {
        let document = Document::new().titled("My Document");
        let bytes = convert_document(&document, &ConvertOptions::default()).unwrap();
        let manifest = read_entry(&bytes, "Contents/content.hpf");
        assert!(manifest.contains("<opf:title>My Document</opf:title>"));
    }

    #[test]
    fn test_builder_title_overrides_document_title() {
        let document = Document::new().titled("Original");
        let bytes = Md2Hwpx::new()
            .with_title("Override")
            .convert(&document)
            .unwrap();
        let manifest = read_entry(&bytes, "Contents/content.hpf");
        assert!(manifest.contains("<opf:title>Override</opf:title>"));
        assert!(!manifest.contains("Original"));
    }

    #[test]
    fn test_convert_json_invalid_input() {
        let result = convert_json("not json", &ConvertOptions::default());
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_convert_json_round_trip() {
        let json = sample_document().to_json().unwrap();
        let bytes = convert_json(&json, &ConvertOptions::default()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
