//! Reference package loading.
//!
//! A reference package is itself a valid HWPX archive. Loading one means
//! reading its entries, parsing the style part, scanning the section body
//! for style placeholders, and capturing the page setup elements that must
//! survive into the generated section.

pub mod blank;
pub mod resolver;
pub mod styles;

pub use resolver::{HeaderMode, PageLayout, StyleMap, StyleRef, TOKENS};
pub use styles::{CharFormat, Script, StylePart};

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::config::ConvertOptions;
use crate::error::{Error, Result};
use crate::xml::XmlElement;

/// Archive name of the style part.
pub const HEADER_PART: &str = "Contents/header.xml";
/// Archive name of the section body part.
pub const SECTION_PART: &str = "Contents/section0.xml";
/// Archive name of the package manifest part.
pub const MANIFEST_PART: &str = "Contents/content.hpf";

/// A loaded reference package.
///
/// Holds the raw archive entries (so untouched parts can be copied through
/// verbatim) alongside the parsed style part, the resolved placeholder map,
/// and the page setup captured from the first paragraph of the section.
#[derive(Debug, Clone)]
pub struct Template {
    entries: Vec<(String, Vec<u8>)>,
    styles: StylePart,
    section_source: String,
    content_hpf: String,
    page_setup: Vec<XmlElement>,
    style_map: StyleMap,
    page: PageLayout,
}

impl Template {
    /// Loads the built-in blank package.
    pub fn builtin() -> Result<Self> {
        Self::from_entries(blank::entries())
    }

    /// Loads a reference package from disk.
    ///
    /// The file size is checked against [`ConvertOptions::max_template_file_size`]
    /// before any bytes are read.
    pub fn from_path(path: &Path, options: &ConvertOptions) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        if metadata.len() > options.max_template_file_size {
            return Err(Error::Security(format!(
                "reference package {} exceeds the size limit of {} bytes",
                path.display(),
                options.max_template_file_size
            )));
        }
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Loads a reference package from in-memory archive bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Template(format!("not a valid package archive: {e}")))?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push((file.name().to_string(), data));
        }
        Self::from_entries(entries)
    }

    pub(crate) fn from_entries(entries: Vec<(String, Vec<u8>)>) -> Result<Self> {
        let header_source = part_utf8(&entries, HEADER_PART)?;
        let section_source = part_utf8(&entries, SECTION_PART)?;
        let content_hpf = part_utf8(&entries, MANIFEST_PART)?;

        let styles = StylePart::parse(&header_source)?;
        let section = XmlElement::parse(&section_source)?;
        let (style_map, page) = resolver::resolve_styles(&section, &styles)?;
        let page_setup = capture_page_setup(&section);

        Ok(Template {
            entries,
            styles,
            section_source,
            content_hpf,
            page_setup,
            style_map,
            page,
        })
    }

    /// The parsed style part. Callers clone this for per-conversion mutation.
    pub fn styles(&self) -> &StylePart {
        &self.styles
    }

    /// Placeholder-to-style mapping resolved from the section body.
    pub fn style_map(&self) -> &StyleMap {
        &self.style_map
    }

    /// Page geometry, from the template's own page setup when present.
    pub fn page(&self) -> PageLayout {
        self.page
    }

    /// Raw text of the section part, used for splicing the generated body.
    pub fn section_source(&self) -> &str {
        &self.section_source
    }

    /// Raw text of the package manifest part.
    pub fn manifest_source(&self) -> &str {
        &self.content_hpf
    }

    /// Section and column setup elements captured from the template's first
    /// paragraph. These are re-injected into the first generated paragraph.
    pub fn page_setup(&self) -> &[XmlElement] {
        &self.page_setup
    }

    /// All archive entries in their original order.
    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }
}

fn part_utf8(entries: &[(String, Vec<u8>)], name: &str) -> Result<String> {
    let data = entries
        .iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, data)| data.clone())
        .ok_or_else(|| Error::Template(format!("reference package is missing {name}")))?;
    String::from_utf8(data).map_err(|_| Error::Template(format!("{name} is not valid UTF-8")))
}

/// Collects the page setup elements from the first paragraph's first run.
///
/// Every HWPX section opens with a paragraph whose first run carries the
/// `hp:secPr` (page geometry) and `hp:ctrl` (column setup) elements. They
/// belong to the document shell, not the discarded placeholder content.
fn capture_page_setup(section: &XmlElement) -> Vec<XmlElement> {
    let Some(para) = section.descendant("hp:p") else {
        return Vec::new();
    };
    let Some(run) = para.child("hp:run") else {
        return Vec::new();
    };
    run.elements()
        .filter(|el| el.name.ends_with("secPr") || el.name.ends_with("ctrl"))
        .cloned()
        .collect()
}
