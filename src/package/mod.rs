//! Output package assembly.
//!
//! The output archive mirrors the reference package: every entry is copied
//! through in its original order, with the style part, section body, and
//! manifest replaced by their regenerated versions and the registered
//! images appended under `BinData/`. The `mimetype` entry is always written
//! first and uncompressed. Entry order and timestamps are fixed, so
//! identical input produces identical output bytes.

use std::io::{Cursor, Write};
use std::path::Path;

use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::render::ImageRegistry;
use crate::template::styles::StylePart;
use crate::template::{blank, Template, HEADER_PART, MANIFEST_PART, SECTION_PART};
use crate::xml::XmlElement;

/// Assembles the output archive in memory.
pub fn build_package(
    template: &Template,
    styles: &mut StylePart,
    paragraphs: &[XmlElement],
    images: &ImageRegistry,
    title: Option<&str>,
) -> Result<Vec<u8>> {
    styles.refresh_item_counts();
    let header_xml = styles.serialize()?;

    let mut body_parts = Vec::with_capacity(paragraphs.len());
    for paragraph in paragraphs {
        body_parts.push(paragraph.serialize()?);
    }
    let section_xml = splice_section(template.section_source(), &body_parts.join("\n"))?;
    let manifest_xml = rewrite_manifest(template.manifest_source(), title, images);

    let stored = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(zip::DateTime::default());
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mimetype: &[u8] = template
        .entries()
        .iter()
        .find(|(name, _)| name == "mimetype")
        .map(|(_, data)| data.as_slice())
        .unwrap_or(blank::MIMETYPE.as_bytes());
    writer.start_file("mimetype", stored)?;
    writer.write_all(mimetype)?;

    for (name, data) in template.entries() {
        if name == "mimetype" {
            continue;
        }
        let content: &[u8] = match name.as_str() {
            HEADER_PART => header_xml.as_bytes(),
            SECTION_PART => section_xml.as_bytes(),
            MANIFEST_PART => manifest_xml.as_bytes(),
            _ => data,
        };
        writer.start_file(name.as_str(), deflated)?;
        writer.write_all(content)?;
    }

    for image in images.iter() {
        writer.start_file(image.archive_name(), deflated)?;
        writer.write_all(&image.data)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Writes the archive to disk via a sibling temporary file, so a failed
/// conversion never leaves a partial package behind.
pub fn write_package_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Replaces everything between the section's opening and closing tags with
/// the generated body, keeping the original prologue and root attributes.
/// The paragraph and core namespaces are declared on the root if the
/// template did not already do so.
fn splice_section(source: &str, body: &str) -> Result<String> {
    let sec_start = source
        .find("<hs:sec")
        .ok_or_else(|| Error::Template("section part has no <hs:sec> element".to_string()))?;
    let tag_close = source[sec_start..]
        .find('>')
        .map(|offset| sec_start + offset)
        .ok_or_else(|| Error::Template("section part has an unterminated <hs:sec> tag".to_string()))?;
    let sec_end = source
        .rfind("</hs:sec>")
        .ok_or_else(|| Error::Template("section part has no closing </hs:sec> tag".to_string()))?;

    let mut prefix = source[..=tag_close].to_string();
    if !prefix.contains("xmlns:hc=") {
        declare_namespace(
            &mut prefix,
            "xmlns:hc=\"http://www.hancom.co.kr/hwpml/2011/core\"",
        );
    }
    if !prefix.contains("xmlns:hp=") {
        declare_namespace(
            &mut prefix,
            "xmlns:hp=\"http://www.hancom.co.kr/hwpml/2011/paragraph\"",
        );
    }
    let suffix = &source[sec_end..];
    Ok(format!("{prefix}\n{body}\n{suffix}"))
}

fn declare_namespace(prefix: &mut String, declaration: &str) {
    prefix.truncate(prefix.len() - 1);
    prefix.push(' ');
    prefix.push_str(declaration);
    prefix.push('>');
}

/// Rewrites the package manifest: the title element is replaced when a
/// title is given, and one item entry is appended per registered image.
fn rewrite_manifest(source: &str, title: Option<&str>, images: &ImageRegistry) -> String {
    let mut manifest = source.to_string();

    if let Some(title) = title {
        let pattern = Regex::new(r"<opf:title>.*?</opf:title>").unwrap();
        let replacement = format!(
            "<opf:title>{}</opf:title>",
            quick_xml::escape::escape(title)
        );
        manifest = pattern
            .replace(&manifest, regex::NoExpand(&replacement))
            .into_owned();
    }

    if !images.is_empty() {
        let items: Vec<String> = images
            .iter()
            .map(|image| {
                format!(
                    r#"<opf:item id="{}" href="{}" media-type="{}" isEmbeded="1"/>"#,
                    image.id,
                    image.archive_name(),
                    image.media_type
                )
            })
            .collect();
        if let Some(position) = manifest.find("</opf:manifest>") {
            manifest.insert_str(position, &format!("{}\n", items.join("\n")));
        }
    }

    manifest
}
