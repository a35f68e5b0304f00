//! Image validation, sizing, and embedding.

use std::fs;
use std::path::PathBuf;

use ::image::GenericImageView;

use crate::config::ConvertOptions;
use crate::error::{Error, Result};
use crate::model::Image;
use crate::xml::XmlElement;

use super::RenderContext;

/// HWP units per millimeter.
const LUNIT_PER_MM: f64 = 283.465;
/// HWP units per pixel at the 96 dpi the AST producer assumes.
const LUNIT_PER_PX: f64 = 25.4 * LUNIT_PER_MM / 96.0;

/// An image accepted for embedding.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Binary item id, referenced from the body and the manifest.
    pub id: String,
    /// File extension used for the archive entry name.
    pub extension: &'static str,
    /// Manifest media type.
    pub media_type: &'static str,
    /// Raw image bytes, written verbatim into the binary-assets folder.
    pub data: Vec<u8>,
}

impl EmbeddedImage {
    /// Archive entry name for this image.
    pub fn archive_name(&self) -> String {
        format!("BinData/{}.{}", self.id, self.extension)
    }
}

/// All images registered during one conversion, in registration order.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: Vec<EmbeddedImage>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmbeddedImage> {
        self.images.iter()
    }
}

/// Dimensions and identity of a registered image.
#[derive(Debug)]
pub(crate) struct RegisteredImage {
    pub binary_ref: String,
    pub width: u64,
    pub height: u64,
}

/// Renders an `hp:pic` element, registering the image bytes on the way.
pub fn render_pic(ctx: &mut RenderContext, image: &Image) -> Result<XmlElement> {
    let percent_base = u64::from(ctx.page.text_width());
    let registered = register(&mut ctx.images, ctx.options, percent_base, image)?;
    let pic_id = ctx.next_object_id();
    let inst_id = ctx.next_instance_id();
    Ok(pic_element(&registered, pic_id, inst_id))
}

/// Validates, reads, decodes, and registers an image reference.
///
/// Path checks run before any filesystem access; the count and size limits
/// are enforced before the bytes are decoded.
pub(crate) fn register(
    registry: &mut ImageRegistry,
    options: &ConvertOptions,
    percent_base: u64,
    image: &Image,
) -> Result<RegisteredImage> {
    validate_source(&image.source)?;
    if registry.len() >= options.max_image_count {
        return Err(Error::Security(format!(
            "image count exceeds the configured maximum of {}",
            options.max_image_count
        )));
    }

    let path = match &options.resource_dir {
        Some(dir) => dir.join(&image.source),
        None => PathBuf::from(&image.source),
    };
    let metadata = fs::metadata(&path)
        .map_err(|e| Error::Image(format!("cannot read image {}: {e}", image.source)))?;
    if metadata.len() > options.max_input_file_size {
        return Err(Error::Security(format!(
            "image {} exceeds the size limit of {} bytes",
            image.source, options.max_input_file_size
        )));
    }
    let data = fs::read(&path)
        .map_err(|e| Error::Image(format!("cannot read image {}: {e}", image.source)))?;
    let decoded = ::image::load_from_memory(&data)
        .map_err(|e| Error::Image(format!("cannot decode image {}: {e}", image.source)))?;
    let (px_width, px_height) = decoded.dimensions();

    let declared_width = image
        .width
        .as_deref()
        .and_then(|v| parse_dimension(v, percent_base));
    let declared_height = image
        .height
        .as_deref()
        .and_then(|v| parse_dimension(v, percent_base));
    let (width, height) = display_size(
        declared_width,
        declared_height,
        px_width,
        px_height,
        options.max_image_width,
        options.max_image_height,
    );

    let (extension, media_type) = extension_for(&image.source);
    let id = format!("img{}", registry.len() + 1);
    registry.images.push(EmbeddedImage {
        id: id.clone(),
        extension,
        media_type,
        data,
    });
    Ok(RegisteredImage {
        binary_ref: id,
        width,
        height,
    })
}

/// Rejects absolute paths and parent-directory traversal, in both separator
/// conventions.
fn validate_source(source: &str) -> Result<()> {
    if source.starts_with('/') || source.starts_with('\\') || is_windows_absolute(source) {
        return Err(Error::Security(format!(
            "absolute image path rejected: {source}"
        )));
    }
    if source.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(Error::Security(format!(
            "image path traversal rejected: {source}"
        )));
    }
    Ok(())
}

fn is_windows_absolute(source: &str) -> bool {
    let bytes = source.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn extension_for(source: &str) -> (&'static str, &'static str) {
    let lower = source.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        ("jpg", "image/jpeg")
    } else if lower.ends_with(".gif") {
        ("gif", "image/gif")
    } else if lower.ends_with(".bmp") {
        ("bmp", "image/bmp")
    } else {
        ("png", "image/png")
    }
}

/// Parses a declared dimension into HWP units.
///
/// A bare number is pixels; `%` is relative to `percent_base` (the page text
/// width). Unknown unit suffixes fall back to pixels.
fn parse_dimension(value: &str, percent_base: u64) -> Option<u64> {
    let s = value.trim().to_ascii_lowercase();
    let number_end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(number_end);
    let number: f64 = number.parse().ok()?;
    if unit == "%" {
        return Some((number / 100.0 * percent_base as f64) as u64);
    }
    let mm = match unit {
        "" | "px" => number * (25.4 / 96.0),
        "in" => number * 25.4,
        "cm" => number * 10.0,
        "mm" => number,
        "pt" => number * (25.4 / 72.0),
        _ => number * (25.4 / 96.0),
    };
    Some((mm * LUNIT_PER_MM) as u64)
}

/// Final display size: declared dimensions win, missing ones follow the
/// intrinsic aspect ratio, and the result is scaled down (never up) to the
/// configured maxima.
fn display_size(
    declared_width: Option<u64>,
    declared_height: Option<u64>,
    px_width: u32,
    px_height: u32,
    max_width: u64,
    max_height: u64,
) -> (u64, u64) {
    let (mut width, mut height) = match (declared_width, declared_height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let ratio = f64::from(px_height) / f64::from(px_width.max(1));
            (w, (w as f64 * ratio) as u64)
        }
        (None, Some(h)) => {
            let ratio = f64::from(px_width) / f64::from(px_height.max(1));
            ((h as f64 * ratio) as u64, h)
        }
        (None, None) => (
            (f64::from(px_width) * LUNIT_PER_PX) as u64,
            (f64::from(px_height) * LUNIT_PER_PX) as u64,
        ),
    };
    if width > max_width {
        let ratio = max_width as f64 / width as f64;
        width = max_width;
        height = (height as f64 * ratio) as u64;
    }
    if height > max_height {
        let ratio = max_height as f64 / height as f64;
        height = max_height;
        width = (width as f64 * ratio) as u64;
    }
    (width.max(1), height.max(1))
}

fn pic_element(registered: &RegisteredImage, pic_id: u32, inst_id: u32) -> XmlElement {
    let width = registered.width.to_string();
    let height = registered.height.to_string();
    let zero_box = |name: &str| {
        XmlElement::new(name)
            .with_attr("left", "0")
            .with_attr("right", "0")
            .with_attr("top", "0")
            .with_attr("bottom", "0")
    };
    let matrix = |name: &str| {
        XmlElement::new(name)
            .with_attr("e1", "1")
            .with_attr("e2", "0")
            .with_attr("e3", "0")
            .with_attr("e4", "0")
            .with_attr("e5", "1")
            .with_attr("e6", "0")
    };
    let point = |name: &str, x: &str, y: &str| {
        XmlElement::new(name).with_attr("x", x).with_attr("y", y)
    };

    XmlElement::new("hp:pic")
        .with_attr("id", pic_id.to_string())
        .with_attr("zOrder", "0")
        .with_attr("numberingType", "NONE")
        .with_attr("textWrap", "TOP_AND_BOTTOM")
        .with_attr("textFlow", "BOTH_SIDES")
        .with_attr("lock", "0")
        .with_attr("dropcapstyle", "None")
        .with_attr("href", "")
        .with_attr("groupLevel", "0")
        .with_attr("instid", inst_id.to_string())
        .with_attr("reverse", "0")
        .with_child(point("hp:offset", "0", "0"))
        .with_child(
            XmlElement::new("hp:orgSz")
                .with_attr("width", &width)
                .with_attr("height", &height),
        )
        .with_child(
            XmlElement::new("hp:curSz")
                .with_attr("width", &width)
                .with_attr("height", &height),
        )
        .with_child(
            XmlElement::new("hp:flip")
                .with_attr("horizontal", "0")
                .with_attr("vertical", "0"),
        )
        .with_child(
            XmlElement::new("hp:rotationInfo")
                .with_attr("angle", "0")
                .with_attr("centerX", "0")
                .with_attr("centerY", "0")
                .with_attr("rotateimage", "1"),
        )
        .with_child(
            XmlElement::new("hp:renderingInfo")
                .with_child(matrix("hc:transMatrix"))
                .with_child(matrix("hc:scaMatrix"))
                .with_child(matrix("hc:rotMatrix")),
        )
        .with_child(
            XmlElement::new("hc:img")
                .with_attr("binaryItemIDRef", &registered.binary_ref)
                .with_attr("bright", "0")
                .with_attr("contrast", "0")
                .with_attr("effect", "REAL_PIC")
                .with_attr("alpha", "0"),
        )
        .with_child(
            XmlElement::new("hp:imgRect")
                .with_child(point("hc:pt0", "0", "0"))
                .with_child(point("hc:pt1", &width, "0"))
                .with_child(point("hc:pt2", &width, &height))
                .with_child(point("hc:pt3", "0", &height)),
        )
        .with_child(zero_box("hp:imgClip"))
        .with_child(zero_box("hp:inMargin"))
        .with_child(
            XmlElement::new("hp:imgDim")
                .with_attr("dimwidth", "0")
                .with_attr("dimheight", "0"),
        )
        .with_child(XmlElement::new("hp:effects"))
        .with_child(
            XmlElement::new("hp:sz")
                .with_attr("width", &width)
                .with_attr("widthRelTo", "ABSOLUTE")
                .with_attr("height", &height)
                .with_attr("heightRelTo", "ABSOLUTE")
                .with_attr("protect", "0"),
        )
        .with_child(
            XmlElement::new("hp:pos")
                .with_attr("treatAsChar", "1")
                .with_attr("affectLSpacing", "0")
                .with_attr("flowWithText", "1")
                .with_attr("allowOverlap", "1")
                .with_attr("holdAnchorAndSO", "0")
                .with_attr("vertRelTo", "PARA")
                .with_attr("horzRelTo", "COLUMN")
                .with_attr("vertAlign", "TOP")
                .with_attr("horzAlign", "LEFT")
                .with_attr("vertOffset", "0")
                .with_attr("horzOffset", "0"),
        )
        .with_child(zero_box("hp:outMargin"))
        .with_child(XmlElement::new("hp:shapeComment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ::image::DynamicImage::ImageRgba8(::image::RgbaImage::new(width, height));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ::image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_validate_source_rejects_traversal() {
        assert!(validate_source("../secret.png").is_err());
        assert!(validate_source("media/../../etc/passwd").is_err());
        assert!(validate_source("media\\..\\x.png").is_err());
    }

    #[test]
    fn test_validate_source_rejects_absolute() {
        assert!(validate_source("/etc/passwd").is_err());
        assert!(validate_source("\\server\\share.png").is_err());
        assert!(validate_source("C:\\pics\\x.png").is_err());
        assert!(validate_source("c:/pics/x.png").is_err());
    }

    #[test]
    fn test_validate_source_accepts_relative() {
        assert!(validate_source("media/image1.png").is_ok());
        assert!(validate_source("fig.png").is_ok());
        assert!(validate_source("a.b/c.d.png").is_ok());
    }

    #[test]
    fn test_parse_dimension_units() {
        assert_eq!(parse_dimension("10mm", 0), Some(2834));
        assert_eq!(parse_dimension("1cm", 0), Some(2834));
        assert_eq!(parse_dimension("1in", 0), Some(7200));
        assert_eq!(parse_dimension("72pt", 0), Some(7200));
        assert_eq!(parse_dimension("96px", 0), Some(7200));
        assert_eq!(parse_dimension("96", 0), Some(7200));
        assert_eq!(parse_dimension("50%", 40000), Some(20000));
        assert_eq!(parse_dimension("", 0), None);
        assert_eq!(parse_dimension("wide", 0), None);
    }

    #[test]
    fn test_display_size_intrinsic() {
        // 96 x 48 px at 96 dpi is one inch by half an inch.
        let (w, h) = display_size(None, None, 96, 48, u64::MAX, u64::MAX);
        assert_eq!(w, 7200);
        assert_eq!(h, 3600);
    }

    #[test]
    fn test_display_size_width_keeps_aspect() {
        let (w, h) = display_size(Some(10000), None, 200, 100, u64::MAX, u64::MAX);
        assert_eq!(w, 10000);
        assert_eq!(h, 5000);
    }

    #[test]
    fn test_display_size_clamps_down_only() {
        let (w, h) = display_size(Some(50000), Some(25000), 200, 100, 40000, u64::MAX);
        assert_eq!(w, 40000);
        assert_eq!(h, 20000);
        // Small images stay small.
        let (w, h) = display_size(Some(100), Some(100), 10, 10, 40000, 40000);
        assert_eq!(w, 100);
        assert_eq!(h, 100);
    }

    #[test]
    fn test_register_reads_and_sizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fig.png"), png_bytes(96, 96)).unwrap();
        let options = ConvertOptions::default().with_resource_dir(dir.path());
        let mut registry = ImageRegistry::new();
        let image = Image::new("fig.png");
        let registered = register(&mut registry, &options, 42520, &image).unwrap();
        assert_eq!(registered.binary_ref, "img1");
        assert_eq!(registered.width, 7200);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().next().unwrap().archive_name(), "BinData/img1.png");
    }

    #[test]
    fn test_register_enforces_count_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fig.png"), png_bytes(4, 4)).unwrap();
        let options = ConvertOptions::default()
            .with_resource_dir(dir.path())
            .with_max_image_count(1);
        let mut registry = ImageRegistry::new();
        register(&mut registry, &options, 42520, &Image::new("fig.png")).unwrap();
        let err = register(&mut registry, &options, 42520, &Image::new("fig.png")).unwrap_err();
        assert!(matches!(err, Error::Security(_)), "got {err:?}");
    }

    #[test]
    fn test_register_enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fig.png"), png_bytes(64, 64)).unwrap();
        let options = ConvertOptions::default()
            .with_resource_dir(dir.path())
            .with_max_input_file_size(16);
        let mut registry = ImageRegistry::new();
        let err = register(&mut registry, &options, 42520, &Image::new("fig.png")).unwrap_err();
        assert!(matches!(err, Error::Security(_)), "got {err:?}");
    }

    #[test]
    fn test_register_rejects_corrupt_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fig.png"), b"not an image").unwrap();
        let options = ConvertOptions::default().with_resource_dir(dir.path());
        let mut registry = ImageRegistry::new();
        let err = register(&mut registry, &options, 42520, &Image::new("fig.png")).unwrap_err();
        assert!(matches!(err, Error::Image(_)), "got {err:?}");
    }

    #[test]
    fn test_pic_element_structure() {
        let registered = RegisteredImage {
            binary_ref: "img1".to_string(),
            width: 7200,
            height: 3600,
        };
        let pic = pic_element(&registered, 3, 4);
        assert_eq!(pic.attr("id"), Some("3"));
        assert_eq!(pic.attr("instid"), Some("4"));
        assert_eq!(
            pic.child("hc:img").unwrap().attr("binaryItemIDRef"),
            Some("img1")
        );
        assert_eq!(pic.child("hp:sz").unwrap().attr("width"), Some("7200"));
        let rect = pic.child("hp:imgRect").unwrap();
        assert_eq!(rect.child("hc:pt2").unwrap().attr("x"), Some("7200"));
        assert_eq!(rect.child("hc:pt2").unwrap().attr("y"), Some("3600"));
    }
}
