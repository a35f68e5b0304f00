//! Conversion options and resource limits.
//!
//! All options have defaults tuned for typical documents; callers override
//! any subset through the builder methods.
//!
//! # Example
//!
//! ```
//! use md2hwpx::ConvertOptions;
//!
//! let options = ConvertOptions::new()
//!     .with_max_nesting_depth(6)
//!     .with_table_total_width(40000);
//! ```

use std::path::PathBuf;

/// Options controlling conversion behavior and resource limits.
///
/// Absolute sizes are in HWP units (1/7200 inch, about 283.465 per mm).
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Total table width when the reference package supplies no page setup.
    pub table_total_width: u64,

    /// Maximum nesting depth for lists, block quotes, and boxed content
    /// (table cells, footnote bodies). Exceeding it aborts the conversion.
    pub max_nesting_depth: u8,

    /// Maximum number of images embedded in one conversion.
    pub max_image_count: usize,

    /// Maximum size in bytes for input files (the AST document and each
    /// referenced image).
    pub max_input_file_size: u64,

    /// Maximum size in bytes for the reference package.
    pub max_template_file_size: u64,

    /// Maximum display width for embedded images. Larger images are scaled
    /// down preserving aspect ratio; images are never scaled up.
    pub max_image_width: u64,

    /// Maximum display height for embedded images.
    pub max_image_height: u64,

    /// Additional left indent applied per list or block-quote nesting level.
    pub blockquote_indent_per_level: u32,

    /// Bullet glyphs cycled through list depths when the reference package
    /// defines no bullet styles.
    pub bullet_glyphs: Vec<String>,

    /// Character property id applied to hyperlink text. When unset, an
    /// underline plus [`link_color`](Self::link_color) property is derived
    /// from the surrounding style.
    pub link_style_id: Option<u32>,

    /// Text color for hyperlinks, as `#RRGGBB`.
    pub link_color: String,

    /// Base directory for resolving relative image paths. Defaults to the
    /// current working directory.
    pub resource_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            table_total_width: 45000,
            max_nesting_depth: 10,
            max_image_count: 64,
            max_input_file_size: 20 * 1024 * 1024,
            max_template_file_size: 50 * 1024 * 1024,
            max_image_width: 42520,
            max_image_height: 56693,
            blockquote_indent_per_level: 2000,
            bullet_glyphs: vec!["•".to_string(), "○".to_string(), "▪".to_string()],
            link_style_id: None,
            link_color: "#0000FF".to_string(),
            resource_dir: None,
        }
    }
}

impl ConvertOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback total table width.
    pub fn with_table_total_width(mut self, width: u64) -> Self {
        self.table_total_width = width;
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_nesting_depth(mut self, depth: u8) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Set the maximum number of embedded images.
    pub fn with_max_image_count(mut self, count: usize) -> Self {
        self.max_image_count = count;
        self
    }

    /// Set the maximum input file size in bytes.
    pub fn with_max_input_file_size(mut self, bytes: u64) -> Self {
        self.max_input_file_size = bytes;
        self
    }

    /// Set the maximum reference package size in bytes.
    pub fn with_max_template_file_size(mut self, bytes: u64) -> Self {
        self.max_template_file_size = bytes;
        self
    }

    /// Set the maximum display dimensions for embedded images.
    pub fn with_max_image_dimensions(mut self, width: u64, height: u64) -> Self {
        self.max_image_width = width;
        self.max_image_height = height;
        self
    }

    /// Set the per-level block-quote indent.
    pub fn with_blockquote_indent(mut self, indent: u32) -> Self {
        self.blockquote_indent_per_level = indent;
        self
    }

    /// Set the bullet glyph cycle.
    pub fn with_bullet_glyphs(mut self, glyphs: Vec<String>) -> Self {
        self.bullet_glyphs = glyphs;
        self
    }

    /// Use a fixed character property id for hyperlink text.
    pub fn with_link_style_id(mut self, id: u32) -> Self {
        self.link_style_id = Some(id);
        self
    }

    /// Set the hyperlink text color.
    pub fn with_link_color(mut self, color: impl Into<String>) -> Self {
        self.link_color = color.into();
        self
    }

    /// Set the base directory for relative image paths.
    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ConvertOptions::default();
        assert_eq!(options.table_total_width, 45000);
        assert_eq!(options.max_nesting_depth, 10);
        assert_eq!(options.max_image_count, 64);
        assert!(options.link_style_id.is_none());
        assert_eq!(options.bullet_glyphs.len(), 3);
    }

    #[test]
    fn test_builder_methods() {
        let options = ConvertOptions::new()
            .with_table_total_width(30000)
            .with_max_nesting_depth(4)
            .with_max_image_count(8)
            .with_max_image_dimensions(20000, 20000)
            .with_link_style_id(7)
            .with_link_color("#FF0000")
            .with_resource_dir("/tmp/docs");

        assert_eq!(options.table_total_width, 30000);
        assert_eq!(options.max_nesting_depth, 4);
        assert_eq!(options.max_image_count, 8);
        assert_eq!(options.max_image_width, 20000);
        assert_eq!(options.link_style_id, Some(7));
        assert_eq!(options.link_color, "#FF0000");
        assert_eq!(options.resource_dir, Some(PathBuf::from("/tmp/docs")));
    }
}
