//! Integration tests for end-to-end document conversion.

use std::io::Read;

use md2hwpx::{
    convert_document, convert_json, Alignment, Block, BulletList, ColumnSpec, ConvertOptions,
    Document, Header, Inline, Md2Hwpx, OrderedList, Table, TableCell, TableRow,
};

fn archive(bytes: &[u8]) -> zip::ZipArchive<std::io::Cursor<&[u8]>> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap()
}

fn entry(bytes: &[u8], name: &str) -> String {
    let mut archive = archive(bytes);
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn section(bytes: &[u8]) -> String {
    entry(bytes, "Contents/section0.xml")
}

fn header_part(bytes: &[u8]) -> String {
    entry(bytes, "Contents/header.xml")
}

fn convert(blocks: Vec<Block>) -> Vec<u8> {
    convert_document(&Document::with_blocks(blocks), &ConvertOptions::default()).unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
    let mut cursor = std::io::Cursor::new(Vec::new());
    img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
    cursor.into_inner()
}

#[test]
fn test_package_layout() {
    let bytes = convert(vec![Block::paragraph("hello")]);
    let mut archive = archive(&bytes);

    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(names[0], "mimetype");
    assert!(names.iter().any(|n| n == "Contents/header.xml"));
    assert!(names.iter().any(|n| n == "Contents/section0.xml"));
    assert!(names.iter().any(|n| n == "Contents/content.hpf"));
    assert!(names.iter().any(|n| n == "META-INF/container.xml"));
}

#[test]
fn test_mimetype_is_first_and_stored() {
    let bytes = convert(vec![Block::paragraph("hello")]);
    let mut archive = archive(&bytes);
    let first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), zip::CompressionMethod::Stored);
}

#[test]
fn test_mimetype_content() {
    let bytes = convert(vec![]);
    assert_eq!(entry(&bytes, "mimetype"), "application/hwp+zip");
}

#[test]
fn test_output_is_deterministic() {
    let document = Document::with_blocks(vec![
        Block::header(1, "Title"),
        Block::Paragraph(vec![
            Inline::text("body with "),
            Inline::link("https://example.com", "a link"),
        ]),
        Block::BulletList(BulletList {
            items: vec![
                vec![Block::paragraph("one")],
                vec![Block::paragraph("two")],
            ],
        }),
        Block::Table(Table {
            header_rows: 1,
            rows: vec![
                TableRow::from_strings(["a", "b"]),
                TableRow::from_strings(["c", "d"]),
            ],
            ..Table::new()
        }),
    ])
    .titled("Same");
    let options = ConvertOptions::default();

    let first = convert_document(&document, &options).unwrap();
    let second = convert_document(&document, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_heading_and_body_use_distinct_styles() {
    let bytes = convert(vec![Block::header(1, "Title"), Block::paragraph("body")]);
    let section = section(&bytes);

    let para_prs: Vec<&str> = section
        .match_indices("paraPrIDRef=\"")
        .map(|(i, _)| {
            let rest = &section[i + 13..];
            &rest[..rest.find('"').unwrap()]
        })
        .collect();
    assert!(para_prs.len() >= 2);
    assert_ne!(para_prs[0], para_prs[1]);
}

#[test]
fn test_heading_level_without_placeholder_falls_back() {
    // The built-in package only defines placeholders through level 3.
    let bytes = convert(vec![Block::header(5, "Deep")]);
    assert!(section(&bytes).contains("Deep"));
}

#[test]
fn test_hyperlink_emits_field_pair() {
    let bytes = convert(vec![Block::Paragraph(vec![Inline::link(
        "https://example.com/page",
        "example",
    )])]);
    let section = section(&bytes);

    assert!(section.contains("<hp:fieldBegin"));
    assert!(section.contains("type=\"HYPERLINK\""));
    assert!(section.contains("<hp:fieldEnd"));
    assert!(section.contains("example"));
    // The command escapes colons the way the field format expects.
    assert!(section.contains("https\\://example.com/page;1;5;-1;"));
}

#[test]
fn test_footnote_control_holds_body() {
    let mut document = Document::with_blocks(vec![Block::Paragraph(vec![
        Inline::text("claim"),
        Inline::footnote_ref("1"),
    ])]);
    document
        .footnotes
        .insert("1".to_string(), vec![Block::paragraph("evidence")]);

    let bytes = convert_document(&document, &ConvertOptions::default()).unwrap();
    let section = section(&bytes);
    assert!(section.contains("<hp:footNote"));
    assert!(section.contains("numType=\"FOOTNOTE\""));
    assert!(section.contains("evidence"));
}

#[test]
fn test_undefined_footnote_keeps_marker() {
    let bytes = convert(vec![Block::Paragraph(vec![Inline::footnote_ref("ghost")])]);
    let section = section(&bytes);
    assert!(!section.contains("<hp:footNote"));
    assert!(section.contains("[^ghost]"));
}

#[test]
fn test_merged_cells_carry_spans_and_addresses() {
    let table = Table {
        rows: vec![
            TableRow::new(vec![TableCell::text("wide").colspan(2), TableCell::text("c")]),
            TableRow::from_strings(["x", "y", "z"]),
        ],
        ..Table::new()
    };
    let bytes = convert(vec![Block::Table(table)]);
    let section = section(&bytes);

    assert!(section.contains("colSpan=\"2\""));
    // The cell after the merged one lands at grid column 2.
    assert!(section.contains("colAddr=\"2\""));
    assert!(section.contains("rowCnt=\"2\""));
    assert!(section.contains("colCnt=\"3\""));
}

#[test]
fn test_weighted_columns_split_page_width() {
    // The built-in page offers 42520 units of text width; weights 8/21/8
    // split it by largest remainder, so the widths sum exactly.
    let table = Table {
        columns: vec![
            ColumnSpec::weighted(8),
            ColumnSpec::weighted(21),
            ColumnSpec::weighted(8),
        ],
        rows: vec![TableRow::from_strings(["a", "b", "c"])],
        ..Table::new()
    };
    let bytes = convert(vec![Block::Table(table)]);
    let section = section(&bytes);

    assert!(section.contains("<hp:cellSz width=\"9194\""));
    assert!(section.contains("<hp:cellSz width=\"24133\""));
    assert!(section.contains("<hp:cellSz width=\"9193\""));
}

#[test]
fn test_equal_columns_absorb_remainder_first() {
    let table = Table {
        rows: vec![TableRow::from_strings(["a", "b", "c"])],
        ..Table::new()
    };
    let bytes = convert(vec![Block::Table(table)]);
    let section = section(&bytes);

    // 42520 does not divide by three; the first column takes the leftover.
    assert!(section.contains("<hp:cellSz width=\"14174\""));
    assert!(section.contains("<hp:cellSz width=\"14173\""));
}

#[test]
fn test_ordered_list_start_reaches_numbering() {
    let list = OrderedList {
        start: 5,
        items: vec![vec![Block::paragraph("fifth")]],
    };
    let bytes = convert(vec![Block::OrderedList(list)]);
    assert!(header_part(&bytes).contains("start=\"5\""));
}

#[test]
fn test_block_quote_indents_paragraph_property() {
    let bytes = convert(vec![Block::BlockQuote(vec![Block::paragraph("quoted")])]);
    // One nesting level adds the default 2000-unit indent to a copy of the
    // body paragraph property.
    assert!(header_part(&bytes).contains("value=\"2000\""));
    assert!(section(&bytes).contains("quoted"));
}

#[test]
fn test_code_block_preserves_line_breaks() {
    let code = md2hwpx::CodeBlock {
        text: "fn main() {\n    work();\n}".to_string(),
        language: Some("rust".to_string()),
    };
    let bytes = convert(vec![Block::CodeBlock(code)]);
    let section = section(&bytes);

    assert_eq!(section.matches("<hp:lineBreak").count(), 2);
    assert!(section.contains("fn main() {"));
    assert!(section.contains("work();"));
}

#[test]
fn test_horizontal_rule_gets_borderline_property() {
    let bytes = convert(vec![
        Block::paragraph("above"),
        Block::HorizontalRule,
        Block::paragraph("below"),
    ]);
    // The rule paragraph references a derived property; the body keeps its
    // own, so at least two distinct ids appear.
    let section = section(&bytes);
    let mut ids: Vec<&str> = section
        .match_indices("paraPrIDRef=\"")
        .map(|(i, _)| {
            let rest = &section[i + 13..];
            &rest[..rest.find('"').unwrap()]
        })
        .collect();
    ids.dedup();
    assert!(ids.len() >= 2);
}

#[test]
fn test_image_embedding_full_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fig.png"), png_bytes(32, 32)).unwrap();

    let options = ConvertOptions::default().with_resource_dir(dir.path());
    let document = Document::with_blocks(vec![Block::Image(md2hwpx::Image::new("fig.png"))]);
    let bytes = convert_document(&document, &options).unwrap();

    let mut archive = archive(&bytes);
    assert!(archive.by_name("BinData/img1.png").is_ok());
    assert!(section(&bytes).contains("binaryItemIDRef=\"img1\""));

    let manifest = entry(&bytes, "Contents/content.hpf");
    assert!(manifest.contains("href=\"BinData/img1.png\""));
    assert!(manifest.contains("media-type=\"image/png\""));
    assert!(manifest.contains("isEmbeded=\"1\""));
}

#[test]
fn test_images_number_sequentially() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.png"), png_bytes(8, 8)).unwrap();
    std::fs::write(dir.path().join("b.jpg"), {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Jpeg).unwrap();
        cursor.into_inner()
    })
    .unwrap();

    let options = ConvertOptions::default().with_resource_dir(dir.path());
    let document = Document::with_blocks(vec![
        Block::Image(md2hwpx::Image::new("a.png")),
        Block::Image(md2hwpx::Image::new("b.jpg")),
    ]);
    let bytes = convert_document(&document, &options).unwrap();

    let mut archive = archive(&bytes);
    assert!(archive.by_name("BinData/img1.png").is_ok());
    assert!(archive.by_name("BinData/img2.jpg").is_ok());
    assert!(entry(&bytes, "Contents/content.hpf").contains("media-type=\"image/jpeg\""));
}

#[test]
fn test_title_is_escaped_in_manifest() {
    let document = Document::new().titled("Fish & <Chips>");
    let bytes = convert_document(&document, &ConvertOptions::default()).unwrap();
    let manifest = entry(&bytes, "Contents/content.hpf");
    assert!(manifest.contains("Fish &amp; &lt;Chips&gt;"));
    assert!(!manifest.contains("Fish & <Chips>"));
}

#[test]
fn test_nesting_depth_limit_enforced() {
    // A quote holding a list holding a table is three levels deep.
    let table = Table {
        rows: vec![TableRow::from_strings(["x"])],
        ..Table::new()
    };
    let blocks = vec![Block::BlockQuote(vec![Block::BulletList(BulletList {
        items: vec![vec![Block::Table(table)]],
    })])];
    let document = Document::with_blocks(blocks);

    let relaxed = ConvertOptions::default();
    assert!(convert_document(&document, &relaxed).is_ok());

    let strict = ConvertOptions::default().with_max_nesting_depth(2);
    let err = convert_document(&document, &strict).unwrap_err();
    assert!(matches!(err, md2hwpx::Error::Conversion(_)), "got {err:?}");
}

#[test]
fn test_convert_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.json");
    let output = dir.path().join("doc.hwpx");

    let json = r#"{
        "title": "From Disk",
        "blocks": [
            {"t": "Header", "c": {"level": 1, "content": [{"t": "Text", "c": "Hi"}]}},
            {"t": "Paragraph", "c": [{"t": "Text", "c": "body text"}]}
        ]
    }"#;
    std::fs::write(&input, json).unwrap();

    md2hwpx::convert_file(&input, &output).unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"PK"));
    assert!(section(&bytes).contains("body text"));
    assert!(entry(&bytes, "Contents/content.hpf").contains("From Disk"));
}

#[test]
fn test_output_usable_as_reference_package() {
    let dir = tempfile::tempdir().unwrap();
    let reference = dir.path().join("reference.hwpx");

    let first = convert(vec![Block::paragraph("seed")]);
    std::fs::write(&reference, &first).unwrap();

    let bytes = Md2Hwpx::new()
        .with_reference_doc(&reference)
        .convert(&Document::with_blocks(vec![Block::paragraph("second pass")]))
        .unwrap();
    let section = section(&bytes);
    assert!(section.contains("second pass"));
    // Body paragraphs of the reference are replaced, not appended.
    assert!(!section.contains("seed"));
}

#[test]
fn test_convert_json_matches_document_api() {
    let document = Document::with_blocks(vec![
        Block::header(2, "Section"),
        Block::paragraph("prose"),
    ]);
    let json = serde_json::to_string(&document).unwrap();
    let options = ConvertOptions::default();

    let from_json = convert_json(&json, &options).unwrap();
    let from_document = convert_document(&document, &options).unwrap();
    assert_eq!(from_json, from_document);
}

#[test]
fn test_cell_alignment_picks_cell_placeholder() {
    let table = Table {
        columns: vec![
            ColumnSpec::aligned(Alignment::Left),
            ColumnSpec::aligned(Alignment::Center),
        ],
        header_rows: 1,
        rows: vec![
            TableRow::from_strings(["h1", "h2"]),
            TableRow::from_strings(["b1", "b2"]),
        ],
        ..Table::new()
    };
    let bytes = convert(vec![Block::Table(table)]);

    // Every cell holds its own paragraph with a resolved style.
    let section = section(&bytes);
    let in_cells: Vec<&str> = section
        .split("<hp:subList")
        .skip(1)
        .filter_map(|chunk| {
            let i = chunk.find("paraPrIDRef=\"")?;
            let rest = &chunk[i + 13..];
            Some(&rest[..rest.find('"')?])
        })
        .collect();
    assert_eq!(in_cells.len(), 4);
}

#[test]
fn test_header_includes_heading_text() {
    let document = Document::with_blocks(vec![Block::Header(Header {
        level: 1,
        content: vec![
            Inline::text("Annual"),
            Inline::Space,
            Inline::text("Report"),
        ],
    })]);
    let bytes = convert_document(&document, &ConvertOptions::default()).unwrap();
    assert!(section(&bytes).contains("Annual Report"));
}
