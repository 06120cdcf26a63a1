//! End-to-end tests for PDF documents written with lopdf.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use docmark::{
    convert_file, ConversionResult, ConvertOptions, Converter, DocumentFormat, Error, OutlineNode,
};

/// Text drawn at an absolute position with font F1 at 12pt.
fn text_at(text: &str, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// A 2×2 image drawn on a page.
enum PageImage {
    Jpeg(Vec<u8>),
    /// Uncompressed 8-bit samples in an `ICCBased` RGB space
    IccRgb(Vec<u8>),
}

struct PdfPage {
    operations: Vec<Operation>,
    image: Option<PageImage>,
}

impl PdfPage {
    fn text(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            image: None,
        }
    }
}

/// Write a PDF with one entry per page; `bookmarks` are (level 1 title, children).
fn write_pdf(path: &Path, pages: Vec<PdfPage>, bookmarks: &[(&str, &[&str])]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    let mut first_page: Option<ObjectId> = None;
    for page in pages {
        let mut operations = page.operations;
        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };

        if let Some(image) = page.image {
            let mut dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "BitsPerComponent" => 8,
            };
            let data = match image {
                PageImage::Jpeg(jpeg) => {
                    dict.set("ColorSpace", "DeviceRGB");
                    dict.set("Filter", "DCTDecode");
                    jpeg
                }
                PageImage::IccRgb(pixels) => {
                    let profile_id =
                        doc.add_object(Stream::new(dictionary! { "N" => 3 }, Vec::new()));
                    dict.set(
                        "ColorSpace",
                        vec![Object::Name(b"ICCBased".to_vec()), profile_id.into()],
                    );
                    pixels
                }
            };
            let image_id = doc.add_object(Stream::new(dict, data));
            resources.set("XObject", dictionary! { "Im1" => image_id });
            operations.push(Operation::new("Do", vec!["Im1".into()]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        first_page.get_or_insert(page_id);
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if !bookmarks.is_empty() {
        let outlines_id = add_bookmarks(&mut doc, bookmarks, first_page.unwrap());
        catalog.set("Outlines", outlines_id);
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Sample Report"),
        "Author" => Object::string_literal("Docs Team"),
        "CreationDate" => Object::string_literal("D:20240115103000Z"),
    });
    doc.trailer.set("Info", info_id);

    doc.save(path).unwrap();
}

fn add_bookmarks(doc: &mut Document, bookmarks: &[(&str, &[&str])], page: ObjectId) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let ids: Vec<ObjectId> = bookmarks.iter().map(|_| doc.new_object_id()).collect();

    for (i, (title, children)) in bookmarks.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(*title),
            "Parent" => outlines_id,
            "Dest" => vec![page.into(), "Fit".into()],
        };
        if i + 1 < ids.len() {
            item.set("Next", ids[i + 1]);
        }
        if i > 0 {
            item.set("Prev", ids[i - 1]);
        }

        let child_ids: Vec<ObjectId> = children.iter().map(|_| doc.new_object_id()).collect();
        for (j, child) in children.iter().enumerate() {
            let mut child_item = dictionary! {
                "Title" => Object::string_literal(*child),
                "Parent" => ids[i],
                "Dest" => vec![page.into(), "Fit".into()],
            };
            if j + 1 < child_ids.len() {
                child_item.set("Next", child_ids[j + 1]);
            }
            doc.objects.insert(child_ids[j], Object::Dictionary(child_item));
        }
        if let (Some(first), Some(last)) = (child_ids.first(), child_ids.last()) {
            item.set("First", *first);
            item.set("Last", *last);
            item.set("Count", child_ids.len() as i64);
        }
        doc.objects.insert(ids[i], Object::Dictionary(item));
    }

    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => ids[0],
            "Last" => ids[ids.len() - 1],
            "Count" => ids.len() as i64,
        }),
    );
    outlines_id
}

fn table_ops() -> Vec<Operation> {
    [
        text_at("A", 100, 700),
        text_at("B", 200, 700),
        text_at("1", 100, 680),
        text_at("2", 200, 680),
    ]
    .concat()
}

fn tiny_jpeg() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

fn input_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

#[test]
fn test_pdf_table_example() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "doc.pdf");
    write_pdf(&input, vec![PdfPage::text(table_ops())], &[]);

    let out = dir.path().join("out");
    let result = convert_file(&input, &out).unwrap();

    let markdown = fs::read_to_string(out.join("doc.md")).unwrap();
    assert!(markdown.contains("|A|B|\n|---|---|\n|1|2|"), "{:?}", markdown);
    assert!(result.image_files.is_empty());
    assert_eq!(result.stats.table_count, 1);
    assert_eq!(result.stats.page_count, 1);
}

#[test]
fn test_paragraph_before_table_on_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "report.pdf");
    let ops = [text_at("Report", 100, 760), table_ops()].concat();
    write_pdf(&input, vec![PdfPage::text(ops)], &[]);

    let result = convert_file(&input, dir.path().join("out")).unwrap();
    let markdown = fs::read_to_string(&result.markdown_path).unwrap();
    assert_eq!(markdown, "Report\n\n|A|B|\n|---|---|\n|1|2|\n");
    assert_eq!(result.full_text, "Report\n");
}

#[test]
fn test_pages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "pages.pdf");
    write_pdf(
        &input,
        vec![
            PdfPage::text(text_at("First page", 72, 700)),
            PdfPage::text(text_at("Second page", 72, 700)),
        ],
        &[],
    );

    let result = convert_file(&input, dir.path().join("out")).unwrap();
    assert_eq!(result.full_text, "First page\nSecond page\n");
    assert_eq!(result.metadata.format, Some(DocumentFormat::Pdf));
    assert_eq!(result.metadata.page_count, Some(2));
    assert_eq!(result.metadata.title.as_deref(), Some("Sample Report"));
    assert_eq!(result.metadata.author.as_deref(), Some("Docs Team"));
    assert!(result.metadata.created.is_some());
}

#[test]
fn test_bookmarks_become_outline() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "book.pdf");
    write_pdf(
        &input,
        vec![PdfPage::text(text_at("Body", 72, 700))],
        &[("Chapter 1", &[]), ("Chapter 2", &["Section 2.1", "Section 2.2"])],
    );

    let result = convert_file(&input, dir.path().join("out")).unwrap();
    assert_eq!(
        result.outline,
        vec![
            OutlineNode::new(1, "Chapter 1"),
            OutlineNode::new(1, "Chapter 2"),
            OutlineNode::new(2, "Section 2.1"),
            OutlineNode::new(2, "Section 2.2"),
        ]
    );

    let markdown = fs::read_to_string(&result.markdown_path).unwrap();
    assert!(markdown.starts_with("---\n"));
    assert!(markdown.ends_with("Body\n"));

    let reloaded = ConversionResult::reload(&result.markdown_path).unwrap();
    assert_eq!(reloaded.outline, result.outline);
    assert_eq!(reloaded.full_text, "Body\n");
}

#[test]
fn test_jpeg_image_is_transcoded_to_png() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "pic.pdf");
    write_pdf(
        &input,
        vec![PdfPage {
            operations: text_at("Caption", 72, 700),
            image: Some(PageImage::Jpeg(tiny_jpeg())),
        }],
        &[],
    );

    let out = dir.path().join("out");
    let result = convert_file(&input, &out).unwrap();

    assert_eq!(result.image_files, vec!["images/pic_page1_img1.png"]);
    let png = fs::read(out.join("images/pic_page1_img1.png")).unwrap();
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    assert_eq!(result.stats.transcoded_images, 1);

    let markdown = fs::read_to_string(&result.markdown_path).unwrap();
    assert_eq!(markdown, "Caption\n\n![image_1](images/pic_page1_img1.png)\n");
}

#[test]
fn test_jpeg_kept_without_transcoding() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "pic.pdf");
    let jpeg = tiny_jpeg();
    write_pdf(
        &input,
        vec![PdfPage {
            operations: Vec::new(),
            image: Some(PageImage::Jpeg(jpeg.clone())),
        }],
        &[],
    );

    let out = dir.path().join("out");
    let result = Converter::new(ConvertOptions::new(&out).with_transcoding(false))
        .convert(&input)
        .unwrap();

    assert_eq!(result.image_files, vec!["images/pic_page1_img1.jpg"]);
    assert_eq!(fs::read(out.join("images/pic_page1_img1.jpg")).unwrap(), jpeg);
}

#[test]
fn test_icc_based_raw_image_is_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "icc.pdf");
    let pixels = vec![
        10, 20, 30, 40, 50, 60, //
        70, 80, 90, 100, 110, 120,
    ];
    write_pdf(
        &input,
        vec![PdfPage {
            operations: text_at("Figure", 72, 700),
            image: Some(PageImage::IccRgb(pixels)),
        }],
        &[],
    );

    let out = dir.path().join("out");
    let result = convert_file(&input, &out).unwrap();

    assert_eq!(result.image_files, vec!["images/icc_page1_img1.png"]);
    assert_eq!(result.stats.skipped_images, 0);

    let png = image::open(out.join("images/icc_page1_img1.png")).unwrap().to_rgb8();
    assert_eq!(png.dimensions(), (2, 2));
    assert_eq!(png.get_pixel(0, 0), &image::Rgb([10, 20, 30]));
    assert_eq!(png.get_pixel(1, 1), &image::Rgb([100, 110, 120]));
}

#[test]
fn test_garbage_pdf_is_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_path(dir.path(), "junk.pdf");
    fs::write(&input, b"%PDF-1.4\nnot really a pdf").unwrap();

    let out = dir.path().join("out");
    let err = convert_file(&input, &out).unwrap_err();
    assert!(matches!(err, Error::ParseFailure { .. }));
    assert!(!out.join("junk.md").exists());
}
