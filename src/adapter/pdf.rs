//! PDF adapter.
//!
//! Pages are processed in order. Text spans go through the table detector
//! first; what is left becomes paragraphs. Per page the blocks come out as
//! paragraphs, then tables, then images.

use std::path::Path;

use crate::assets::{encode_raw, RawLayout};
use crate::detect::DocumentFormat;
use crate::error::{Error, Result};
use crate::model::{AssetId, ContentBlock, OutlineSource, PendingAsset};

use super::backend::{ImageEncoding, LopdfSource, PageId, PdfSource, RawImage};
use super::layout::{extract_spans, group_into_lines, group_into_paragraphs, split_plain_paragraphs};
use super::table_detector::{TableDetector, TableDetectorConfig};
use super::{ExtractContext, Extraction, SourceAdapter};

/// PDF document adapter.
#[derive(Debug, Clone, Default)]
pub struct PdfAdapter {
    detector: TableDetectorConfig,
}

impl PdfAdapter {
    /// Create a new PDF adapter with default table detection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom table detection thresholds.
    pub fn with_table_config(mut self, config: TableDetectorConfig) -> Self {
        self.detector = config;
        self
    }

    /// Extract from an already opened source.
    ///
    /// `path` is only used in error messages.
    pub fn extract_from_source<S: PdfSource + ?Sized>(
        &self,
        source: &S,
        path: &Path,
        ctx: &ExtractContext,
    ) -> Result<Extraction> {
        let pages = source.pages();
        let detector = TableDetector::with_config(self.detector.clone());

        let mut extraction = Extraction {
            outline_source: OutlineSource::Bookmarks,
            metadata: source.metadata(),
            ..Default::default()
        };
        extraction.metadata.format = Some(DocumentFormat::Pdf);
        extraction.metadata.page_count = Some(pages.len() as u32);
        extraction.stats.page_count = pages.len() as u32;

        extraction.outline = match source.outline() {
            Ok(outline) => outline,
            Err(e) if ctx.is_lenient() => {
                extraction.warn(format!("{}: outline unreadable: {}", path.display(), e));
                Vec::new()
            }
            Err(e) => return Err(as_parse_failure(e, path, "outline")),
        };

        for (&number, &page_id) in &pages {
            ctx.check_cancelled()?;

            match page_text_blocks(source, number, page_id, &detector) {
                Ok(blocks) => extraction.blocks.extend(blocks),
                Err(e) if ctx.is_lenient() => {
                    extraction.warn(format!(
                        "{}: skipping text of page {}: {}",
                        path.display(),
                        number,
                        e
                    ));
                }
                Err(e) => return Err(as_parse_failure(e, path, &format!("page {}", number))),
            }

            self.collect_images(source, number, page_id, path, &mut extraction);
        }

        log::debug!(
            "PDF: {} pages, {} blocks, {} bookmarks, {} images from {}",
            pages.len(),
            extraction.blocks.len(),
            extraction.outline.len(),
            extraction.assets.len(),
            path.display()
        );

        Ok(extraction)
    }

    fn collect_images<S: PdfSource + ?Sized>(
        &self,
        source: &S,
        number: u32,
        page_id: PageId,
        path: &Path,
        extraction: &mut Extraction,
    ) {
        let images = match source.page_images(page_id) {
            Ok(images) => images,
            Err(e) => {
                extraction.warn(format!(
                    "{}: images of page {} unreadable: {}",
                    path.display(),
                    number,
                    e
                ));
                return;
            }
        };

        for image in images {
            let name = image.name.clone();
            match encode_image(image) {
                Ok((data, extension)) => {
                    let id = AssetId(extraction.assets.len() as u32 + 1);
                    extraction
                        .assets
                        .push(PendingAsset::new(id, data, extension).on_page(number));
                    extraction.blocks.push(ContentBlock::pending_image(id));
                }
                Err(reason) => {
                    extraction.stats.skipped_images += 1;
                    extraction.warn(format!(
                        "{}: skipping image {} on page {}: {}",
                        path.display(),
                        name,
                        number,
                        reason
                    ));
                }
            }
        }
    }
}

impl SourceAdapter for PdfAdapter {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn extract(&self, path: &Path, ctx: &ExtractContext) -> Result<Extraction> {
        let source = LopdfSource::load(path)?;
        self.extract_from_source(&source, path, ctx)
    }
}

/// Paragraphs and tables of one page, top to bottom, falling back to plain text.
fn page_text_blocks<S: PdfSource + ?Sized>(
    source: &S,
    number: u32,
    page_id: PageId,
    detector: &TableDetector,
) -> Result<Vec<ContentBlock>> {
    let spans = match extract_spans(source, page_id) {
        Ok(spans) => spans,
        Err(e) => {
            log::debug!("page {}: layout extraction failed ({}), using plain text", number, e);
            let text = source.extract_text(number)?;
            return Ok(split_plain_paragraphs(&text)
                .into_iter()
                .map(ContentBlock::paragraph)
                .collect());
        }
    };

    let (tables, remaining) = detector.detect(spans);
    let lines = group_into_lines(remaining);

    let mut placed: Vec<(f32, ContentBlock)> = group_into_paragraphs(&lines)
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| (p.y, ContentBlock::paragraph(p.text)))
        .collect();

    placed.extend(tables.iter().filter_map(|t| {
        let table = detector.to_table_block(t);
        (!table.is_empty()).then(|| (t.top_y, ContentBlock::Table(table)))
    }));

    // PDF Y grows upwards; the sort is stable so ties keep paragraphs first
    placed.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(placed.into_iter().map(|(_, block)| block).collect())
}

/// Encoded bytes and extension for an image XObject.
fn encode_image(image: RawImage) -> std::result::Result<(Vec<u8>, &'static str), String> {
    if image.data.is_empty() && !matches!(image.encoding, ImageEncoding::Unsupported(_)) {
        return Err("empty image stream".to_string());
    }

    match image.encoding {
        ImageEncoding::Jpeg => Ok((image.data, "jpg")),
        ImageEncoding::Jpeg2000 => Ok((image.data, "jp2")),
        ImageEncoding::Raw => {
            let mut data = image.data;
            let layout = match (image.color_space.as_deref(), image.bits_per_component) {
                (Some("DeviceRGB"), Some(8)) => RawLayout::Rgb8,
                (Some("DeviceGray"), Some(8)) => RawLayout::Gray8,
                (Some("DeviceCMYK"), Some(8)) => {
                    data = cmyk_to_rgb(&data);
                    RawLayout::Rgb8
                }
                (cs, bpc) => {
                    return Err(format!(
                        "unsupported pixel format {} at {} bits",
                        cs.unwrap_or("unknown"),
                        bpc.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string())
                    ))
                }
            };
            encode_raw(image.width, image.height, layout, data)
                .map(|png| (png, "png"))
                .map_err(|e| e.to_string())
        }
        ImageEncoding::Unsupported(filter) => Err(format!("unsupported filter {}", filter)),
    }
}

/// Naive CMYK → RGB without a color profile.
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    cmyk.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            [0, 1, 2].map(|i| ((255 - u16::from(px[i])) * k / 255) as u8)
        })
        .collect()
}

fn as_parse_failure(e: Error, path: &Path, what: &str) -> Error {
    match e {
        Error::ParseFailure { .. } | Error::Cancelled => e,
        other => Error::parse(path, format!("{}: {}", what, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::backend::{ContentOp, PdfValue};
    use crate::adapter::ErrorMode;
    use crate::model::{DocumentMetadata, OutlineNode, TableBlock};
    use std::collections::{BTreeMap, HashMap};

    #[derive(Default)]
    struct FakeSource {
        // page number → content ops; missing means the content stream is broken
        ops: HashMap<u32, Vec<ContentOp>>,
        plain_text: HashMap<u32, String>,
        images: HashMap<u32, Vec<RawImage>>,
        page_total: u32,
        outline: Vec<OutlineNode>,
    }

    impl PdfSource for FakeSource {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            (1..=self.page_total).map(|n| (n, (n, 0))).collect()
        }
        fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
            if self.ops.contains_key(&page.0) {
                Ok(vec![page.0 as u8])
            } else {
                Err(Error::parse("fake.pdf", "broken content stream"))
            }
        }
        fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
            Ok(self.ops.get(&u32::from(data[0])).cloned().unwrap_or_default())
        }
        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).to_string()
        }
        fn extract_text(&self, page_number: u32) -> Result<String> {
            self.plain_text
                .get(&page_number)
                .cloned()
                .ok_or_else(|| Error::parse("fake.pdf", "no text layer"))
        }
        fn page_images(&self, page: PageId) -> Result<Vec<RawImage>> {
            Ok(self.images.get(&page.0).cloned().unwrap_or_default())
        }
        fn outline(&self) -> Result<Vec<OutlineNode>> {
            Ok(self.outline.clone())
        }
        fn metadata(&self) -> DocumentMetadata {
            DocumentMetadata {
                title: Some("Fake".to_string()),
                ..Default::default()
            }
        }
    }

    fn text_at(text: &str, x: i64, y: i64) -> Vec<ContentOp> {
        vec![
            ContentOp::new("BT", vec![]),
            ContentOp::new("Tf", vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Integer(12)]),
            ContentOp::new("Td", vec![PdfValue::Integer(x), PdfValue::Integer(y)]),
            ContentOp::new("Tj", vec![PdfValue::Str(text.as_bytes().to_vec())]),
            ContentOp::new("ET", vec![]),
        ]
    }

    fn raw(name: &str, encoding: ImageEncoding, color_space: &str, data: Vec<u8>) -> RawImage {
        RawImage {
            name: name.to_string(),
            width: 1,
            height: 1,
            color_space: Some(color_space.to_string()),
            bits_per_component: Some(8),
            encoding,
            data,
        }
    }

    fn run(source: &FakeSource, mode: ErrorMode) -> Result<Extraction> {
        PdfAdapter::new().extract_from_source(
            source,
            Path::new("fake.pdf"),
            &ExtractContext::new().with_error_mode(mode),
        )
    }

    #[test]
    fn test_grid_becomes_table() {
        let ops = [
            text_at("A", 100, 700),
            text_at("B", 200, 700),
            text_at("1", 100, 680),
            text_at("2", 200, 680),
        ]
        .concat();
        let source = FakeSource {
            ops: HashMap::from([(1, ops)]),
            page_total: 1,
            ..Default::default()
        };

        let extraction = run(&source, ErrorMode::Strict).unwrap();
        assert_eq!(
            extraction.blocks,
            vec![ContentBlock::Table(TableBlock::from_rows([["A", "B"], ["1", "2"]]))]
        );
        assert!(extraction.assets.is_empty());
        assert_eq!(extraction.stats.page_count, 1);
        assert_eq!(extraction.metadata.format, Some(DocumentFormat::Pdf));
        assert_eq!(extraction.metadata.title.as_deref(), Some("Fake"));
    }

    #[test]
    fn test_text_below_table_stays_below() {
        let ops = [
            text_at("Before", 100, 760),
            text_at("A", 100, 700),
            text_at("B", 200, 700),
            text_at("1", 100, 680),
            text_at("2", 200, 680),
            text_at("After", 100, 600),
        ]
        .concat();
        let source = FakeSource {
            ops: HashMap::from([(1, ops)]),
            page_total: 1,
            ..Default::default()
        };

        let extraction = run(&source, ErrorMode::Strict).unwrap();
        assert_eq!(
            extraction.blocks,
            vec![
                ContentBlock::paragraph("Before"),
                ContentBlock::Table(TableBlock::from_rows([["A", "B"], ["1", "2"]])),
                ContentBlock::paragraph("After"),
            ]
        );
    }

    #[test]
    fn test_page_order_paragraphs_then_images() {
        let source = FakeSource {
            ops: HashMap::from([(1, text_at("Page one", 72, 700)), (2, text_at("Page two", 72, 700))]),
            images: HashMap::from([(
                1,
                vec![raw("Im1", ImageEncoding::Jpeg, "DeviceRGB", vec![0xFF, 0xD8, 0xFF])],
            )]),
            page_total: 2,
            outline: vec![OutlineNode::new(1, "Start")],
            ..Default::default()
        };

        let extraction = run(&source, ErrorMode::Strict).unwrap();
        assert_eq!(
            extraction.blocks,
            vec![
                ContentBlock::paragraph("Page one"),
                ContentBlock::pending_image(AssetId(1)),
                ContentBlock::paragraph("Page two"),
            ]
        );
        assert_eq!(extraction.assets[0].page, Some(1));
        assert_eq!(extraction.assets[0].extension, "jpg");
        assert_eq!(extraction.outline, vec![OutlineNode::new(1, "Start")]);
        assert_eq!(extraction.outline_source, OutlineSource::Bookmarks);
    }

    #[test]
    fn test_raw_images_encoded_or_skipped() {
        let source = FakeSource {
            ops: HashMap::from([(1, Vec::new())]),
            images: HashMap::from([(
                1,
                vec![
                    raw("Gray", ImageEncoding::Raw, "DeviceGray", vec![128]),
                    raw("Cmyk", ImageEncoding::Raw, "DeviceCMYK", vec![0, 255, 255, 0]),
                    raw("Lab", ImageEncoding::Raw, "Lab", vec![50, 0, 0]),
                    raw("Fax", ImageEncoding::Unsupported("CCITTFaxDecode".into()), "DeviceGray", vec![]),
                ],
            )]),
            page_total: 1,
            ..Default::default()
        };

        let extraction = run(&source, ErrorMode::Strict).unwrap();
        assert_eq!(extraction.assets.len(), 2);
        assert!(extraction.assets.iter().all(|a| a.extension == "png"));
        assert_eq!(extraction.stats.skipped_images, 2);
        assert_eq!(extraction.warnings.len(), 2);
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 255, 255, 0, 0, 0, 0, 255]), vec![255, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_plain_text_fallback() {
        let source = FakeSource {
            plain_text: HashMap::from([(1, "first line\nsame para\n\nsecond".to_string())]),
            page_total: 1,
            ..Default::default()
        };

        let extraction = run(&source, ErrorMode::Strict).unwrap();
        assert_eq!(
            extraction.blocks,
            vec![
                ContentBlock::paragraph("first line same para"),
                ContentBlock::paragraph("second"),
            ]
        );
    }

    #[test]
    fn test_unreadable_page_strict_fails() {
        let source = FakeSource {
            page_total: 1,
            ..Default::default()
        };
        let err = run(&source, ErrorMode::Strict).unwrap_err();
        assert!(matches!(err, Error::ParseFailure { .. }));
    }

    #[test]
    fn test_unreadable_page_lenient_skips() {
        let source = FakeSource {
            ops: HashMap::from([(2, text_at("Survivor", 72, 700))]),
            page_total: 2,
            ..Default::default()
        };
        let extraction = run(&source, ErrorMode::Lenient).unwrap();
        assert_eq!(extraction.blocks, vec![ContentBlock::paragraph("Survivor")]);
        assert_eq!(extraction.warnings.len(), 1);
    }

    #[test]
    fn test_cancelled_before_first_page() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let source = FakeSource {
            ops: HashMap::from([(1, text_at("x", 72, 700))]),
            page_total: 1,
            ..Default::default()
        };
        let ctx = ExtractContext::new().with_cancel(Arc::new(AtomicBool::new(true)));
        let err = PdfAdapter::new()
            .extract_from_source(&source, Path::new("fake.pdf"), &ctx)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
