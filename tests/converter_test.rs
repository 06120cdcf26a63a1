//! Integration tests for the conversion orchestrator.

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use docmark::adapter::{ExtractContext, Extraction, SourceAdapter};
use docmark::convert::{AdapterRegistry, ConvertOptions, Converter, ImageLayout};
use docmark::error::{Error, Result};
use docmark::model::{AssetId, PendingAsset};
use docmark::{ContentBlock, ConversionResult, DocumentFormat, HeadingLevel, OutlineNode, OutlineSource};

/// Mock adapter returning a canned extraction.
struct MockAdapter {
    extraction: Extraction,
}

impl MockAdapter {
    fn new(extraction: Extraction) -> Self {
        Self { extraction }
    }
}

impl SourceAdapter for MockAdapter {
    fn supported_extensions(&self) -> &[&str] {
        &["mock"]
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn extract(&self, _path: &Path, ctx: &ExtractContext) -> Result<Extraction> {
        ctx.check_cancelled()?;
        Ok(self.extraction.clone())
    }
}

fn h(level: u8, text: &str) -> ContentBlock {
    ContentBlock::heading(HeadingLevel::new(level).unwrap(), text)
}

fn sample_extraction() -> Extraction {
    Extraction {
        outline: vec![OutlineNode::new(1, "Intro")],
        blocks: vec![
            h(1, "Intro"),
            ContentBlock::paragraph("Hello world."),
            ContentBlock::pending_image(AssetId(1)),
        ],
        assets: vec![PendingAsset::new(AssetId(1), b"fake png".to_vec(), "png")],
        ..Default::default()
    }
}

fn converter_for(extraction: Extraction, options: ConvertOptions) -> Converter {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(MockAdapter::new(extraction)));
    Converter::new(options).with_registry(registry)
}

#[test]
fn test_convert_writes_markdown_and_images() {
    let dir = tempfile::tempdir().unwrap();
    let converter = converter_for(sample_extraction(), ConvertOptions::new(dir.path()));

    let result = converter.convert("doc.mock").unwrap();

    assert_eq!(result.markdown_path, dir.path().join("doc.md"));
    let markdown = fs::read_to_string(&result.markdown_path).unwrap();
    assert_eq!(markdown, "# Intro\n\nHello world.\n\n![image_1](images/doc_image1.png)\n");

    assert_eq!(result.image_files, vec!["images/doc_image1.png"]);
    assert!(dir.path().join("images/doc_image1.png").is_file());
    assert_eq!(result.full_text, "Intro\nHello world.\n");
    assert_eq!(result.outline, vec![OutlineNode::new(1, "Intro")]);
    assert_eq!(result.stats.heading_count, 1);
    assert_eq!(result.stats.image_count, 1);
}

#[test]
fn test_per_document_image_layout() {
    let dir = tempfile::tempdir().unwrap();
    let options = ConvertOptions::new(dir.path()).with_image_layout(ImageLayout::PerDocument);
    let converter = converter_for(sample_extraction(), options);

    let result = converter.convert("report.mock").unwrap();
    assert_eq!(result.image_files, vec!["report_images/report_image1.png"]);
    assert!(dir.path().join("report_images/report_image1.png").is_file());
}

#[test]
fn test_image_paths_exist_relative_to_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut extraction = sample_extraction();
    for i in 2..=5 {
        extraction
            .assets
            .push(PendingAsset::new(AssetId(i), vec![i as u8; 16], "gif"));
        extraction.blocks.push(ContentBlock::pending_image(AssetId(i)));
    }
    let options = ConvertOptions::new(dir.path()).with_transcoding(false);
    let result = converter_for(extraction, options).convert("doc.mock").unwrap();

    let md_dir = result.markdown_path.parent().unwrap();
    assert_eq!(result.image_files.len(), 5);
    for image in &result.image_files {
        assert!(md_dir.join(image).is_file(), "{} missing", image);
    }
}

#[test]
fn test_dangling_image_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let mut extraction = sample_extraction();
    extraction.blocks.push(ContentBlock::pending_image(AssetId(99)));

    let err = converter_for(extraction, ConvertOptions::new(dir.path()))
        .convert("doc.mock")
        .unwrap_err();

    assert!(matches!(err, Error::Render(_)));
    assert!(!dir.path().join("doc.md").exists());
    assert!(!dir.path().join("images/doc_image1.png").exists());
    assert_eq!(fs::read_dir(dir.path().join("images")).unwrap().count(), 0);
}

#[test]
fn test_failed_rerun_keeps_earlier_output() {
    let dir = tempfile::tempdir().unwrap();
    let first = converter_for(sample_extraction(), ConvertOptions::new(dir.path()))
        .convert("doc.mock")
        .unwrap();

    let mut broken = sample_extraction();
    broken.assets[0].data = b"second run".to_vec();
    broken.blocks.push(ContentBlock::pending_image(AssetId(9)));
    let err = converter_for(broken, ConvertOptions::new(dir.path()))
        .convert("doc.mock")
        .unwrap_err();
    assert!(matches!(err, Error::Render(_)));

    let markdown = fs::read_to_string(&first.markdown_path).unwrap();
    assert!(markdown.contains("![image_1](images/doc_image1.png)"));
    let image = dir.path().join("images/doc_image1.png");
    assert_eq!(fs::read(&image).unwrap(), b"fake png");
    assert_eq!(fs::read_dir(dir.path().join("images")).unwrap().count(), 1);
}

#[test]
fn test_unwritable_output_root_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("taken");
    fs::write(&root, b"a file, not a directory").unwrap();

    let err = converter_for(sample_extraction(), ConvertOptions::new(&root))
        .convert("doc.mock")
        .unwrap_err();
    match err {
        Error::Write { path, .. } => assert_eq!(path, root),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_bookmark_outline_survives_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let extraction = Extraction {
        outline: vec![
            OutlineNode::new(1, "Chapter 1"),
            OutlineNode::new(2, "Section 1.1"),
            OutlineNode::new(1, "Chapter 2"),
        ],
        outline_source: OutlineSource::Bookmarks,
        blocks: vec![ContentBlock::paragraph("Body text.")],
        ..Default::default()
    };

    let result = converter_for(extraction, ConvertOptions::new(dir.path()))
        .convert("book.mock")
        .unwrap();

    let markdown = fs::read_to_string(&result.markdown_path).unwrap();
    assert!(markdown.starts_with("---\n"));
    assert!(markdown.ends_with("Body text.\n"));

    let reloaded = ConversionResult::reload(&result.markdown_path).unwrap();
    assert_eq!(reloaded.outline, result.outline);
    assert_eq!(reloaded.full_text, result.full_text);
    assert_eq!(reloaded.image_files, result.image_files);
}

#[test]
fn test_reload_from_headings() {
    let dir = tempfile::tempdir().unwrap();
    let result = converter_for(sample_extraction(), ConvertOptions::new(dir.path()))
        .convert("doc.mock")
        .unwrap();

    let reloaded = ConversionResult::reload(&result.markdown_path).unwrap();
    assert_eq!(reloaded.outline, result.outline);
    assert_eq!(reloaded.full_text, result.full_text);
    assert_eq!(reloaded.image_files, result.image_files);
}

#[test]
fn test_frontmatter_includes_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let mut extraction = sample_extraction();
    extraction.metadata.format = Some(DocumentFormat::Word);
    extraction.metadata.title = Some("Quarterly".to_string());

    let options = ConvertOptions::new(dir.path()).with_frontmatter(true);
    let result = converter_for(extraction, options).convert("doc.mock").unwrap();

    let markdown = fs::read_to_string(&result.markdown_path).unwrap();
    assert!(markdown.starts_with("---\n"));
    assert!(markdown.contains("Quarterly"));
    assert!(markdown.contains("# Intro"));
}

#[test]
fn test_cancelled_conversion_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let options = ConvertOptions::new(dir.path()).with_cancel(Arc::new(AtomicBool::new(true)));

    let err = converter_for(sample_extraction(), options)
        .convert("doc.mock")
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(!dir.path().join("doc.md").exists());
}

#[test]
fn test_convert_many_in_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let converter = converter_for(sample_extraction(), ConvertOptions::new(dir.path()));

    let results = converter.convert_many(&["a.mock", "b.mock", "c.txt"]);
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(Error::UnsupportedFormat { .. })));

    assert!(dir.path().join("a.md").is_file());
    assert!(dir.path().join("b.md").is_file());
    assert!(dir.path().join("images/a_image1.png").is_file());
    assert!(dir.path().join("images/b_image1.png").is_file());
}

#[test]
fn test_repeat_conversion_is_deterministic() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let a = converter_for(sample_extraction(), ConvertOptions::new(first.path()))
        .convert("doc.mock")
        .unwrap();
    let b = converter_for(sample_extraction(), ConvertOptions::new(second.path()))
        .convert("doc.mock")
        .unwrap();

    assert_eq!(
        fs::read_to_string(a.markdown_path).unwrap(),
        fs::read_to_string(b.markdown_path).unwrap()
    );
    assert_eq!(a.image_files, b.image_files);
}

#[test]
fn test_registry_register_overrides() {
    let mut registry = AdapterRegistry::with_defaults();
    assert!(!registry.supports("mock"));
    registry.register(Arc::new(MockAdapter::new(Extraction::default())));
    assert!(registry.supports("MOCK"));
    assert_eq!(registry.get_by_name("mock").unwrap().name(), "mock");
}
