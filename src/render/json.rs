//! JSON rendering for conversion results.

use crate::error::{Error, Result};
use crate::model::ConversionResult;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a conversion result to JSON.
pub fn to_json(result: &ConversionResult, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(result),
        JsonFormat::Compact => serde_json::to_string(result),
    };

    json.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentMetadata, OutlineNode};
    use crate::render::ExtractionStats;
    use std::path::PathBuf;

    fn sample() -> ConversionResult {
        let mut metadata = DocumentMetadata::default();
        metadata.title = Some("Test".to_string());
        ConversionResult {
            outline: vec![OutlineNode::new(1, "Intro")],
            full_text: "Intro\n".to_string(),
            markdown_path: PathBuf::from("out/doc.md"),
            image_files: vec!["images/doc_image1.png".to_string()],
            metadata,
            stats: ExtractionStats::default(),
        }
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("images/doc_image1.png"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outline"][0]["title"], "Intro");
    }
}
