//! Plain text rendering.

use crate::model::ContentBlock;

/// Concatenate heading and paragraph text in block order, one `\n` after each.
///
/// Tables, images and blank markers contribute nothing.
pub fn full_text(blocks: &[ContentBlock]) -> String {
    let mut output = String::new();
    for text in blocks.iter().filter_map(ContentBlock::text) {
        output.push_str(text);
        output.push('\n');
    }
    output
}
