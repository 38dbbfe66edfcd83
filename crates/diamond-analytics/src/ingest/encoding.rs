//! Text decoding for raw uploads.

use crate::error::{PipelineError, Result};

const BOM: char = '\u{feff}';

/// Decode raw bytes as UTF-8 text.
///
/// A leading byte-order mark is dropped. Any control character other than
/// tab, carriage return or line feed marks the input as binary.
pub fn decode_text(raw: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        PipelineError::Encoding(format!(
            "input is not valid UTF-8 text (invalid byte at offset {})",
            e.valid_up_to()
        ))
    })?;
    let text = text.strip_prefix(BOM).unwrap_or(text);

    if let Some((offset, c)) = text
        .char_indices()
        .find(|(_, c)| c.is_control() && !matches!(c, '\t' | '\r' | '\n'))
    {
        return Err(PipelineError::Encoding(format!(
            "input contains binary data (control character U+{:04X} at offset {})",
            c as u32, offset
        )));
    }

    Ok(text)
}
