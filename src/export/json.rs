use super::{Export, ExportError, Formatter};

/// Pretty-printed JSON of the whole export, posts included.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, export: &Export) -> Result<Vec<u8>, ExportError> {
        let mut bytes = serde_json::to_vec_pretty(export)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
