//! JSON export of parse results.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::ParseResult;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize a parse result to JSON.
///
/// Non-ASCII text is written as UTF-8, not escaped.
pub fn to_json(result: &ParseResult, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(result)?,
        JsonFormat::Compact => serde_json::to_string(result)?,
    };
    Ok(json)
}

/// Write a parse result as JSON, creating missing parent directories.
pub fn save_json<P: AsRef<Path>>(result: &ParseResult, path: P, format: JsonFormat) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(result, format)?)?;
    log::debug!("wrote {}", path.display());
    Ok(())
}
