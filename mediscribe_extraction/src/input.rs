//! Transcript files on disk.

use mediscribe_core::InputError;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;

/// Keys checked, in order, for the transcript in a JSON payload.
const TEXT_KEYS: [&str; 2] = ["text", "transcription"];

/// Read a transcript from `path`.
///
/// `.json` files are parsed as a payload and reduced with
/// [`transcript_from_json`]; anything else is returned as-is.
///
/// # Errors
/// Returns [`InputError::NotFound`] for a missing file, and
/// [`InputError::Read`] or [`InputError::Json`] if it cannot be loaded.
pub fn read_transcript(path: &Path) -> Result<String, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            InputError::NotFound(path.to_path_buf())
        } else {
            InputError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Ok(content);
    }

    let payload: Value = serde_json::from_str(&content).map_err(|source| InputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(transcript_from_json(&payload))
}

/// First non-empty string under `text` or `transcription`; otherwise the
/// whole payload as compact JSON.
#[must_use]
pub fn transcript_from_json(payload: &Value) -> String {
    TEXT_KEYS
        .iter()
        .find_map(|key| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .map_or_else(|| payload.to_string(), str::to_string)
}
