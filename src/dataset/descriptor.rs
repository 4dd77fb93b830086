//! Dataset descriptor parsing.
//!
//! Wire format: `[{"imageURL": "...", "name": "...", "width": 0.1}, ...]`.
//! `width` is the physical card width in metres.

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use super::error::DatasetError;

/// One card of the remote dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDescriptor {
    pub image_url: Url,
    pub name: String,
    /// Physical width in metres.
    pub width: f64,
}

/// Parse a descriptor list.
///
/// The payload as a whole must be a JSON array, otherwise the batch fails.
/// Individual rows that are not objects, lack one of the three fields, carry
/// the wrong type, an unparsable URL or a non-positive width are skipped.
pub fn parse_descriptors(bytes: &[u8]) -> Result<Vec<MarkerDescriptor>, DatasetError> {
    let json: Value =
        serde_json::from_slice(bytes).map_err(|e| DatasetError::Malformed(e.to_string()))?;

    let rows = match json {
        Value::Array(rows) => rows,
        other => {
            return Err(DatasetError::Malformed(format!(
                "expected an array of objects, got {}",
                json_kind(&other)
            )));
        }
    };

    let mut descriptors = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        match descriptor_from_row(row) {
            Some(d) => descriptors.push(d),
            None => debug!("Skipping dataset row {}: {}", idx, row),
        }
    }
    Ok(descriptors)
}

fn descriptor_from_row(row: &Value) -> Option<MarkerDescriptor> {
    let obj = row.as_object()?;
    let image_url = obj
        .get("imageURL")
        .and_then(Value::as_str)
        .and_then(|s| Url::parse(s).ok())?;
    let name = obj.get("name").and_then(Value::as_str)?.to_string();
    let width = obj.get("width").and_then(Value::as_f64)?;

    if !width.is_finite() || width <= 0.0 {
        return None;
    }

    Some(MarkerDescriptor {
        image_url,
        name,
        width,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
