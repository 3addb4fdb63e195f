//! Extraction of the image reference from loosely-shaped backend payloads.
//!
//! Workflow engines wrap their output differently depending on how the
//! workflow was wired: a bare object, a single-element array, and any of a
//! handful of field names. [`normalize`] accepts all of them.

use serde_json::Value;

use crate::error::{GenError, Result};

/// Fields probed by [`normalize`], highest priority first.
pub const WEBHOOK_FIELDS: [&str; 4] = ["output", "url", "image", "data"];

/// Fields returned by custom user endpoints, highest priority first.
pub const CUSTOM_ENDPOINT_FIELDS: [&str; 2] = ["image", "url"];

/// Extract the image URL from a webhook response.
///
/// ```
/// use serde_json::json;
/// use zimage_client::normalize;
///
/// assert_eq!(normalize(&json!({"output": "x"})).unwrap(), "x");
/// assert_eq!(normalize(&json!([{"url": "y"}])).unwrap(), "y");
/// ```
pub fn normalize(payload: &Value) -> Result<String> {
    extract_image_field(payload, &WEBHOOK_FIELDS)
}

/// Extract the first present, non-empty string among `fields`.
///
/// Arrays are unwrapped to their first element; an empty array is an error
/// rather than "no image".
pub fn extract_image_field(payload: &Value, fields: &[&str]) -> Result<String> {
    let object = match payload {
        Value::Array(items) => items.first().ok_or(GenError::EmptyResponse)?,
        other => other,
    };

    let found = fields.iter().find_map(|field| {
        object
            .get(field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    });

    match found {
        Some(url) => Ok(url.to_string()),
        None => {
            tracing::warn!(
                keys = ?available_keys(object),
                "Response did not contain a recognized image field"
            );
            Err(GenError::UnrecognizedResponse {
                available_keys: available_keys(object),
            })
        }
    }
}

fn available_keys(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}
