//! Turns raw generation-service text into a [`GenerationAssets`] record.

use serde_json::Value;
use tracing::warn;

use crate::error::{DemoError, ServiceError};
use crate::models::{GenerationAssets, GenerationResult};

/// JSON keys that sometimes leak into the tail of the component source.
pub const LEAKAGE_MARKERS: [&str; 3] = [
    "\",\"designRationale\"",
    "\", \"designRationale\"",
    "\",\"layoutStrategy\"",
];

pub fn sanitize(raw: &str) -> Result<GenerationAssets, DemoError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::Empty.into());
    }

    let cleaned = strip_fences(raw);
    let body = slice_braces(cleaned.trim());
    let mut result: GenerationResult = match serde_json::from_str(body) {
        Ok(result) => result,
        Err(first) => {
            warn!("⚠️ Response did not parse ({first}), retrying after repair");
            serde_json::from_str(&repair(body))
                .map_err(|e| DemoError::MalformedResponse(e.to_string()))?
        }
    };

    result.react_component_code = truncate_leakage(&result.react_component_code).to_string();
    let mock_data = parse_mock_data(&result.json_code)?;
    Ok(GenerationAssets { result, mock_data })
}

/// Removes ```` ``` ```` markers together with a directly attached language tag.
pub fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find("```") {
        out.push_str(&rest[..at]);
        rest = &rest[at + 3..];
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out
}

fn slice_braces(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(first), Some(last)) if first < last => &text[first..=last],
        _ => text,
    }
}

/// Second-chance cleanup: stray backticks and a BOM at the edges, and raw
/// control characters inside string literals escaped.
fn repair(text: &str) -> String {
    let trimmed = strip_fences(text);
    let trimmed = trimmed.trim_matches(|c: char| c.is_whitespace() || c == '`' || c == '\u{feff}');
    let mut out = String::with_capacity(trimmed.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in trimmed.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

/// Cuts the source at the first occurrence of the first marker present.
pub fn truncate_leakage(code: &str) -> &str {
    for marker in LEAKAGE_MARKERS {
        if let Some(at) = code.find(marker) {
            warn!(marker, "✂️ Truncating leaked JSON keys from component source");
            return &code[..at];
        }
    }
    code
}

pub fn parse_mock_data(json_code: &str) -> Result<Vec<Value>, DemoError> {
    let parsed: Value = match serde_json::from_str(json_code) {
        Ok(value) => value,
        Err(first) => {
            warn!("⚠️ Failed to parse jsonCode directly ({first}), trying to fix");
            serde_json::from_str(strip_fences(json_code).trim())
                .map_err(|e| DemoError::MalformedMockData(e.to_string()))?
        }
    };
    match parsed {
        Value::Array(items) if items.iter().all(Value::is_object) => Ok(items),
        _ => Err(DemoError::MalformedMockData(
            "jsonCode must be an array of objects".to_string(),
        )),
    }
}
