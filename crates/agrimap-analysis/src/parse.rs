//! Lenient parsing of vision-model JSON output.
//!
//! Models frequently fence their JSON in markdown or wrap a bare array in
//! a single-key object even when the prompt asks for a plain payload; the
//! helpers here tolerate both before giving up.

use serde::de::DeserializeOwned;

/// Strip a markdown code fence (``` or ```json) wrapping the payload.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_end_matches('`').trim()
}

/// Try to parse a JSON string as `T`. If it's an object wrapping a single
/// array value (e.g. `{"zones": [...]}`), unwrap the array and parse that
/// instead; a bare object is retried as a one-element array.
pub(crate) fn parse_json_lenient<T: DeserializeOwned>(
    raw: &str,
) -> std::result::Result<T, serde_json::Error> {
    let raw = strip_code_fence(raw);

    // Try direct parse first
    let direct_err = match serde_json::from_str::<T>(raw) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    if let Ok(obj) = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw) {
        // Case 1: object wrapping an array value, e.g. {"zones": [...]}
        for (_key, value) in &obj {
            if value.is_array() {
                if let Ok(v) = serde_json::from_str::<T>(&value.to_string()) {
                    return Ok(v);
                }
            }
        }
        // Case 2: bare single object that should be an array element
        let wrapped = serde_json::Value::Array(vec![serde_json::Value::Object(obj)]);
        if let Ok(v) = serde_json::from_value::<T>(wrapped) {
            return Ok(v);
        }
    }

    Err(direct_err)
}
