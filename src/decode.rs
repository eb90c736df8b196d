//! Decodes the `{total, offset, limit, data[]}` index envelope into
//! [`Entry`] values.

use serde_json::Value;

use crate::entry::{Entry, EntryValue, strip_quotes};
use crate::error::Error;

/// One decoded page.
#[derive(Debug, Clone)]
pub struct Page {
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub data: Vec<Entry>,
}

/// Decodes a raw JSON response body into a [`Page`].
///
/// Enforces all four fields present and correctly typed
/// (`total`/`offset`/`limit` integers, not strings; `data` a sequence),
/// else [`Error::InvalidResponse`].
pub fn decode_page(body: &str) -> Result<Page, Error> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| Error::Decoding(format!("invalid JSON: {e}")))?;
    let Value::Object(obj) = value else {
        return Err(Error::InvalidResponse(
            "top-level response is not a JSON object".to_string(),
        ));
    };

    let total = require_uint(&obj, "total")?;
    let offset = require_uint(&obj, "offset")?;
    let limit = require_uint(&obj, "limit")?;
    if limit == 0 {
        return Err(Error::InvalidResponse(
            "limit must be a positive integer".to_string(),
        ));
    }

    let data = obj
        .get("data")
        .ok_or_else(|| Error::InvalidResponse("missing field 'data'".to_string()))?;
    let Value::Array(items) = data else {
        return Err(Error::InvalidResponse(
            "field 'data' must be an array".to_string(),
        ));
    };

    let entries = items.iter().map(decode_entry).collect::<Result<_, _>>()?;

    Ok(Page {
        total,
        offset,
        limit,
        data: entries,
    })
}

fn require_uint(obj: &serde_json::Map<String, Value>, field: &str) -> Result<u64, Error> {
    match obj.get(field) {
        None => Err(Error::InvalidResponse(format!("missing field '{field}'"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| Error::InvalidResponse(format!("field '{field}' is not a non-negative integer"))),
        Some(_) => Err(Error::InvalidResponse(format!(
            "field '{field}' must be an integer, not a string or other type"
        ))),
    }
}

fn decode_entry(value: &Value) -> Result<Entry, Error> {
    let Value::Object(obj) = value else {
        return Err(Error::InvalidResponse(
            "each element of 'data' must be an object".to_string(),
        ));
    };
    // serde_json::Map preserves insertion order and already resolves duplicate
    // keys last-write-wins during parsing, matching the decoder's rule.
    let entry = obj
        .iter()
        .map(|(k, v)| (k.clone(), decode_leaf(v)))
        .collect();
    Ok(entry)
}

fn decode_leaf(value: &Value) -> EntryValue {
    match value {
        Value::String(s) => EntryValue::String(strip_quotes(s)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                EntryValue::Integer(i)
            } else {
                EntryValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::Bool(b) => EntryValue::Bool(*b),
        Value::Null => EntryValue::Null,
        Value::Object(obj) => EntryValue::Object(obj.clone()),
        Value::Array(arr) => EntryValue::Array(arr.clone()),
    }
}
