//! Response model for outbound API calls

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Response;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

/// Wall-clock timing of a call (epoch milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    pub start: i64,
    pub end: i64,
    pub duration: u64,
}

/// Response of an outbound call, with the body already decoded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub timing: Timing,
}

/// Header map flattened to strings; repeated headers are comma-joined
pub(crate) fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut flat: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

/// Decode the body according to its content type.
///
/// JSON falls back to text when it does not parse; unknown types are reported
/// as `{_binary, size, contentType}` without keeping the payload.
pub(crate) async fn read_body(mut response: Response) -> Value {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_lowercase);

    match content_type.as_deref() {
        Some(ct) if ct.contains("application/json") || ct.contains("+json") => {
            match response.bytes().await {
                Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }),
                Err(e) => {
                    warn!("Failed to read JSON response body: {}", e);
                    Value::Null
                }
            }
        }
        Some(ct) if !ct.starts_with("text/") => {
            let mut size: u64 = 0;
            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => size += chunk.len() as u64,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read binary response body: {}", e);
                        break;
                    }
                }
            }
            json!({ "_binary": true, "size": size, "contentType": ct })
        }
        // text/* and responses without a content type
        _ => match response.text().await {
            Ok(text) => Value::String(text),
            Err(e) => {
                warn!("Failed to read text response body: {}", e);
                Value::Null
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_flatten_joins_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("x-request-id", HeaderValue::from_static("42"));

        let flat = flatten_headers(&headers);
        assert_eq!(flat["set-cookie"], "a=1, b=2");
        assert_eq!(flat["x-request-id"], "42");
    }
}
