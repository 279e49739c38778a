//! Content-type aware payload decoding.
//!
//! Gateways answer in JSON; webhook notifications arrive as JSON or
//! form-encoded bodies depending on the platform. `parse_payload` turns
//! either into a `serde_json::Value` keyed by the `Content-Type` header.

use std::collections::HashMap;

use crate::error::AdapterError;

/// Parse a request/response body into JSON based on its content type.
///
/// Supports:
/// - `application/json`
/// - `application/x-www-form-urlencoded` (values become JSON strings)
///
/// Bodies without a recognized content type are tried as JSON; anything
/// else errors with a body preview so upstream HTML error pages are
/// diagnosable.
pub fn parse_payload(
    headers: &HashMap<String, String>,
    body: &[u8],
) -> Result<serde_json::Value, AdapterError> {
    let content_type = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.to_lowercase())
        .unwrap_or_default();

    if content_type.contains("application/json") {
        return serde_json::from_slice(body).map_err(|error| AdapterError::Parse(error.to_string()));
    }

    if content_type.contains("application/x-www-form-urlencoded") {
        return parse_form(body);
    }

    // No usable content type: try JSON before giving up
    let text = String::from_utf8_lossy(body);
    serde_json::from_str(text.trim()).map_err(|_| {
        let preview: String = text.chars().take(200).collect();
        AdapterError::Parse(format!(
            "unstructured payload (content-type: {:?}): {}",
            content_type, preview
        ))
    })
}

fn parse_form(body: &[u8]) -> Result<serde_json::Value, AdapterError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|error| AdapterError::Parse(error.to_string()))?;

    let mut map = serde_json::Map::new();
    for (key, value) in pairs {
        map.insert(key, serde_json::Value::String(value));
    }
    Ok(serde_json::Value::Object(map))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(content_type: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("Content-Type".to_string(), content_type.to_string());
        map
    }

    #[test]
    fn test_parse_json_body() {
        let payload = parse_payload(
            &headers("application/json; charset=utf-8"),
            br#"{"order_id": "order_1", "status": "PAID"}"#,
        )
        .unwrap();

        assert_eq!(payload["order_id"], "order_1");
        assert_eq!(payload["status"], "PAID");
    }

    #[test]
    fn test_parse_form_body() {
        let payload = parse_payload(
            &headers("application/x-www-form-urlencoded"),
            b"out_trade_no=order_1&trade_status=TRADE_SUCCESS",
        )
        .unwrap();

        assert_eq!(payload["out_trade_no"], "order_1");
        assert_eq!(payload["trade_status"], "TRADE_SUCCESS");
    }

    #[test]
    fn test_content_type_lookup_is_case_insensitive() {
        let mut map = HashMap::new();
        map.insert("content-type".to_string(), "APPLICATION/JSON".to_string());

        let payload = parse_payload(&map, br#"{"ok": true}"#).unwrap();
        assert_eq!(payload["ok"], true);
    }

    #[test]
    fn test_missing_content_type_falls_back_to_json() {
        let payload = parse_payload(&HashMap::new(), br#" {"ok": 1} "#).unwrap();
        assert_eq!(payload["ok"], 1);
    }

    #[test]
    fn test_html_error_page_is_rejected_with_preview() {
        let result = parse_payload(&HashMap::new(), b"<html><body>502 Bad Gateway</body></html>");

        let error = result.unwrap_err();
        assert!(error.to_string().contains("502 Bad Gateway"));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result = parse_payload(&headers("application/json"), b"{not json");
        assert!(matches!(result, Err(AdapterError::Parse(_))));
    }
}
