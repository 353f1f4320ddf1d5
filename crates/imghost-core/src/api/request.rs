//! Transport-neutral HTTP request and response values.
//!
//! The core never performs I/O. Stores hand out [`HttpRequest`] values and
//! accept a [`Reply`] once the host environment (the browser's `fetch` in the
//! WASM crate, a fake service in tests) has delivered them.

use serde_json::Value;
use thiserror::Error;

/// HTTP verbs used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// One file in a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    /// Form field name (the service expects `file`).
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Vec<FilePart>),
}

/// A fully described request, ready for a transport to send.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute or origin-relative URL including the query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The path component of the URL, without query string or origin.
    pub fn path(&self) -> &str {
        let without_origin = match self.url.find("://") {
            Some(scheme_end) => {
                let rest = &self.url[scheme_end + 3..];
                rest.find('/').map_or("/", |slash| &rest[slash..])
            }
            None => self.url.as_str(),
        };
        without_origin
            .split_once('?')
            .map_or(without_origin, |(path, _)| path)
    }

    /// The JSON body, if any.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a response carrying a JSON document.
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures where no HTTP response was received at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The request could not reach the service
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout
    #[error("Request timed out after {0} ms")]
    Timeout(u32),
}

/// What a transport hands back for one request.
pub type Reply = Result<HttpResponse, TransportError>;

/// Append `key=value` pairs to a path using `application/x-www-form-urlencoded`
/// escaping.
pub(crate) fn with_query(path: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", form_encode(key), form_encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

/// Percent-encode one path segment; only RFC 3986 unreserved bytes pass.
pub(crate) fn path_segment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn form_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'*' | b'-' | b'.' | b'_' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_query_encodes_values() {
        let url = with_query(
            "/api/images",
            &[("page", "1".to_string()), ("q", "sun set&sea".to_string())],
        );
        assert_eq!(url, "/api/images?page=1&q=sun+set%26sea");
    }

    #[test]
    fn test_with_query_utf8() {
        let url = with_query("/api/images", &[("tag", "猫".to_string())]);
        assert_eq!(url, "/api/images?tag=%E7%8C%AB");
    }

    #[test]
    fn test_with_query_empty() {
        assert_eq!(with_query("/api/tags", &[]), "/api/tags");
    }

    #[test]
    fn test_request_path_strips_origin_and_query() {
        let request = HttpRequest {
            method: Method::Get,
            url: "https://img.example/api/images?page=2".to_string(),
            headers: vec![],
            body: Body::Empty,
        };
        assert_eq!(request.path(), "/api/images");

        let relative = HttpRequest {
            url: "/api/tags".to_string(),
            ..request
        };
        assert_eq!(relative.path(), "/api/tags");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest {
            method: Method::Get,
            url: "/".to_string(),
            headers: vec![("Authorization".to_string(), "Bearer t".to_string())],
            body: Body::Empty,
        };
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::json(200, &json!({})).is_success());
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(!HttpResponse::new(401, Vec::new()).is_success());
    }
}
