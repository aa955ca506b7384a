//! Minimal HTTP/1.1 request parsing and response encoding.
//!
//! Supports exactly what the endpoints need: a request line, headers, and a
//! body delimited by `Content-Length`. Chunked transfer and keep-alive are
//! not supported; every response closes the connection.

use serde::Serialize;

use crate::error::{ServerError, ServerResult};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

// ============================================================================
// Request
// ============================================================================

/// A fully received HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Path split into non-empty, percent-decoded segments.
    pub fn segments(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(percent_decode)
            .collect()
    }
}

/// Tries to parse one request from the front of `buf`.
///
/// Returns `Ok(None)` while the request is still incomplete, and the number
/// of bytes consumed once it is whole.
pub fn parse_request(buf: &[u8], limit: usize) -> ServerResult<Option<(HttpRequest, usize)>> {
    let Some(head_end) = find(buf, HEAD_TERMINATOR) else {
        if buf.len() > limit {
            return Err(ServerError::RequestTooLarge {
                size: buf.len(),
                limit,
            });
        }
        return Ok(None);
    };

    let head = std::str::from_utf8(&buf[..head_end])
        .map_err(|_| ServerError::BadRequest("request head is not UTF-8".to_string()))?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ServerError::BadRequest(format!(
            "malformed request line: {request_line:?}"
        )));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(ServerError::BadRequest(format!(
            "unsupported version: {version}"
        )));
    }

    let mut content_length = 0usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(ServerError::BadRequest(format!("malformed header: {line:?}")));
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value.trim().parse().map_err(|_| {
                ServerError::BadRequest(format!("invalid Content-Length: {}", value.trim()))
            })?;
        }
    }

    let body_start = head_end + HEAD_TERMINATOR.len();
    let total = body_start.saturating_add(content_length);
    if total > limit {
        return Err(ServerError::RequestTooLarge { size: total, limit });
    }
    if buf.len() < total {
        return Ok(None);
    }

    let path = target.split('?').next().unwrap_or_default().to_string();
    let request = HttpRequest {
        method: method.to_ascii_uppercase(),
        path,
        body: buf[body_start..total].to_vec(),
    };
    Ok(Some((request, total)))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decodes `%XX` escapes, leaving invalid escapes as they are.
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ============================================================================
// Response
// ============================================================================

/// An HTTP response ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    /// Serializes `value` as the JSON body.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::text(500, format!("failed to encode response: {e}")),
        }
    }

    /// `{"server_message": ...}`, the shape every endpoint uses for errors.
    pub fn message(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ServerMessage {
                server_message: message.into(),
            },
        )
    }

    /// Encodes the response with `Connection: close`.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

#[derive(Serialize)]
struct ServerMessage {
    server_message: String,
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
