use once_cell::sync::Lazy;
use regex::Regex;

static REQUEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GET|POST|PUT|DELETE|HEAD)\s+(\S+)\sHTTP/\d+(\.\d+)?").expect("valid regex")
});

static RESPONSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HTTP/\d+(\.\d+)?\s+(\d+)").expect("valid regex"));

/// What an application-layer payload's UTF-8 interpretation matched, if
/// anything (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preamble {
    /// An HTTP request line.
    Request {
        /// HTTP method.
        method: String,
        /// Request URL (path/query string).
        url: String,
    },
    /// An HTTP response status line.
    Response {
        /// Response status code, as text.
        status: String,
    },
}

/// Match `text` against the request and response preamble patterns, request
/// first. Neither match is attempted against non-UTF-8 payloads.
#[must_use]
pub fn match_preamble(text: &str) -> Option<Preamble> {
    if let Some(caps) = REQUEST_RE.captures(text) {
        return Some(Preamble::Request {
            method: caps[1].to_string(),
            url: caps[2].to_string(),
        });
    }
    if let Some(caps) = RESPONSE_RE.captures(text) {
        return Some(Preamble::Response {
            status: caps[2].to_string(),
        });
    }
    None
}
