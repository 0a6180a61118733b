//! Outgoing response type, the [`IntoResponse`] conversion trait and the
//! render sink.
//!
//! A [`Response`] is a status code plus a body. The body stays a typed value
//! (text, a JSON document, raw bytes) until [`Response::render`] turns it into
//! wire bytes at the transport boundary, so hooks can still inspect or replace
//! it on the way out.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values for raw byte bodies, see [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Csv,         // text/csv
    EventStream, // text/event-stream  (SSE)
    Html,        // text/html; charset=utf-8
    OctetStream, // application/octet-stream
    Pdf,         // application/pdf
    Xml,         // application/xml
}

impl ContentType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Body ──────────────────────────────────────────────────────────────────────

/// A response body, kept typed until rendering.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Empty,
    Text(String),
    Json(Value),
    Bytes(ContentType, Vec<u8>),
}

impl Body {
    fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty          => None,
            Self::Text(_)        => Some("text/plain; charset=utf-8"),
            Self::Json(_)        => Some("application/json"),
            Self::Bytes(ct, _)   => Some(ct.as_str()),
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Empty          => Vec::new(),
            Self::Text(s)        => s.into_bytes(),
            Self::Json(v)        => serde_json::to_vec(&v).unwrap_or_default(),
            Self::Bytes(_, b)    => b,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing response: an ordered pair of status and body, plus any extra
/// headers.
///
/// ```rust
/// use railyard::Response;
/// use http::StatusCode;
/// use serde_json::json;
///
/// Response::json(json!({"id": 1}));
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// Response::json_ok(json!([1, 2, 3]), StatusCode::OK);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(json!({"id": 42}));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Response {
    /// `200 OK` with a JSON body.
    ///
    /// A value that cannot be serialised yields `500` with an empty body.
    pub fn json(body: impl Serialize) -> Self {
        Self::builder().json(body)
    }

    /// Renders `body` as JSON with the given status.
    pub fn json_ok(body: impl Serialize, status: StatusCode) -> Self {
        Self::builder().status(status).json(body)
    }

    /// `200 OK` with a plain-text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: Vec::new(), body: Body::Empty }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Body { &self.body }

    /// Render sink: serialises the body and produces the wire response.
    ///
    /// Headers whose name or value is not valid HTTP are dropped with a
    /// warning rather than failing the whole response.
    pub fn render(self) -> http::Response<Full<Bytes>> {
        let content_type = self.body.content_type();
        let mut res = http::Response::new(Full::new(Bytes::from(self.body.into_bytes())));
        *res.status_mut() = self.status;

        if let Some(ct) = content_type {
            res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        for (name, value) in self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => {
                    res.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: impl Serialize) -> Response {
        match serde_json::to_value(body) {
            Ok(value) => self.finish(Body::Json(value)),
            Err(e) => {
                warn!(error = %e, "response body failed to serialise");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(Body::Text(body.into()))
    }

    /// Terminate with a raw byte body (XML, HTML, binary, SSE, etc.).
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(Body::Bytes(content_type, body))
    }

    /// Terminate with no body (e.g. `204 No Content`, redirects).
    pub fn no_body(self) -> Response {
        self.finish(Body::Empty)
    }

    fn finish(self, body: Body) -> Response {
        Response { status: self.status, headers: self.headers, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into a [`Response`].
///
/// Implement on your own types to return them directly from actions.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a bare status from an action: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}
