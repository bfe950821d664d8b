//! Request/response model shared by the engine and the transport
//!
//! The engine decorates an [`OutgoingRequest`] and hands it to whatever
//! transport adapter is plugged in; the adapter answers with a
//! [`RawResponse`] that the client classifies into an [`ApiResponse`] or an
//! error.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl MultipartPart {
    /// Plain text field
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    /// File field
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data,
        }
    }
}

/// Request payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartPart>),
}

impl RequestBody {
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// A request about to be sent
///
/// Header names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl OutgoingRequest {
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: RequestBody::Empty }
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Value of the first header named `name`
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Replace every header named `name` with a single value
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_header(&name);
        self.headers.push((name, value.into()));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    }
}

/// Status and body as received from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as JSON: `null` when empty, a JSON string when not JSON
    #[must_use]
    pub fn content(&self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

/// Successful API response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content: Value,
}

/// Coarse permission granted by the configured scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Endpoints reachable with a `public` scope
    Public,
    /// Internal endpoints, need a `private` scope
    Private,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Private => "private",
        })
    }
}

/// A gated API call as issued by endpoint wrappers
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub capability: Capability,
    pub method: HttpMethod,
    /// Path relative to the API base
    pub path: String,
    pub body: RequestBody,
    pub expected_status: u16,
}

impl ApiCall {
    #[must_use]
    pub fn new(capability: Capability, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            capability,
            method,
            path: path.into(),
            body: RequestBody::Empty,
            expected_status: 200,
        }
    }

    #[must_use]
    pub fn get(capability: Capability, path: impl Into<String>) -> Self {
        Self::new(capability, HttpMethod::Get, path)
    }

    #[must_use]
    pub fn post(capability: Capability, path: impl Into<String>, body: RequestBody) -> Self {
        Self::new(capability, HttpMethod::Post, path).with_body(body)
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }
}
