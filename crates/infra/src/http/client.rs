use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use tokenline_core::HttpTransport;
use tokenline_domain::{
    HttpMethod, MultipartPart, OutgoingRequest, RawResponse, RequestBody, TransportError,
};
use tracing::debug;

use crate::errors::{InfraError, IntoTransportError};

/// reqwest-backed transport
///
/// Sends requests exactly as decorated by the session layer. It does not
/// retry: failed refreshes are rescheduled by the coordinator and API calls
/// surface their failure to the caller.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `InfraError::HttpClient` if the TLS backend cannot be set up.
    pub fn new() -> Result<Self, InfraError> {
        Self::builder().build()
    }

    fn prepare(&self, request: OutgoingRequest) -> Result<RequestBuilder, TransportError> {
        let mut builder = self.client.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| TransportError::Request(format!("failed to encode JSON body: {e}")))?;
                builder.body(bytes)
            }
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };
        Ok(builder)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        let method = request.method;
        let url = request.url.clone();
        debug!(%method, %url, "sending HTTP request");

        let response = self.prepare(request)?.send().await.map_err(|err| {
            debug!(%method, %url, error = %err, "HTTP request failed");
            err.into_transport()
        })?;

        let status = response.status().as_u16();
        debug!(%method, %url, status, "received HTTP response");

        let body = response.text().await.map_err(IntoTransportError::into_transport)?;
        Ok(RawResponse::new(status, body))
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn multipart_form(parts: Vec<MultipartPart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        let mut body = Part::bytes(part.data);
        if let Some(file_name) = part.file_name {
            body = body.file_name(file_name);
        }
        if let Some(content_type) = part.content_type {
            body = body.mime_str(&content_type).map_err(IntoTransportError::into_transport)?;
        }
        form = form.part(part.name, body);
    }
    Ok(form)
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: None,
            user_agent: Some(concat!("tokenline/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: None,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Total time allowed for one request, body included
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// # Errors
    /// Returns `InfraError::HttpClient` if reqwest rejects the configuration.
    pub fn build(self) -> Result<ReqwestTransport, InfraError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout);

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| InfraError::HttpClient(err.to_string()))?;

        Ok(ReqwestTransport { client })
    }
}
