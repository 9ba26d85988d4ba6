//! # Reqwest Transport
//!
//! Default [`Transport`] backed by a pooled `reqwest::Client`.

use async_trait::async_trait;
use pay_core::{
    Headers, HttpRequest, HttpResponse, Method, PaymentError, PaymentResult, RequestBody,
    ResponseBody, SharedTransport, Transport,
};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Transport over `reqwest`. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> PaymentResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("paybridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaymentError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Shared handle for provider construction
    pub fn shared() -> PaymentResult<SharedTransport> {
        Ok(Arc::new(Self::new()?))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> PaymentResult<HttpResponse> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        builder = match &request.body {
            Some(RequestBody::Json(body)) => builder.json(body),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            warn!("HTTP request failed: {}", e);
            PaymentError::TransportError(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PaymentError::TransportError(e.to_string()))?;

        debug!(status, bytes = bytes.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body: ResponseBody::from_bytes(&bytes),
        })
    }
}
