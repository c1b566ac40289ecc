//! `reqwest`-backed HTTP transport.

use crate::domain::config::ApiConfig;
use crate::domain::types::HttpMethod;
use crate::ports::outbound::{HttpTransport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::{Client, Method};

/// Production transport over a pooled `reqwest` client
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(api: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(api.request_timeout)
            .connect_timeout(api.connect_timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client })
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

fn classify(e: reqwest::Error) -> TransportError {
    // Strip the URL so query strings never reach error text
    let e = e.without_url();
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(method(request.method), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
