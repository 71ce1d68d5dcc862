use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An outbound call. URLs are absolute; headers are applied in order.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_string(body).context("http: encode request body")?;
        self.headers
            .push((CONTENT_TYPE.as_str().to_string(), "application/json".into()));
        self.body = Some(encoded);
        Ok(self)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Sends requests and hands back whatever status the server answered with.
/// Only failures to reach the server or read its reply are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Response>;
}

#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct ReqwestTransport {
    http: HttpClient,
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()
                .context("http: build client")?,
        };
        let user_agent = if config.user_agent.trim().is_empty() {
            format!("blog-feed/{}", crate::VERSION)
        } else {
            config.user_agent
        };
        Ok(Self { http, user_agent })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let mut req = self
            .http
            .request(request.method.clone(), &request.url)
            .header(USER_AGENT, self.user_agent.clone())
            .header(ACCEPT, "application/json");
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let resp = req
            .send()
            .with_context(|| format!("http: {} {}", request.method, request.url))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .with_context(|| format!("http: read body of {}", request.url))?;
        Ok(Response { status, body })
    }
}
