use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::app::{ResolveError, Result};
use crate::client::{ProbeRequest, ProbeResponse, RedirectClient};

pub const DEFAULT_USER_AGENT: &str = "urlsetter/0.1.0";

pub struct HttpRedirectClient {
    client: Client,
}

impl HttpRedirectClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RedirectClient for HttpRedirectClient {
    async fn send(&self, request: &ProbeRequest) -> std::result::Result<ProbeResponse, ResolveError> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(ProbeResponse::new(response.status(), location))
    }
}
