pub mod http_client;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::app::ResolveError;

pub use http_client::HttpRedirectClient;

/// A single probe against a candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: Method,
    pub url: Url,
}

impl ProbeRequest {
    /// HEAD avoids downloading the body of the page we are only locating.
    pub fn head(url: Url) -> Self {
        Self {
            method: Method::HEAD,
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: StatusCode,
    /// Raw `Location` header, when present and valid UTF-8
    pub location: Option<String>,
}

impl ProbeResponse {
    pub fn new(status: StatusCode, location: Option<String>) -> Self {
        Self { status, location }
    }

    /// 301, 302, 303 and 307 continue the chain; every other status ends it.
    pub fn is_redirect(&self) -> bool {
        matches!(
            self.status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
        )
    }
}

#[async_trait]
pub trait RedirectClient {
    /// Issue one request without following redirects.
    async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse, ResolveError>;
}
