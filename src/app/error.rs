use std::error::Error as StdError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UrlsetterError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, UrlsetterError>;

/// Errors that end a single resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gave up after {0} redirects")]
    TooManyRedirects(usize),
}

impl ResolveError {
    /// Stable label for analytics.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Network(e) if e.is_timeout() => "TimeoutError",
            ResolveError::Network(_) | ResolveError::Io(_) => "NetworkError",
            ResolveError::TooManyRedirects(_) => "TooManyRedirects",
        }
    }

    /// Renders the error followed by every `source()` in its chain, one per line.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            rendered.push_str("\ncaused by: ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_network_kind() {
        let err = ResolveError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(err.kind(), "NetworkError");
        assert_eq!(err.to_string(), "I/O error: connection refused");
    }

    #[test]
    fn test_too_many_redirects_kind() {
        let err = ResolveError::TooManyRedirects(10);
        assert_eq!(err.kind(), "TooManyRedirects");
        assert_eq!(err.chain(), "gave up after 10 redirects");
    }

    #[test]
    fn test_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = UrlsetterError::Resolve(ResolveError::Io(inner));
        let mut rendered = err.to_string();
        if let Some(source) = err.source() {
            rendered.push_str(&source.to_string());
        }
        assert!(rendered.contains("timed out"));
    }
}
