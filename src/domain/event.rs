use std::collections::BTreeMap;
use std::sync::Arc;

use url::Url;

use crate::app::ResolveError;
use crate::idle::InFlight;

/// Everything that travels over the [`EventBus`](crate::bus::EventBus).
#[derive(Debug, Clone)]
pub enum UrlEvent {
    /// A URL that should be resolved over the network. The resolution counts
    /// as in flight until every copy of `in_flight` is dropped.
    ResolveRequest { origin: Url, in_flight: Arc<InFlight> },
    /// Same as `ResolveRequest`, for URLs on a known mobile-redirect host.
    ResolveFacebookRequest { origin: Url, in_flight: Arc<InFlight> },
    /// Final destination found, either live or from the cache.
    Resolved { origin: Url, resolved: Url },
    /// Resolution ended with an error; hosts fall back to `origin`.
    ResolutionFailed {
        origin: Url,
        error: Arc<ResolveError>,
    },
}

/// Tag of a [`UrlEvent`] variant, used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ResolveRequest,
    ResolveFacebookRequest,
    Resolved,
    ResolutionFailed,
}

impl EventKind {
    pub const REQUESTS: [EventKind; 2] =
        [EventKind::ResolveRequest, EventKind::ResolveFacebookRequest];
    pub const TERMINAL: [EventKind; 2] = [EventKind::Resolved, EventKind::ResolutionFailed];
    pub const ALL: [EventKind; 4] = [
        EventKind::ResolveRequest,
        EventKind::ResolveFacebookRequest,
        EventKind::Resolved,
        EventKind::ResolutionFailed,
    ];
}

impl UrlEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UrlEvent::ResolveRequest { .. } => EventKind::ResolveRequest,
            UrlEvent::ResolveFacebookRequest { .. } => EventKind::ResolveFacebookRequest,
            UrlEvent::Resolved { .. } => EventKind::Resolved,
            UrlEvent::ResolutionFailed { .. } => EventKind::ResolutionFailed,
        }
    }

    pub fn origin(&self) -> &Url {
        match self {
            UrlEvent::ResolveRequest { origin, .. }
            | UrlEvent::ResolveFacebookRequest { origin, .. }
            | UrlEvent::Resolved { origin, .. }
            | UrlEvent::ResolutionFailed { origin, .. } => origin,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UrlEvent::Resolved { .. } | UrlEvent::ResolutionFailed { .. }
        )
    }

    /// The URL a host should open: the destination, or the origin as fallback.
    pub fn target(&self) -> &Url {
        match self {
            UrlEvent::Resolved { resolved, .. } => resolved,
            other => other.origin(),
        }
    }

    /// Label/value pairs handed to the analytics sink.
    pub fn logging_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("Host".to_string(), host_of(self.origin()));

        match self {
            UrlEvent::ResolveRequest { .. } => {}
            UrlEvent::ResolveFacebookRequest { .. } => {
                params.insert("Source".to_string(), "Facebook".to_string());
            }
            UrlEvent::Resolved { resolved, .. } => {
                params.insert("ResolvedHost".to_string(), host_of(resolved));
            }
            UrlEvent::ResolutionFailed { error, .. } => {
                params.insert("Type".to_string(), error.kind().to_string());
                params.insert("Message".to_string(), error.to_string());
                params.insert("StackTrace".to_string(), error.chain());
            }
        }

        params
    }
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or("").to_string()
}
