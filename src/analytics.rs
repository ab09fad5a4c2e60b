//! Forwards bus events to the analytics and crash-report log targets.

use std::collections::BTreeMap;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bus::EventBus;
use crate::domain::{EventKind, UrlEvent};

/// One record handed to the analytics sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked {
    pub name: &'static str,
    pub params: BTreeMap<String, String>,
}

/// Analytics name of an event.
pub fn event_name(event: &UrlEvent) -> &'static str {
    match event {
        UrlEvent::ResolveRequest { .. } => "Resolve",
        UrlEvent::ResolveFacebookRequest { .. } => "ResolveFacebook",
        UrlEvent::Resolved { .. } => "Resolved",
        UrlEvent::ResolutionFailed { .. } => "Error",
    }
}

pub fn track(event: &UrlEvent) -> Tracked {
    if let UrlEvent::ResolutionFailed { origin, error } = event {
        error!(target: "urlsetter::crash", origin = %origin, "{}", error.chain());
    }

    let tracked = Tracked {
        name: event_name(event),
        params: event.logging_params(),
    };
    info!(target: "urlsetter::analytics", event = tracked.name, params = ?tracked.params, "track");
    tracked
}

pub fn spawn_analytics(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe(&EventKind::ALL);

    tokio::spawn(async move {
        info!("Analytics started");

        while let Some(event) = rx.recv().await {
            track(&event);
        }

        info!("Analytics stopped");
    })
}
