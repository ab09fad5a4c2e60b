use tracing::warn;
use url::Url;

use crate::analytics::event_name;
use crate::app::{AppContext, Result, UrlsetterError};
use crate::domain::{CacheKey, EventKind, UrlEvent};
use crate::resolver::Notifier;
use crate::router::parse_inbound;
use crate::store::Store;

/// Prints resolver notices to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn resolving(&self, origin: &Url) {
        eprintln!("Resolving {}...", origin);
    }

    fn taking_longer(&self, origin: &Url) {
        eprintln!("Resolving {} takes longer than usual...", origin);
    }
}

pub async fn resolve_urls(ctx: &AppContext, urls: &[String], open: bool, json: bool) -> Result<()> {
    let origins = urls
        .iter()
        .map(|u| parse_inbound(u))
        .collect::<Result<Vec<_>>>()?;

    let mut terminal = ctx.bus.subscribe(&EventKind::TERMINAL);
    let services = ctx.start();

    // Dispatch from its own task so cache hits never wait on our receiver.
    let router = ctx.router.clone();
    let pending = origins.clone();
    let dispatcher = tokio::spawn(async move {
        for origin in pending {
            router.dispatch(origin).await;
        }
    });

    let mut remaining = origins.len();
    let mut failures = 0;
    while remaining > 0 {
        let Some(event) = terminal.recv().await else {
            break;
        };
        remaining -= 1;

        if matches!(event, UrlEvent::ResolutionFailed { .. }) {
            failures += 1;
        }
        if let Err(e) = report(&event, json) {
            warn!("Failed to report {}: {}", event.origin(), e);
        }

        if open {
            launch(event.target());
        }
    }

    if let Err(e) = dispatcher.await {
        warn!("Dispatcher task failed: {}", e);
    }
    ctx.shutdown(services).await;

    if failures > 0 && !json {
        eprintln!(
            "{} of {} URL(s) could not be resolved",
            failures,
            origins.len()
        );
    }
    Ok(())
}

fn report(event: &UrlEvent, json: bool) -> Result<()> {
    if json {
        let line = serde_json::json!({
            "event": event_name(event),
            "origin": event.origin().as_str(),
            "target": event.target().as_str(),
            "params": event.logging_params(),
        });
        let line = serde_json::to_string(&line).map_err(|e| UrlsetterError::Other(e.to_string()))?;
        println!("{}", line);
        return Ok(());
    }

    match event {
        UrlEvent::Resolved { origin, resolved } => println!("{} -> {}", origin, resolved),
        UrlEvent::ResolutionFailed { origin, error } => {
            eprintln!("Error while resolving {}: {}", origin, error);
            println!("{} -> {} (unresolved)", origin, origin);
        }
        _ => {}
    }
    Ok(())
}

fn launch(url: &Url) {
    if let Err(e) = open::that(url.as_str()) {
        warn!("Failed to open {}: {}", url, e);
    }
}

pub fn lookup(ctx: &AppContext, url: &str) -> Result<()> {
    let origin = parse_inbound(url)?;

    match ctx.cache.lookup(&origin) {
        Some(resolved) => {
            let resolved_at = ctx.store.resolved_at(&CacheKey::for_url(&origin))?;
            match resolved_at {
                Some(at) => println!("{} -> {} (cached {})", origin, resolved, at.to_rfc3339()),
                None => println!("{} -> {}", origin, resolved),
            }
        }
        None => println!("Not cached: {}", origin),
    }
    Ok(())
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    let stats = ctx.store.stats()?;
    println!("Entries:  {}", stats.entries);
    println!("Size:     {} bytes", stats.bytes);
    println!("Capacity: {} bytes", stats.capacity_bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::resolver::tests::{io_error, redirect, ScriptedClient};
    use crate::store::SqliteStore;
    use std::sync::Arc;

    fn context(client: Arc<ScriptedClient>) -> AppContext {
        AppContext::with_parts(
            Config::default(),
            Arc::new(SqliteStore::in_memory().unwrap()),
            client,
            Arc::new(ConsoleNotifier),
        )
    }

    #[tokio::test]
    async fn test_resolve_urls_fills_cache() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(redirect(
            301,
            "https://example.com/landing",
        ))]));
        let ctx = context(client);

        resolve_urls(&ctx, &["http://bit.ly/x".to_string()], false, false)
            .await
            .unwrap();

        assert!(ctx.idle.is_idle());
        let origin = Url::parse("http://bit.ly/x").unwrap();
        assert_eq!(
            ctx.cache.lookup(&origin),
            Some(Url::parse("https://example.com/landing").unwrap())
        );
    }

    #[tokio::test]
    async fn test_resolve_urls_handles_many_cache_hits() {
        let ctx = context(Arc::new(ScriptedClient::default()));
        let urls: Vec<String> = (0..150).map(|i| format!("http://bit.ly/{i}")).collect();
        for u in &urls {
            let origin = Url::parse(u).unwrap();
            ctx.cache.remember(&origin, &origin);
        }

        tokio_test::assert_ok!(resolve_urls(&ctx, &urls, false, true).await);
        assert_eq!(ctx.store.stats().unwrap().entries, 150);
    }

    #[tokio::test]
    async fn test_resolve_urls_shuts_down_after_failures() {
        let client = Arc::new(ScriptedClient::new(vec![Err(io_error()), Err(io_error())]));
        let ctx = context(client);
        let urls = vec!["http://bit.ly/a".to_string(), "http://bit.ly/b".to_string()];

        tokio_test::assert_ok!(resolve_urls(&ctx, &urls, false, true).await);

        assert!(ctx.idle.is_idle());
        assert_eq!(ctx.bus.subscriber_count(), 0);
        assert_eq!(ctx.store.stats().unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_resolve_urls_rejects_bad_input() {
        let ctx = context(Arc::new(ScriptedClient::default()));
        let result = resolve_urls(&ctx, &["not a url".to_string()], false, false).await;
        assert!(matches!(result, Err(UrlsetterError::InvalidUrl(_))));
    }

    #[test]
    fn test_report_json() {
        let event = UrlEvent::Resolved {
            origin: Url::parse("http://bit.ly/x").unwrap(),
            resolved: Url::parse("https://example.com/").unwrap(),
        };
        tokio_test::assert_ok!(report(&event, true));
    }

    #[test]
    fn test_lookup_and_stats() {
        let ctx = context(Arc::new(ScriptedClient::default()));
        lookup(&ctx, "http://bit.ly/x").unwrap();

        let origin = Url::parse("http://bit.ly/x").unwrap();
        ctx.cache
            .remember(&origin, &Url::parse("https://example.com/").unwrap());
        lookup(&ctx, "http://bit.ly/x").unwrap();
        stats(&ctx).unwrap();

        assert!(matches!(
            lookup(&ctx, "mailto:a@b.c"),
            Err(UrlsetterError::MissingHost(_))
        ));
    }
}
