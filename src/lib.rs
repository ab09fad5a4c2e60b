//! # urlsetter
//!
//! Resolves shortened and redirect-wrapping URLs (URL shorteners, Facebook
//! `l.php` links) to their final destination, caching results on disk.
//!
//! ## Architecture
//!
//! ```text
//! inbound URL → Router ─hit──→ Resolved ─→ subscribers
//!                  └─miss─→ ResolveRequest → Resolver → Resolved | ResolutionFailed
//! ```
//!
//! Everything after the router talks through the [`bus::EventBus`]; the
//! cache writer, the analytics log and the CLI host are independent
//! subscribers.
//!
//! ## Quick Start
//!
//! ```bash
//! # Resolve and print the destination
//! urlsetter resolve https://bit.ly/3abcdef
//!
//! # Resolve and open the destination in the browser
//! urlsetter resolve --open "https://m.facebook.com/l.php?u=..."
//!
//! # Inspect the cache
//! urlsetter lookup https://bit.ly/3abcdef
//! urlsetter stats
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, cache, bus, resolver, router.
pub mod app;

/// Forwards bus events to the analytics log target.
pub mod analytics;

/// Typed publish/subscribe channel.
pub mod bus;

/// Best-effort resolution cache and the subscriber that fills it.
pub mod cache;

/// Command-line interface using clap.
///
/// - `resolve <url>...` - Resolve URLs, optionally opening the result
/// - `lookup <url>` - Show a cached resolution
/// - `stats` - Show cache usage
pub mod cli;

/// Configuration loaded from `~/.config/urlsetter/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`UrlEvent`](domain::UrlEvent): events exchanged over the bus
/// - [`CacheKey`](domain::CacheKey): SHA-256 derived cache keys
pub mod domain;

/// Single-request HTTP probing.
///
/// - [`RedirectClient`](client::RedirectClient): Async trait for one probe
/// - [`HttpRedirectClient`](client::HttpRedirectClient): reqwest-based implementation
pub mod client;

/// In-flight resolution counter.
pub mod idle;

/// Redirect-following resolution engine.
pub mod resolver;

/// Cache-or-resolve routing of inbound URLs.
pub mod router;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
