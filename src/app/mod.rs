pub mod context;
pub mod error;

pub use context::{AppContext, Services};
pub use error::{ResolveError, Result, UrlsetterError};
