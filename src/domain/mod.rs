pub mod event;
pub mod key;

pub use event::{EventKind, UrlEvent};
pub use key::{CacheKey, MAX_KEY_LEN};
