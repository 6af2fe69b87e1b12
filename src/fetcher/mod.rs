pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::{fetch, get_client};
pub use errors::{FetchError, FetchErrorKind};
pub use types::{Charset, PageResponse};
