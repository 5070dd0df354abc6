//! Durable, crash-safe record of every URL this tool has ever seen for a
//! given output directory — what makes re-crawls cheap and the enhancement
//! pool safe under concurrency.

pub mod error;
pub mod store;
pub mod types;

pub use error::CatalogueError;
pub use store::Catalogue;
pub use types::{CatalogueSnapshot, ContentStatus, PageRecord, SessionRecord, SitemapRecord, SCHEMA_VERSION};
