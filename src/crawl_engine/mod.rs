//! The crawl pipeline: link/sitemap discovery and the coordinator that
//! drives the frontier to completion.

pub mod coordinator;
pub mod links;
pub mod sitemap;

pub use coordinator::CrawlCoordinator;
pub use links::extract_links;
pub use sitemap::{parse_sitemap, SitemapEntry};
