//! Configuration module for web crawling
//!
//! This module provides the `CrawlConfig` struct and its type-safe builder
//! for configuring web crawling operations with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod persist;
pub mod types;

// Re-exports for public API
pub use builder::{CrawlConfigBuilder, WithStartUrl, WithStorageDir};
pub use persist::PersistedConfig;
pub use types::{AgeFilterPreset, CrawlConfig};
