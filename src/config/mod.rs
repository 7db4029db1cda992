//! Configuration module for ld-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use ld_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting with {} workers", config.scraper.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractionConfig, OutputConfig, ProxyConfig, ScraperConfig, StartUrl,
    DEFAULT_CONCURRENCY, DEFAULT_DELAY_MS_MAX, DEFAULT_DELAY_MS_MIN,
};

// Re-export parser functions
pub use parser::{compute_config_hash, compute_content_hash, load_config, load_config_with_hash};
pub use validation::validate;
