//! URL handling module for ld-harvest
//!
//! This module provides input URL validation and redirect canonicalization.
//! The canonicalizer runs before any proxy session is spent on a URL, so
//! short links and tracking redirects are unwrapped on a direct connection.

mod input;
mod resolve;

pub use input::{collect_input_urls, parse_input_url};
pub use resolve::{Canonicalizer, PassthroughResolver, ResolveStrategy, UrlResolver};

/// Default time budget for each redirect resolution strategy
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 8;
