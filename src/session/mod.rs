//! Session and proxy affinity
//!
//! This module contains:
//! - Proxy providers mapping a session identifier to an egress route
//! - The session manager issuing and rotating sticky sessions

mod manager;
mod proxy;

pub use manager::{Session, SessionManager, DEFAULT_SESSION_PAGE_LIMIT};
pub use proxy::{
    DirectProvider, ProxyError, ProxyProvider, ProxyRoute, TemplateProxyProvider,
    SESSION_PLACEHOLDER,
};

use crate::config::ProxyConfig;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while opening a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Proxy provider refused: {0}")]
    Proxy(#[from] ProxyError),

    #[error("Failed to build session client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Session table lock poisoned")]
    Poisoned,
}

/// Builds the proxy provider described by the configuration
///
/// Without a URL template every session goes out directly; sessions still
/// rotate and keep separate cookie stores.
pub fn provider_from_config(config: &ProxyConfig) -> Result<Arc<dyn ProxyProvider>, ProxyError> {
    match config.url_template.as_deref() {
        Some(template) if !template.trim().is_empty() => {
            Ok(Arc::new(TemplateProxyProvider::new(template.trim())?))
        }
        _ => Ok(Arc::new(DirectProvider)),
    }
}
