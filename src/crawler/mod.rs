//! Crawler module for page fetching and extraction
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching through session-bound clients
//! - JSON-LD extraction and entity selection
//! - The per-item two-attempt pipeline
//! - The worker pool and overall run coordination

mod coordinator;
mod fetcher;
mod parser;
mod processor;
mod scheduler;

pub use coordinator::{run_harvest, Coordinator, RunReport};
pub use fetcher::{
    browser_headers, build_resolver_client, build_session_client, fetch_page, is_success_status,
    FetchAttemptResult, HttpFetcher, PageFetcher, BROWSER_USER_AGENT, DEFAULT_FETCH_TIMEOUT_SECS,
};
pub use parser::{
    extract_json_ld, matches_target_type, select_entity, EntitySelector, Extraction,
    ExtractionReport, ParseFailure, DEFAULT_TARGET_TYPES,
};
pub use processor::ItemProcessor;
pub use scheduler::{PolitenessDelay, Scheduler, WorkItem, WorkQueue};
