//! Per-item pipeline
//!
//! Turns one input URL into one [`ExtractionResult`]:
//! canonicalize, fetch on the current session, extract, and on anything
//! short of a selected entity try once more on a fresh session.

use crate::crawler::fetcher::{FetchAttemptResult, PageFetcher};
use crate::crawler::parser::{EntitySelector, Extraction};
use crate::crawler::scheduler::WorkItem;
use crate::output::ExtractionResult;
use crate::session::SessionManager;
use crate::state::{AttemptPhase, ResultOutcome};
use crate::url::UrlResolver;
use chrono::Utc;
use std::sync::Arc;

/// What one fetch attempt produced
#[derive(Debug, Clone)]
struct AttemptRecord {
    session_id: Option<u64>,
    fetch: FetchAttemptResult,
    extraction: Option<Extraction>,
}

impl AttemptRecord {
    fn entity_found(&self) -> bool {
        self.extraction
            .as_ref()
            .is_some_and(|extraction| extraction.selected.is_some())
    }

    /// Why this attempt did not yield an entity
    ///
    /// Any response from the server is reported by its status code. The
    /// fetch message is only used when no response arrived at all.
    fn error(&self) -> String {
        match (self.fetch.status, &self.fetch.error_message) {
            (Some(status), _) => format!("status:{}", status),
            (None, Some(message)) => message.clone(),
            (None, None) => "status:unknown".to_string(),
        }
    }

    fn outcome(&self) -> ResultOutcome {
        match &self.extraction {
            None => ResultOutcome::FetchFailed,
            Some(extraction) if extraction.selected.is_some() => ResultOutcome::EntityFound,
            Some(extraction) if extraction.report.blocks.is_empty() => {
                ResultOutcome::NoStructuredData
            }
            Some(_) => ResultOutcome::NoMatchingEntity,
        }
    }
}

/// Runs the per-item pipeline
///
/// Shared by all workers; every collaborator is behind an `Arc` or is
/// immutable.
pub struct ItemProcessor {
    resolver: Arc<dyn UrlResolver>,
    sessions: Arc<SessionManager>,
    fetcher: Arc<dyn PageFetcher>,
    selector: EntitySelector,
}

impl ItemProcessor {
    pub fn new(
        resolver: Arc<dyn UrlResolver>,
        sessions: Arc<SessionManager>,
        fetcher: Arc<dyn PageFetcher>,
        selector: EntitySelector,
    ) -> Self {
        Self {
            resolver,
            sessions,
            fetcher,
            selector,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Processes one input URL
    ///
    /// Never fails: every problem ends up in the result's `error`.
    ///
    /// | Attempt 1 | Attempt 2 | Result |
    /// |-----------|-----------|--------|
    /// | entity found | not made | entity, `error = None` |
    /// | anything else | entity found | entity, `error = None` |
    /// | anything else | fetch failed | attempt 2 error message |
    /// | anything else | fetched, no entity | `status:<code>` |
    pub async fn process(&self, item: &WorkItem) -> ExtractionResult {
        let target = self.resolver.resolve(&item.original_url).await;
        if target != item.original_url {
            tracing::debug!("Resolved {} -> {}", item.original_url, target);
        }

        let mut record = self.attempt(&target, false).await;
        let mut attempts = 1;
        let mut phase = AttemptPhase::First.next(record.entity_found());

        while let Some(number) = phase.attempt_number() {
            tracing::warn!(
                "No entity for {} ({}), retrying on a new session",
                item.original_url,
                record.error()
            );

            record = self.attempt(&target, phase.forces_new_session()).await;
            attempts = number;
            phase = phase.next(record.entity_found());
        }

        let result = self.build_result(item, &target, attempts, record);

        if result.is_success() {
            tracing::info!("Scraped {} in {} attempt(s)", item.original_url, attempts);
        } else {
            tracing::info!(
                "Failed {} after {} attempt(s): {}",
                item.original_url,
                attempts,
                result.error.as_deref().unwrap_or_default()
            );
        }

        result
    }

    async fn attempt(&self, url: &str, force_new: bool) -> AttemptRecord {
        let session = match self.sessions.acquire(force_new) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Could not acquire a session for {}: {}", url, e);
                return AttemptRecord {
                    session_id: None,
                    fetch: FetchAttemptResult::failure(url, None, format!("Session unavailable: {}", e)),
                    extraction: None,
                };
            }
        };

        let fetch = self.fetcher.fetch(&session, url).await;
        let extraction = match (&fetch.body, fetch.succeeded) {
            (Some(body), true) => Some(self.selector.extract(body)),
            _ => None,
        };

        AttemptRecord {
            session_id: Some(session.id()),
            fetch,
            extraction,
        }
    }

    fn build_result(
        &self,
        item: &WorkItem,
        target: &str,
        attempts: u8,
        record: AttemptRecord,
    ) -> ExtractionResult {
        let outcome = record.outcome();
        let error = (!outcome.is_success()).then(|| record.error());
        let final_url = if record.fetch.final_url.is_empty() {
            target.to_string()
        } else {
            record.fetch.final_url.clone()
        };
        let (structured_blocks, selected_entity, parse_failures) = match record.extraction {
            Some(extraction) => (
                extraction.report.blocks,
                extraction.selected,
                extraction.report.failures.len(),
            ),
            None => (Vec::new(), None, 0),
        };

        ExtractionResult {
            original_url: item.original_url.clone(),
            final_url,
            timestamp: Utc::now(),
            structured_blocks,
            selected_entity,
            error,
            outcome,
            attempts,
            session_id: record.session_id,
            parse_failures,
        }
    }
}
