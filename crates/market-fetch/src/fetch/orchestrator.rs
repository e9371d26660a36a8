//! Fetch Orchestrator - sequential page loop with dedup and a page ceiling
//!
//! # Termination
//! - resolver reports the last page: `Exhausted`
//! - `max_pages` pages consumed: `PageCeiling`
//! - shutdown flag set between pages or during the throttle wait: `Interrupted`
//! - fetch error after at least one page: `FetchFailed`
//!
//! A fetch error on page 1 fails the run outright; there is nothing to save.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::session::FetchSession;
use crate::error::FetchError;
use crate::http::MarketsClient;
use crate::mode::FetchConfig;
use crate::pagination::PageCursorResolver;
use crate::types::{PageDescriptor, StopReason};

/// Drives one fetch run. Owns the client (and its throttle) for that run.
pub struct Fetcher {
    client: MarketsClient,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(client: MarketsClient, config: FetchConfig) -> Self {
        Self { client, config }
    }

    /// Fetch every page, or at most `max_pages` (`None` = unlimited)
    pub async fn run(
        &self,
        max_pages: Option<u32>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<FetchSession, FetchError> {
        let mut session = FetchSession::new();
        let mut resolver = PageCursorResolver::new(self.config.page_size);
        let mut descriptor = PageDescriptor::initial();

        info!(
            "Fetching markets (mode={}, endpoint={}, page_size={})",
            self.config.mode.description(),
            self.config.endpoint,
            self.config.page_size
        );

        loop {
            if shutdown.load(Ordering::Relaxed) {
                warn!("Shutdown requested after {} pages, keeping partial results", session.pages());
                session.finish(StopReason::Interrupted, None);
                break;
            }

            if max_pages.is_some_and(|max| session.pages() >= max) {
                warn!("Reached page ceiling ({} pages), more data may remain", session.pages());
                session.finish(StopReason::PageCeiling, None);
                break;
            }

            let params = self.request_params(&descriptor);
            let response = match self.client.fetch_unless(&self.config.endpoint, &params, &shutdown).await {
                Ok(response) => response,
                Err(FetchError::Interrupted) => {
                    warn!("Shutdown requested after {} pages, keeping partial results", session.pages());
                    session.finish(StopReason::Interrupted, None);
                    break;
                }
                Err(e) if session.pages() == 0 => {
                    return Err(FetchError::NothingFetched { source: Box::new(e) });
                }
                Err(e) => {
                    warn!("Error on batch {}: {}, keeping {} markets", session.pages() + 1, e, session.len());
                    session.finish(StopReason::FetchFailed, Some(e.to_string()));
                    break;
                }
            };

            let outcome = resolver.resolve(&response.body, &descriptor);
            let batch = outcome.records.len();
            let added = session.absorb(outcome.records);

            info!(
                "Batch {}: +{} fetched, {} new (total: {}), via {}",
                session.pages(),
                batch,
                added,
                session.len(),
                descriptor.kind()
            );

            match outcome.next {
                Some(next) => descriptor = next,
                None => {
                    session.finish(StopReason::Exhausted, None);
                    break;
                }
            }
        }

        info!(
            "Fetched {} total markets in {} batches ({} duplicates skipped)",
            session.len(),
            session.pages(),
            session.duplicates_skipped()
        );

        Ok(session)
    }

    /// `limit`, mode filters, then the pagination parameter
    fn request_params(&self, descriptor: &PageDescriptor) -> Vec<(String, String)> {
        let mut params = vec![("limit".to_string(), self.config.page_size.to_string())];
        params.extend(self.config.filters.iter().cloned());
        params.extend(self.config.strategy.params_for(descriptor));
        params
    }
}
