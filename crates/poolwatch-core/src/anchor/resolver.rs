use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::{cache::AnchorCache, errors::AnchorError};
use crate::{
    metrics,
    types::{AnchorHead, AnchorSample},
    upstream::{HeadSource, UpstreamError},
};

/// Outcome of picking a refresh winner from the successful samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub winner: AnchorSample,
    /// Another sample at the winning height reported a different block count.
    pub diverged: bool,
}

/// Picks the sample with the highest height, breaking ties by block count.
///
/// Returns `None` for an empty slice. Equal samples keep their input order,
/// so the choice is deterministic for a fixed endpoint list.
#[must_use]
pub fn select_winner(samples: &[AnchorSample]) -> Option<Selection> {
    let mut ordered: Vec<&AnchorSample> = samples.iter().collect();
    ordered.sort_by(|a, b| {
        b.height.cmp(&a.height).then_with(|| b.block_count.cmp(&a.block_count))
    });

    let winner = (*ordered.first()?).clone();
    let diverged = ordered
        .iter()
        .take_while(|s| s.height == winner.height)
        .any(|s| s.block_count != winner.block_count);

    Some(Selection { winner, diverged })
}

/// Resolves the authoritative chain height and block count from several nodes.
///
/// Keeps one cached [`AnchorHead`]. A lookup at the cached height never
/// touches the network; anything newer triggers a concurrent refresh of every
/// configured node. Overlapping refreshes are not deduplicated. They all
/// converge on the same winner.
pub struct AnchorResolver {
    sources: Vec<Arc<dyn HeadSource>>,
    cache: AnchorCache,
    settle_delay: Duration,
}

impl AnchorResolver {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn HeadSource>>, settle_delay: Duration) -> Self {
        Self { sources, cache: AnchorCache::new(), settle_delay }
    }

    #[must_use]
    pub fn current(&self) -> AnchorHead {
        self.cache.current()
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Returns the number of blocks at `requested_height`.
    ///
    /// # Errors
    ///
    /// - [`AnchorError::StaleRequest`] if the anchor is already past the height
    /// - [`AnchorError::Unresolved`] if a refresh did not land on the height
    pub async fn resolve_block_count(&self, requested_height: u64) -> Result<usize, AnchorError> {
        let head = self.cache.current();
        if requested_height < head.height {
            return Err(AnchorError::StaleRequest {
                requested: requested_height,
                current: head.height,
            });
        }
        if requested_height == head.height {
            return Ok(head.block_count);
        }

        self.refresh().await;

        let head = self.cache.current();
        if requested_height == head.height {
            Ok(head.block_count)
        } else {
            Err(AnchorError::Unresolved { requested: requested_height, current: head.height })
        }
    }

    /// Queries every node concurrently and moves the cache to the winner.
    ///
    /// Sleeps the settle delay once first. Failed queries are dropped from the
    /// aggregation. If none succeed the cache is left untouched and `None` is
    /// returned.
    pub async fn refresh(&self) -> Option<AnchorHead> {
        if !self.settle_delay.is_zero() {
            debug!(delay = %humantime::format_duration(self.settle_delay), "settling before anchor refresh");
            tokio::time::sleep(self.settle_delay).await;
        }

        let samples = self.collect_samples().await;
        metrics::record_anchor_refresh(samples.len(), self.sources.len());

        let Some(selection) = select_winner(&samples) else {
            warn!(sources = self.sources.len(), "anchor refresh got no samples, keeping cache");
            return None;
        };

        if selection.diverged {
            metrics::record_anchor_divergence();
            let at_height: Vec<String> = samples
                .iter()
                .filter(|s| s.height == selection.winner.height)
                .map(|s| format!("{}={}", s.source_url, s.block_count))
                .collect();
            warn!(
                height = selection.winner.height,
                samples = ?at_height,
                "anchor sources diverge on block count"
            );
        }

        let head = self.cache.update(&selection.winner);
        metrics::record_anchor_head(head.height);
        info!(
            height = head.height,
            block_count = head.block_count,
            url = %selection.winner.source_url,
            "update anchor cache"
        );
        Some(head)
    }

    async fn collect_samples(&self) -> Vec<AnchorSample> {
        let queries = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                // Timing out the future as well covers sources without their own timeout.
                let result = tokio::time::timeout(source.timeout(), source.chain_head())
                    .await
                    .unwrap_or(Err(UpstreamError::Timeout));
                (source, result)
            }
        });

        join_all(queries)
            .await
            .into_iter()
            .filter_map(|(source, result)| match result {
                Ok(sample) => Some(sample),
                Err(e) => {
                    metrics::record_anchor_source_failure(source.url());
                    warn!(url = %source.url(), error = %e, "chain head query failed");
                    None
                }
            })
            .inspect(|sample| {
                debug!(url = %sample.source_url, height = sample.height, "anchor sample");
            })
            .collect()
    }
}
