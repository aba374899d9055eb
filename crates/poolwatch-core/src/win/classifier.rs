use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use std::{
    collections::{HashMap, VecDeque},
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::broadcast,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use super::errors::WinError;
use crate::{
    config::WinConfig,
    metrics,
    retention::RetentionStore,
    types::{OrphanReason, Tipset, WinReport},
    upstream::{TipsetSource, UpstreamError},
    utils::parse_go_duration,
};

/// Timing and retry knobs for [`WinClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub tick_interval: Duration,
    /// Minimum report age before the explorer is asked about it.
    pub cutoff: Duration,
    /// A `took` at or above this value diagnoses an orphan as a timeout.
    pub timeout_threshold: Duration,
    pub max_lookup_attempts: u32,
    pub max_retry_age: Duration,
}

impl From<&WinConfig> for ClassifierConfig {
    fn from(config: &WinConfig) -> Self {
        Self {
            tick_interval: Duration::from_secs(config.tick_interval_seconds),
            cutoff: Duration::from_secs(config.cutoff_seconds),
            timeout_threshold: Duration::from_secs(config.timeout_threshold_seconds),
            max_lookup_attempts: config.max_lookup_attempts,
            max_retry_age: Duration::from_secs(config.max_retry_age_seconds),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::from(&WinConfig::default())
    }
}

/// What one tick did with the reports it drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub drained: usize,
    pub wins: usize,
    pub orphans: usize,
    /// Reports put back for the next tick.
    pub deferred: usize,
    pub dropped: usize,
    pub faults: usize,
}

/// Tipset lookups done during one tick, keyed by height.
///
/// Failures are remembered too, so a height the explorer cannot serve is asked
/// about at most once per tick.
#[derive(Default)]
struct TipsetMemo {
    lookups: HashMap<u64, Result<Arc<Tipset>, UpstreamError>>,
}

impl TipsetMemo {
    async fn get(
        &mut self,
        source: &dyn TipsetSource,
        height: u64,
    ) -> Result<Arc<Tipset>, UpstreamError> {
        if let Some(cached) = self.lookups.get(&height) {
            return cached.clone();
        }
        let result = source.tipset(height).await.map(Arc::new);
        if result.is_err() {
            metrics::record_tipset_lookup_failure();
        }
        self.lookups.insert(height, result.clone());
        result
    }
}

enum Verdict {
    Win(WinReport),
    Orphan(WinReport),
}

/// Periodically moves due reports out of the pending queue and decides
/// whether each block made it into the canonical chain.
pub struct WinClassifier {
    store: Arc<RetentionStore>,
    tipsets: Arc<dyn TipsetSource>,
    config: ClassifierConfig,
}

impl WinClassifier {
    #[must_use]
    pub fn new(
        store: Arc<RetentionStore>,
        tipsets: Arc<dyn TipsetSource>,
        config: ClassifierConfig,
    ) -> Self {
        Self { store, tipsets, config }
    }

    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Spawns the classifier loop. The first tick runs one interval after start.
    ///
    /// A panicking tick is logged and the loop keeps its schedule.
    pub fn start_with_shutdown(
        self: Arc<Self>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let period = self.config.tick_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match AssertUnwindSafe(self.run_tick()).catch_unwind().await {
                            Ok(summary) if summary.drained > 0 => {
                                debug!(?summary, "classifier tick finished");
                            }
                            Ok(_) => {}
                            Err(panic) => {
                                metrics::record_classification_fault();
                                error!(cause = %panic_message(&*panic), "classifier tick panicked");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("win classifier shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub async fn run_tick(&self) -> TickSummary {
        self.run_tick_at(Utc::now()).await
    }

    /// Drains reports older than the cutoff and classifies them in order.
    ///
    /// Reports whose lookup failed, or whose processing panicked, are either
    /// put back at the head of the queue or dropped by the retry policy. A
    /// panic outside the per-report boundary puts every unprocessed report
    /// back untouched.
    pub async fn run_tick_at(&self, now: DateTime<Utc>) -> TickSummary {
        let cutoff = TimeDelta::from_std(self.config.cutoff).unwrap_or(TimeDelta::MAX);
        let deadline = now.checked_sub_signed(cutoff).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut due: VecDeque<WinReport> = self.store.take_due(deadline).into();
        let mut summary = TickSummary { drained: due.len(), ..TickSummary::default() };
        if due.is_empty() {
            return summary;
        }

        let mut retry = Vec::new();
        let processed = AssertUnwindSafe(self.process_due(&mut due, &mut retry, now, &mut summary))
            .catch_unwind()
            .await;
        if let Err(panic) = processed {
            metrics::record_classification_fault();
            error!(
                cause = %panic_message(&*panic),
                unprocessed = due.len(),
                "classifier tick panicked, re-queuing unprocessed reports"
            );
            summary.faults += 1;
        }

        self.settle(retry, due, now, &mut summary);
        summary
    }

    async fn process_due(
        &self,
        due: &mut VecDeque<WinReport>,
        retry: &mut Vec<WinReport>,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) {
        let mut memo = TipsetMemo::default();

        while let Some(report) = due.pop_front() {
            let outcome =
                AssertUnwindSafe(self.classify(report.clone(), &mut memo)).catch_unwind().await;

            match outcome {
                Ok(Ok(Verdict::Win(report))) => {
                    info!(miner = %report.miner, height = report.height, cid = %report.cid, "miner win");
                    metrics::record_classification("win");
                    self.store.record_win(report);
                    summary.wins += 1;
                }
                Ok(Ok(Verdict::Orphan(report))) => {
                    info!(
                        miner = %report.miner,
                        height = report.height,
                        cid = %report.cid,
                        reason = %report.reason.unwrap_or(OrphanReason::Unknown),
                        detail = report.detail.as_deref().unwrap_or_default(),
                        "miner orphan"
                    );
                    metrics::record_classification("orphan");
                    self.store.record_orphan(report);
                    summary.orphans += 1;
                }
                Ok(Err(err)) if err.is_retryable() => {
                    warn!(
                        miner = %report.miner,
                        height = report.height,
                        kind = err.as_str(),
                        error = %err,
                        "tipset unavailable, will retry"
                    );
                    retry.push(report);
                }
                Ok(Err(err)) => {
                    warn!(
                        miner = %report.miner,
                        cid = %report.cid,
                        height = report.height,
                        kind = err.as_str(),
                        error = %err,
                        age = %humantime::format_duration(report.age_at(now)),
                        "dropping win report, lookup cannot succeed"
                    );
                    self.drop_report(summary);
                }
                Err(panic) => {
                    let err = WinError::ClassificationFault(panic_message(&*panic));
                    metrics::record_classification_fault();
                    error!(
                        miner = %report.miner,
                        height = report.height,
                        kind = err.as_str(),
                        error = %err,
                        "report processing panicked"
                    );
                    summary.faults += 1;
                    retry.push(report);
                }
            }
        }
    }

    /// Applies the retry policy to `retry` and puts the survivors back at the
    /// head of the queue, followed by `untouched` as drained.
    fn settle(
        &self,
        retry: Vec<WinReport>,
        untouched: VecDeque<WinReport>,
        now: DateTime<Utc>,
        summary: &mut TickSummary,
    ) {
        let mut requeue = Vec::with_capacity(retry.len() + untouched.len());
        for mut report in retry {
            report.attempts += 1;
            if self.should_drop(&report, now) {
                warn!(
                    miner = %report.miner,
                    cid = %report.cid,
                    height = report.height,
                    attempts = report.attempts,
                    "dropping win report after repeated lookup failures"
                );
                self.drop_report(summary);
            } else {
                requeue.push(report);
            }
        }
        requeue.extend(untouched);

        summary.deferred = requeue.len();
        self.store.requeue_front(requeue);
    }

    fn drop_report(&self, summary: &mut TickSummary) {
        metrics::record_report_dropped();
        self.store.record_dropped();
        summary.dropped += 1;
    }

    fn should_drop(&self, report: &WinReport, now: DateTime<Utc>) -> bool {
        report.attempts >= self.config.max_lookup_attempts
            || report.age_at(now) > self.config.max_retry_age
    }

    async fn classify(
        &self,
        mut report: WinReport,
        memo: &mut TipsetMemo,
    ) -> Result<Verdict, WinError> {
        let tipset = memo
            .get(self.tipsets.as_ref(), report.height)
            .await
            .map_err(|source| WinError::ExternalLookup { height: report.height, source })?;

        if tipset.contains_cid(&report.cid) {
            return Ok(Verdict::Win(report));
        }

        let (reason, detail) = self.diagnose(&report, memo).await;
        report.reason = Some(reason);
        report.detail = Some(detail);
        Ok(Verdict::Orphan(report))
    }

    /// Picks the first matching orphan reason: parents mismatch, then
    /// timeout, then unknown.
    async fn diagnose(&self, report: &WinReport, memo: &mut TipsetMemo) -> (OrphanReason, String) {
        if let Some(parent_height) = report.height.checked_sub(1) {
            // An unavailable parent tipset skips this check.
            if let Ok(parent) = memo.get(self.tipsets.as_ref(), parent_height).await {
                if report.parents != parent.block_count() {
                    return (
                        OrphanReason::ParentsMismatch,
                        format!("{} != {}", report.parents, parent.block_count()),
                    );
                }
            }
        }

        if parse_go_duration(&report.took).is_some_and(|took| took >= self.config.timeout_threshold)
        {
            return (OrphanReason::Timeout, report.took.clone());
        }

        (OrphanReason::Unknown, "check miner log".to_string())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
