use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, time::Duration};

use super::history::BoundedHistory;
use crate::{metrics, types::WinReport};

/// Point-in-time view of the retention state.
///
/// Field names match the JSON the pool dashboard already consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionStatus {
    #[serde(rename = "UnhandledCount")]
    pub pending_count: usize,

    /// Time since the history was last cleared.
    #[serde(rename = "Duration", with = "humantime_serde")]
    pub history_age: Duration,

    #[serde(rename = "OrphansCount")]
    pub orphan_count: usize,

    #[serde(rename = "WinCount")]
    pub win_count: usize,

    #[serde(rename = "RebaseCounter")]
    pub rebase_counter: u64,

    #[serde(rename = "AnchorWaitCounter")]
    pub anchor_wait_counter: u64,

    #[serde(rename = "DroppedCount")]
    pub dropped_count: u64,

    /// Time since the most recent orphan, if any.
    #[serde(
        rename = "LastOrphan",
        with = "humantime_serde",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_orphan_age: Option<Duration>,

    #[serde(rename = "Wins", default, skip_serializing_if = "Option::is_none")]
    pub wins: Option<Vec<WinReport>>,

    #[serde(rename = "Orphans")]
    pub orphans: Vec<WinReport>,
}

#[derive(Debug)]
struct RetentionState {
    pending: VecDeque<WinReport>,
    wins: BoundedHistory<WinReport>,
    orphans: BoundedHistory<WinReport>,
    rebase_counter: u64,
    anchor_wait_counter: u64,
    dropped_counter: u64,
    last_orphan_at: Option<DateTime<Utc>>,
    history_since: DateTime<Utc>,
}

/// Owns every win report: pending ones, classified history, and counters.
///
/// One lock guards the whole state. Each method is a single short critical
/// section and no caller does I/O while holding it.
///
/// The pending queue stays ordered by `submitted_at`: intake appends at the
/// tail, [`RetentionStore::take_due`] removes a prefix, and
/// [`RetentionStore::requeue_front`] puts the oldest reports back in front.
#[derive(Debug)]
pub struct RetentionStore {
    state: Mutex<RetentionState>,
}

/// Truncates to whole seconds so rendered durations stay short.
fn whole_seconds(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let elapsed = (now - since).to_std().unwrap_or(Duration::ZERO);
    Duration::from_secs(elapsed.as_secs())
}

impl RetentionStore {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self::new_at(history_capacity, Utc::now())
    }

    #[must_use]
    pub fn new_at(history_capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(RetentionState {
                pending: VecDeque::new(),
                wins: BoundedHistory::new(history_capacity),
                orphans: BoundedHistory::new(history_capacity),
                rebase_counter: 0,
                anchor_wait_counter: 0,
                dropped_counter: 0,
                last_orphan_at: None,
                history_since: now,
            }),
        }
    }

    /// Appends a report to the pending tail and folds in its counters.
    ///
    /// `submitted_at` is moved up to the current tail's timestamp if the clock
    /// went backwards, so the queue stays ordered. Returns the stored copy.
    pub fn enqueue(&self, mut report: WinReport) -> WinReport {
        let mut state = self.state.lock();

        if let Some(tail) = state.pending.back() {
            if report.submitted_at < tail.submitted_at {
                report.submitted_at = tail.submitted_at;
            }
        }

        if report.rebase {
            state.rebase_counter = state.rebase_counter.saturating_add(1);
        }
        state.anchor_wait_counter = state.anchor_wait_counter.saturating_add(report.anchor_wait);

        state.pending.push_back(report.clone());
        metrics::record_pending(state.pending.len());
        report
    }

    /// Removes and returns the longest pending prefix submitted at or before
    /// `deadline`.
    pub fn take_due(&self, deadline: DateTime<Utc>) -> Vec<WinReport> {
        let mut state = self.state.lock();

        let due = state.pending.iter().take_while(|r| r.submitted_at <= deadline).count();
        let taken: Vec<WinReport> = state.pending.drain(..due).collect();
        metrics::record_pending(state.pending.len());
        taken
    }

    /// Puts reports back at the head of the pending queue, keeping their order.
    ///
    /// Only reports previously returned by [`RetentionStore::take_due`] belong
    /// here. They are older than anything still queued.
    pub fn requeue_front(&self, reports: Vec<WinReport>) {
        if reports.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for report in reports.into_iter().rev() {
            state.pending.push_front(report);
        }
        metrics::record_pending(state.pending.len());
    }

    pub fn record_win(&self, report: WinReport) {
        self.state.lock().wins.push(report);
    }

    pub fn record_orphan(&self, report: WinReport) {
        let mut state = self.state.lock();
        state.last_orphan_at = Some(report.submitted_at);
        state.orphans.push(report);
    }

    /// Counts a report given up on by the retry policy.
    pub fn record_dropped(&self) {
        self.state.lock().dropped_counter += 1;
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    #[must_use]
    pub fn status(&self, include_wins: bool) -> RetentionStatus {
        self.status_at(include_wins, Utc::now())
    }

    /// Snapshot of counts, counters and copies of the history lists.
    ///
    /// The win list is copied only when `include_wins` is set.
    #[must_use]
    pub fn status_at(&self, include_wins: bool, now: DateTime<Utc>) -> RetentionStatus {
        let state = self.state.lock();

        RetentionStatus {
            pending_count: state.pending.len(),
            history_age: whole_seconds(state.history_since, now),
            orphan_count: state.orphans.len(),
            win_count: state.wins.len(),
            rebase_counter: state.rebase_counter,
            anchor_wait_counter: state.anchor_wait_counter,
            dropped_count: state.dropped_counter,
            last_orphan_age: state.last_orphan_at.map(|at| whole_seconds(at, now)),
            wins: include_wins.then(|| state.wins.to_vec()),
            orphans: state.orphans.to_vec(),
        }
    }

    pub fn clear_history(&self) {
        self.clear_history_at(Utc::now());
    }

    /// Empties win and orphan history and restarts the history clock.
    ///
    /// Pending reports and the rebase, anchor-wait and dropped counters are
    /// kept.
    pub fn clear_history_at(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.wins.clear();
        state.orphans.clear();
        state.history_since = now;
    }
}
