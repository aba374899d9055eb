use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::errors::WinError;
use crate::{
    metrics,
    retention::RetentionStore,
    types::{WinReport, WinSubmission},
};

/// Validates miner submissions and appends them to the pending queue.
///
/// Submission never touches the network.
pub struct WinIntake {
    store: Arc<RetentionStore>,
}

impl WinIntake {
    #[must_use]
    pub fn new(store: Arc<RetentionStore>) -> Self {
        Self { store }
    }

    /// Checks the fields every report needs before it can be classified.
    ///
    /// # Errors
    ///
    /// Returns [`WinError::Validation`] naming the first missing field.
    pub fn validate(submission: &WinSubmission) -> Result<(), WinError> {
        if submission.cid.trim().is_empty() {
            return Err(WinError::Validation("missing block cid".to_string()));
        }
        if submission.miner.trim().is_empty() {
            return Err(WinError::Validation("missing miner id".to_string()));
        }
        if submission.height == 0 {
            return Err(WinError::Validation("missing block height".to_string()));
        }
        Ok(())
    }

    /// Validates, stamps and enqueues a submission.
    ///
    /// # Errors
    ///
    /// Returns [`WinError::Validation`] if the submission is incomplete. Nothing
    /// is enqueued in that case.
    pub fn submit(&self, submission: WinSubmission) -> Result<WinReport, WinError> {
        self.submit_at(submission, Utc::now())
    }

    /// Same as [`WinIntake::submit`] with an explicit submission time.
    ///
    /// # Errors
    ///
    /// Returns [`WinError::Validation`] if the submission is incomplete.
    pub fn submit_at(
        &self,
        submission: WinSubmission,
        now: DateTime<Utc>,
    ) -> Result<WinReport, WinError> {
        Self::validate(&submission)?;

        let report = self.store.enqueue(WinReport::from_submission(submission, now));
        metrics::record_win_report();

        info!(
            miner = %report.miner,
            cid = %report.cid,
            height = report.height,
            took = %report.took,
            parents = report.parents,
            rebase = report.rebase,
            "win report queued"
        );

        Ok(report)
    }
}
