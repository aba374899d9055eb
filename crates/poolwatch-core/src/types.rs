//! Core type definitions shared by the anchor, win and retention modules.
//!
//! # Type Categories
//!
//! ## Anchor Types
//! - [`AnchorSample`]: One chain-node answer collected during a refresh
//! - [`AnchorHead`]: The cached `(height, block_count)` pair
//!
//! ## Explorer Types
//! - [`Tipset`], [`TipsetBlock`]: Canonical blocks at a height
//!
//! ## Win Report Types
//! - [`WinSubmission`]: Inbound payload, unvalidated
//! - [`WinReport`]: Validated, timestamped report moving through the pipeline
//! - [`OrphanReason`]: Diagnosis attached to orphaned reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};

/// One successful chain-head answer from a configured node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSample {
    pub height: u64,
    pub block_count: usize,
    pub source_url: Arc<str>,
}

/// Cached anchor head. Zero values mean no refresh has succeeded yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorHead {
    pub height: u64,
    pub block_count: usize,
}

/// A block inside an explorer tipset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipsetBlock {
    pub miner: String,
    pub cid: String,
}

/// Canonical set of blocks the explorer reports at one height.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tipset {
    pub height: u64,
    pub blocks: Vec<TipsetBlock>,
}

impl Tipset {
    /// Returns `true` if a block with this CID is part of the tipset.
    #[must_use]
    pub fn contains_cid(&self, cid: &str) -> bool {
        self.blocks.iter().any(|b| b.cid == cid)
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Why a reported block did not make it into the canonical tipset.
///
/// Variants are listed in diagnosis priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanReason {
    /// The miner built on a different parent set than the canonical one.
    ParentsMismatch,
    /// The miner took too long to produce the block.
    Timeout,
    /// Nothing conclusive; the miner log has to be inspected.
    Unknown,
}

impl OrphanReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParentsMismatch => "parents-mismatch",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound "I mined a block" payload as sent by a miner.
///
/// Every field defaults so that a missing field turns into a validation error
/// rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinSubmission {
    #[serde(default)]
    pub miner: String,
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub height: u64,
    /// Time the miner spent producing the block, e.g. `"12.5s"`.
    #[serde(default)]
    pub took: String,
    /// Number of parent blocks the miner built on.
    #[serde(default)]
    pub parents: usize,
    #[serde(default)]
    pub rebase: bool,
    /// Seconds the miner spent waiting on the anchor before mining.
    #[serde(default)]
    pub anchor_wait: u64,
}

/// A validated win report.
///
/// Created by [`crate::win::WinIntake`]. Only the classifier mutates it, by
/// setting `reason`, `detail` and `attempts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinReport {
    pub miner: String,
    pub cid: String,
    pub height: u64,
    pub took: String,
    pub parents: usize,
    #[serde(default)]
    pub rebase: bool,
    #[serde(default)]
    pub anchor_wait: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<OrphanReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "time")]
    pub submitted_at: DateTime<Utc>,
    /// Failed tipset lookups so far.
    #[serde(skip)]
    pub attempts: u32,
}

impl WinReport {
    /// Builds a report from an already validated submission.
    #[must_use]
    pub fn from_submission(submission: WinSubmission, submitted_at: DateTime<Utc>) -> Self {
        Self {
            miner: submission.miner,
            cid: submission.cid,
            height: submission.height,
            took: submission.took,
            parents: submission.parents,
            rebase: submission.rebase,
            anchor_wait: submission.anchor_wait,
            reason: None,
            detail: None,
            submitted_at,
            attempts: 0,
        }
    }

    /// Age of the report relative to `now`, zero if `now` is earlier.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.submitted_at).to_std().unwrap_or(Duration::ZERO)
    }
}
