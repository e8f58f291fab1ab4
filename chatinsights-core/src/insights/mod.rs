//! Insight aggregation
//!
//! Turns a stream of messages and calls into per-contact rankings, one
//! [`insighters::InsighterKind`] per statistic, and lays the same stream out
//! as chart-race frames.
//!
//! - [`rank`]: rank tables, podium and ranked rows
//! - [`insighters`]: the statistics themselves
//! - [`engine`]: routing, filtering and identity grouping
//! - [`race`]: cumulative message counts per time bucket
//! - [`export`]: the JSON rank document

pub mod engine;
pub mod export;
pub mod insighters;
pub mod race;
pub mod rank;

pub use engine::{Dispatch, InsighterManager, ManagerOptions, RunSummary, SkipReason};
pub use insighters::{Accumulator, Insight, Insighter, InsighterKind, InsighterSettings};
pub use race::{race_frames, RaceFrame, RaceOptions, RaceStanding};
pub use rank::{RankEntry, TrackObject};

use serde::Serialize;

/// Result of one insighter after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub key: InsighterKind,
    pub title: String,
    /// `None` when no event matched
    pub winner: Option<RankEntry>,
    /// Every entry, best first
    pub ranking: Vec<RankEntry>,
    /// Podium size the insighter was built with, for those that keep one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub podium_size: Option<usize>,
}

impl InsightReport {
    pub fn from_insight<A, E>(insight: &Insight<A>) -> Self
    where
        A: Accumulator<E>,
    {
        let ranking = insight.ranked_list::<E>();
        Self {
            key: insight.kind(),
            title: insight.title().to_string(),
            winner: ranking.first().cloned(),
            ranking,
            podium_size: insight.accumulator().podium_size(),
        }
    }

    /// The first `n` ranked entries.
    pub fn podium(&self, n: usize) -> &[RankEntry] {
        &self.ranking[..n.min(self.ranking.len())]
    }
}
