mod config;
mod ranking;

pub use config::SchedulingConfig;

use super::domain::{Coordination, Vote};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Stateless decision engine that turns the latest candidate slate into a
/// confidence-ranked recommendation.
pub struct ConfirmationPolicy {
    config: SchedulingConfig,
}

impl ConfirmationPolicy {
    pub fn new(config: SchedulingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Evaluate a slate against the proposed slots. The report always names
    /// the top slot when one exists; `auto_confirm` is only set when its
    /// confidence meets the configured threshold.
    pub fn evaluate(&self, coordination: &Coordination, vote: &Vote) -> ConfidenceReport {
        let entries: Vec<ConfidenceEntry> =
            ranking::slate_signals(coordination, vote, &self.config)
                .into_iter()
                .map(|signal| ConfidenceEntry {
                    slot_index: signal.slot_index,
                    slot_score: signal.slot_score,
                    rank_score: signal.rank_score,
                    confidence: signal.confidence,
                    notes: format!(
                        "rank {} -> {:.0}, slot score {}, availability {}",
                        signal.rank,
                        signal.rank_score,
                        signal.slot_score,
                        signal.availability.label()
                    ),
                })
                .collect();

        let winner = entries
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(Ordering::Equal)
            })
            .map(|entry| SlotRecommendation {
                slot_index: entry.slot_index,
                confidence: entry.confidence,
                auto_confirm: entry.confidence >= self.config.confirm_threshold,
            });

        ConfidenceReport {
            entries,
            winner,
            threshold: self.config.confirm_threshold,
        }
    }
}

/// Per-slot contribution to the decision, kept for transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEntry {
    pub slot_index: usize,
    pub slot_score: u8,
    pub rank_score: f32,
    pub confidence: f32,
    pub notes: String,
}

/// The candidate winner of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecommendation {
    pub slot_index: usize,
    pub confidence: f32,
    pub auto_confirm: bool,
}

/// Full decision trail for one `cast_votes` evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub entries: Vec<ConfidenceEntry>,
    pub winner: Option<SlotRecommendation>,
    pub threshold: f32,
}

impl ConfidenceReport {
    pub fn confidence(&self) -> f32 {
        self.winner
            .as_ref()
            .map(|winner| winner.confidence)
            .unwrap_or(0.0)
    }
}
