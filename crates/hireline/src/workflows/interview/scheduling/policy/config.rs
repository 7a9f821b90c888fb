use serde::{Deserialize, Serialize};

/// Policy dials for the coordination service. The confirmation threshold is
/// an explicit parameter here rather than a module constant so deployments
/// and tests can vary it without touching the decision logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Minimum combined confidence (0-100 scale) for auto-confirmation.
    pub confirm_threshold: f32,
    /// Blend weight of the static estimator score.
    pub score_weight: f32,
    /// Blend weight of the candidate's preference rank.
    pub rank_weight: f32,
    /// Multiplier applied when the candidate answered `maybe`.
    pub maybe_penalty: f32,
    /// Minimum interval before a confirmed start time during which either
    /// party may still cancel.
    pub min_cancellation_lead_hours: i64,
    /// Voting window applied when a pending coordination is promoted without
    /// an explicit deadline.
    pub default_voting_window_hours: i64,
    /// Bounded retries for optimistic-concurrency write conflicts.
    pub max_write_attempts: u32,
}
