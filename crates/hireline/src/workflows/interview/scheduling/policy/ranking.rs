use super::super::domain::{Availability, Coordination, Vote};
use super::config::SchedulingConfig;

const TOP_RANK_SCORE: f32 = 100.0;
const RANK_STEP: f32 = 20.0;
const RANK_FLOOR: f32 = 10.0;

pub(crate) struct SlotSignal {
    pub slot_index: usize,
    pub slot_score: u8,
    pub rank: u32,
    pub rank_score: f32,
    pub availability: Availability,
    pub confidence: f32,
}

/// Convert a preference rank to the 0-100 scale: rank 1 maps to 100 and each
/// further rank steps down, never below the floor.
pub(crate) fn rank_to_score(rank: u32) -> f32 {
    let steps = rank.saturating_sub(1) as f32;
    (TOP_RANK_SCORE - RANK_STEP * steps).max(RANK_FLOOR)
}

/// Blend the static slot score with the candidate's rank for every slate
/// entry that is not flagged unavailable. Entries pointing outside the slot
/// list are skipped; validation happens before votes are stored, so a miss
/// here only occurs on historical slates read defensively.
pub(crate) fn slate_signals(
    coordination: &Coordination,
    vote: &Vote,
    config: &SchedulingConfig,
) -> Vec<SlotSignal> {
    vote.entries
        .iter()
        .filter(|entry| entry.availability != Availability::Unavailable)
        .filter_map(|entry| {
            let slot = coordination.proposed_slots.get(entry.slot_index)?;
            let rank_score = rank_to_score(entry.rank);
            let blended =
                config.score_weight * f32::from(slot.score) + config.rank_weight * rank_score;
            let factor = match entry.availability {
                Availability::Available => 1.0,
                Availability::Maybe => config.maybe_penalty,
                Availability::Unavailable => unreachable!("filtered above"),
            };

            Some(SlotSignal {
                slot_index: entry.slot_index,
                slot_score: slot.score,
                rank: entry.rank,
                rank_score,
                availability: entry.availability,
                confidence: blended * factor,
            })
        })
        .collect()
}
