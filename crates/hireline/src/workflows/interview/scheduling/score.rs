//! Slot optimality estimator.
//!
//! Pure heuristics over the proposed window, no storage or network access.
//! The weights are a deployment policy choice, stable within a release:
//!
//! - base 50
//! - start within business hours (09:00-17:00 wall clock) +20, before 08:00
//!   or from 20:00 on -10
//! - weekday +15, weekend -10
//! - 1-10 days of lead time +15, same-day -10, more than 30 days out -10
//!
//! The result is clamped to 0..=100. Degenerate windows fall back to the
//! neutral midpoint instead of failing.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};

use super::domain::SlotProposal;

pub const NEUTRAL_SCORE: u8 = 50;

const BUSINESS_HOURS_BONUS: i16 = 20;
const OFF_HOURS_PENALTY: i16 = 10;
const WEEKDAY_BONUS: i16 = 15;
const WEEKEND_PENALTY: i16 = 10;
const LEAD_TIME_BONUS: i16 = 15;
const LEAD_TIME_PENALTY: i16 = 10;

/// Score a proposed slot against `now`. Deterministic for a fixed `now`.
pub fn score_slot(proposal: &SlotProposal, now: DateTime<Utc>) -> u8 {
    if proposal.end <= proposal.start {
        return NEUTRAL_SCORE;
    }

    let mut score = i16::from(NEUTRAL_SCORE);

    let hour = proposal.start.hour();
    if (9..17).contains(&hour) {
        score += BUSINESS_HOURS_BONUS;
    } else if hour < 8 || hour >= 20 {
        score -= OFF_HOURS_PENALTY;
    }

    match proposal.start.weekday() {
        Weekday::Sat | Weekday::Sun => score -= WEEKEND_PENALTY,
        _ => score += WEEKDAY_BONUS,
    }

    let lead = proposal.start - now;
    if lead >= Duration::days(1) && lead <= Duration::days(10) {
        score += LEAD_TIME_BONUS;
    } else if lead < Duration::days(1) || lead > Duration::days(30) {
        score -= LEAD_TIME_PENALTY;
    }

    score.clamp(0, 100) as u8
}
