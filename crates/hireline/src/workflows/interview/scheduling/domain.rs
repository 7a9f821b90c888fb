use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for a coordination aggregate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoordinationId(pub String);

/// Identifier of the job application under negotiation. Doubles as the
/// coordination key: one coordination exists per application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Opaque reference to the advertised job posting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier for either party of the negotiation (employer or candidate).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

/// Lifecycle state of a coordination. The single source of truth: supporting
/// snapshots (`confirmed_slot`, `cancellation`) hang off this state rather
/// than acting as independent flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationStatus {
    Pending,
    Voting,
    Confirmed,
    Cancelled,
}

impl CoordinationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CoordinationStatus::Pending => "pending",
            CoordinationStatus::Voting => "voting",
            CoordinationStatus::Confirmed => "confirmed",
            CoordinationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CoordinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the interview will be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotModality {
    Video,
    Phone,
    InPerson,
}

impl SlotModality {
    pub const fn label(self) -> &'static str {
        match self {
            SlotModality::Video => "video",
            SlotModality::Phone => "phone",
            SlotModality::InPerson => "in_person",
        }
    }
}

/// Inbound, unscored shape of a proposed time window. Scoring happens when
/// the proposal is accepted into a coordination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotProposal {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA timezone identifier, stored for display only.
    pub timezone: String,
    pub modality: SlotModality,
    pub meeting_link: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl SlotProposal {
    pub fn into_slot(self, score: u8) -> Slot {
        Slot {
            start: self.start,
            end: self.end,
            timezone: self.timezone,
            modality: self.modality,
            meeting_link: self.meeting_link,
            location: self.location,
            notes: self.notes,
            score,
        }
    }
}

/// A proposed time window with its computed optimality score. Immutable once
/// created; new proposal rounds produce new `Slot` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub modality: SlotModality,
    pub meeting_link: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// Estimator output in 0..=100.
    pub score: u8,
}

/// Candidate-declared availability for one ranked slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Maybe,
    Unavailable,
}

impl Availability {
    pub const fn label(self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Maybe => "maybe",
            Availability::Unavailable => "unavailable",
        }
    }
}

/// One ranked entry of a candidate's slate. `slot_index` is positional into
/// `Coordination::proposed_slots`; rank 1 is the most preferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub slot_index: usize,
    pub rank: u32,
    pub availability: Availability,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A candidate's full slate for one voting round. Resubmission replaces the
/// whole slate; there are no merge semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub candidate_id: PartyId,
    pub entries: Vec<VoteEntry>,
    pub cast_at: DateTime<Utc>,
}

/// Who confirmed the interview time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmedBy {
    Employer,
    Candidate,
    Policy,
}

impl ConfirmedBy {
    pub const fn label(self) -> &'static str {
        match self {
            ConfirmedBy::Employer => "employer",
            ConfirmedBy::Candidate => "candidate",
            ConfirmedBy::Policy => "policy",
        }
    }
}

/// Reference handed back by the external calendar collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventRef {
    pub event_id: String,
    pub meeting_link: Option<String>,
}

/// Snapshot of the winning slot at the moment of confirmation. Retained
/// through cancellation for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedSlot {
    pub slot: Slot,
    pub slot_index: usize,
    pub confirmed_at: DateTime<Utc>,
    pub confirmed_by: ConfirmedBy,
    pub calendar_event: Option<CalendarEventRef>,
}

/// Which side of the negotiation an actor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Employer,
    Candidate,
}

impl PartyRole {
    pub const fn label(self) -> &'static str {
        match self {
            PartyRole::Employer => "employer",
            PartyRole::Candidate => "candidate",
        }
    }
}

/// Record of a policy-gated cancellation. At most one exists, and only after
/// a confirmation was in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: PartyRole,
    pub reason: String,
}

/// Idempotency markers for best-effort notifications. Flags are only set
/// after the corresponding emit succeeded, so a retried operation can safely
/// re-attempt delivery. `proposal_sent_for` stores the deadline value the
/// proposal notice was emitted for: a re-proposal with a new deadline
/// notifies again, an identical retry does not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationLedger {
    pub proposal_sent_for: Option<DateTime<Utc>>,
    pub confirmed_sent: bool,
    pub cancelled_sent: bool,
}

/// Aggregate root tracking one employer-candidate interview negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordination {
    pub coordination_id: CoordinationId,
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub employer_id: PartyId,
    pub candidate_id: PartyId,
    /// Insertion order is significant: votes reference slots by position.
    pub proposed_slots: Vec<Slot>,
    pub votes: BTreeMap<PartyId, Vote>,
    pub confirmed_slot: Option<ConfirmedSlot>,
    pub status: CoordinationStatus,
    /// Required whenever `status` is `Voting`.
    pub voting_deadline: Option<DateTime<Utc>>,
    pub cancellation: Option<CancellationRecord>,
    pub notifications: NotificationLedger,
    /// Optimistic-concurrency token checked by the store on update.
    pub version: u64,
}

impl Coordination {
    /// Resolve which side of the negotiation `party` is on, if any.
    pub fn role_of(&self, party: &PartyId) -> Option<PartyRole> {
        if party == &self.employer_id {
            Some(PartyRole::Employer)
        } else if party == &self.candidate_id {
            Some(PartyRole::Candidate)
        } else {
            None
        }
    }

    pub fn counterparty(&self, role: PartyRole) -> &PartyId {
        match role {
            PartyRole::Employer => &self.candidate_id,
            PartyRole::Candidate => &self.employer_id,
        }
    }

    /// A `Voting` coordination past its deadline is informationally stale:
    /// vote casting is blocked but no background sweep changes the status.
    pub fn voting_closed(&self, now: DateTime<Utc>) -> bool {
        self.status == CoordinationStatus::Voting
            && self
                .voting_deadline
                .map(|deadline| now > deadline)
                .unwrap_or(false)
    }

    /// The most recently cast slate across candidates.
    pub fn latest_vote(&self) -> Option<&Vote> {
        self.votes.values().max_by_key(|vote| vote.cast_at)
    }
}
