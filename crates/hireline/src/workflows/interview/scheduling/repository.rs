use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, CalendarEventRef, Coordination, CoordinationStatus, PartyId,
};

/// Storage abstraction for coordination aggregates so the service can be
/// exercised against in-memory fakes. The coordination key is the
/// application id; the write path is load-by-key plus version-checked save.
pub trait CoordinationStore: Send + Sync {
    fn insert(&self, coordination: Coordination) -> Result<Coordination, StoreError>;
    /// Persist a modified aggregate. Fails with `VersionConflict` when the
    /// stored version no longer matches `expected_version`; the caller
    /// re-reads and retries.
    fn update(
        &self,
        coordination: Coordination,
        expected_version: u64,
    ) -> Result<Coordination, StoreError>;
    fn fetch(&self, key: &ApplicationId) -> Result<Option<Coordination>, StoreError>;
    /// Read-only listing outside the write path.
    fn list_by_party(
        &self,
        party: &PartyId,
        status: Option<CoordinationStatus>,
    ) -> Result<Vec<Coordination>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("coordination already exists")]
    Conflict,
    #[error("coordination not found")]
    NotFound,
    #[error("stale write: expected version {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook. Fire-and-forget from the coordinator's
/// perspective: failures are logged by the service, never propagated.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Payload handed to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: PartyId,
    pub kind: NotificationKind,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SlotsProposed,
    InterviewConfirmed,
    InterviewCancelled,
    CancellationAcknowledged,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::SlotsProposed => "slots_proposed",
            NotificationKind::InterviewConfirmed => "interview_confirmed",
            NotificationKind::InterviewCancelled => "interview_cancelled",
            NotificationKind::CancellationAcknowledged => "cancellation_acknowledged",
        }
    }
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Optional external calendar collaborator. Invoked only after a confirmed
/// state is durably written; absence or failure never blocks confirmation.
pub trait CalendarClient: Send + Sync {
    fn create_event(&self, request: CalendarEventRequest) -> Result<CalendarEventRef, CalendarError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventRequest {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub attendees: Vec<PartyId>,
}

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar unavailable: {0}")]
    Unavailable(String),
    #[error("calendar rejected the event: {0}")]
    Rejected(String),
}

/// Sanitized representation of a coordination for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinationView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub slot_count: usize,
    pub votes_cast: usize,
    pub voting_deadline: Option<DateTime<Utc>>,
    /// True when the deadline passed while the coordination is still voting.
    pub voting_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<ConfirmedSlotView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<CancellationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedSlotView {
    pub slot_index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub modality: &'static str,
    pub confirmed_by: &'static str,
    pub confirmed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationView {
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: &'static str,
    pub reason: String,
}

impl Coordination {
    pub fn view(&self, now: DateTime<Utc>) -> CoordinationView {
        CoordinationView {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            slot_count: self.proposed_slots.len(),
            votes_cast: self.votes.len(),
            voting_deadline: self.voting_deadline,
            voting_closed: self.voting_closed(now),
            confirmed: self.confirmed_slot.as_ref().map(|confirmed| {
                let link = confirmed
                    .calendar_event
                    .as_ref()
                    .and_then(|event| event.meeting_link.clone())
                    .or_else(|| confirmed.slot.meeting_link.clone());
                ConfirmedSlotView {
                    slot_index: confirmed.slot_index,
                    start: confirmed.slot.start,
                    end: confirmed.slot.end,
                    timezone: confirmed.slot.timezone.clone(),
                    modality: confirmed.slot.modality.label(),
                    confirmed_by: confirmed.confirmed_by.label(),
                    confirmed_at: confirmed.confirmed_at,
                    meeting_link: link,
                }
            }),
            cancellation: self.cancellation.as_ref().map(|record| CancellationView {
                cancelled_at: record.cancelled_at,
                cancelled_by: record.cancelled_by.label(),
                reason: record.reason.clone(),
            }),
        }
    }
}
