use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::interview::scheduling::domain::{
    ApplicationId, Availability, CalendarEventRef, Coordination, CoordinationStatus, JobId,
    PartyId, SlotModality, SlotProposal, VoteEntry,
};
use crate::workflows::interview::scheduling::repository::{
    CalendarClient, CalendarError, CalendarEventRequest, CoordinationStore, Notification,
    NotificationError, NotificationKind, NotificationPublisher, StoreError,
};
use crate::workflows::interview::scheduling::{
    CoordinationService, ProposeRequest, SchedulingConfig,
};

/// Monday 2026-09-07 12:00 UTC. Tests derive every other instant from this
/// anchor so estimator scores stay deterministic.
pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 7, 12, 0, 0)
        .single()
        .expect("valid anchor time")
}

pub(super) fn scheduling_config() -> SchedulingConfig {
    SchedulingConfig {
        confirm_threshold: 75.0,
        score_weight: 0.5,
        rank_weight: 0.5,
        maybe_penalty: 0.8,
        min_cancellation_lead_hours: 4,
        default_voting_window_hours: 72,
        max_write_attempts: 3,
    }
}

/// Threshold no confidence can reach, for tests that must stay in voting.
pub(super) fn strict_config() -> SchedulingConfig {
    SchedulingConfig {
        confirm_threshold: 1000.0,
        ..scheduling_config()
    }
}

pub(super) fn app_key() -> ApplicationId {
    ApplicationId("app-1042".to_string())
}

pub(super) fn employer() -> PartyId {
    PartyId("emp-9".to_string())
}

pub(super) fn candidate() -> PartyId {
    PartyId("cand-3".to_string())
}

pub(super) fn stranger() -> PartyId {
    PartyId("other-1".to_string())
}

pub(super) fn slot_at(start: DateTime<Utc>) -> SlotProposal {
    SlotProposal {
        start,
        end: start + Duration::hours(1),
        timezone: "America/Chicago".to_string(),
        modality: SlotModality::Video,
        meeting_link: None,
        location: None,
        notes: None,
    }
}

/// Thursday 10:00, three days of lead: scores the estimator maximum.
pub(super) fn prime_slot() -> SlotProposal {
    slot_at(Utc.with_ymd_and_hms(2026, 9, 10, 10, 0, 0).single().expect("valid"))
}

/// Saturday 06:00, five days out: early, weekend, scores 45.
pub(super) fn weekend_early_slot() -> SlotProposal {
    slot_at(Utc.with_ymd_and_hms(2026, 9, 12, 6, 0, 0).single().expect("valid"))
}

pub(super) fn default_deadline() -> DateTime<Utc> {
    base_time() + Duration::days(2)
}

pub(super) fn propose_request(slots: Vec<SlotProposal>) -> ProposeRequest {
    ProposeRequest {
        application_id: app_key(),
        job_id: JobId("job-77".to_string()),
        employer_id: employer(),
        candidate_id: candidate(),
        slots,
        voting_deadline: default_deadline(),
    }
}

pub(super) fn entry(slot_index: usize, rank: u32, availability: Availability) -> VoteEntry {
    VoteEntry {
        slot_index,
        rank,
        availability,
        notes: None,
    }
}

pub(super) fn build_service(
    config: SchedulingConfig,
) -> (
    CoordinationService<MemoryStore, MemoryNotifier>,
    Arc<MemoryStore>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = CoordinationService::new(store.clone(), notifier.clone(), config);
    (service, store, notifier)
}

pub(super) fn assert_confirmation_invariant(coordination: &Coordination) {
    let should_have_snapshot = matches!(
        coordination.status,
        CoordinationStatus::Confirmed | CoordinationStatus::Cancelled
    );
    assert_eq!(
        coordination.confirmed_slot.is_some(),
        should_have_snapshot,
        "confirmed_slot presence must track status, got {:?}",
        coordination.status
    );
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Coordination>>>,
}

impl CoordinationStore for MemoryStore {
    fn insert(&self, coordination: Coordination) -> Result<Coordination, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&coordination.application_id.0) {
            return Err(StoreError::Conflict);
        }
        guard.insert(coordination.application_id.0.clone(), coordination.clone());
        Ok(coordination)
    }

    fn update(
        &self,
        mut coordination: Coordination,
        expected_version: u64,
    ) -> Result<Coordination, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let current = guard
            .get(&coordination.application_id.0)
            .ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: current.version,
            });
        }
        coordination.version = expected_version + 1;
        guard.insert(coordination.application_id.0.clone(), coordination.clone());
        Ok(coordination)
    }

    fn fetch(&self, key: &ApplicationId) -> Result<Option<Coordination>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(&key.0).cloned())
    }

    fn list_by_party(
        &self,
        party: &PartyId,
        status: Option<CoordinationStatus>,
    ) -> Result<Vec<Coordination>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|coordination| {
                &coordination.employer_id == party || &coordination.candidate_id == party
            })
            .filter(|coordination| {
                status
                    .map(|wanted| coordination.status == wanted)
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }
}

/// Store double that fails every call, for 500-path router tests.
pub(super) struct UnavailableStore;

impl CoordinationStore for UnavailableStore {
    fn insert(&self, _coordination: Coordination) -> Result<Coordination, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn update(
        &self,
        _coordination: Coordination,
        _expected_version: u64,
    ) -> Result<Coordination, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _key: &ApplicationId) -> Result<Option<Coordination>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    fn list_by_party(
        &self,
        _party: &PartyId,
        _status: Option<CoordinationStatus>,
    ) -> Result<Vec<Coordination>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn count_of(&self, kind: NotificationKind) -> usize {
        self.events()
            .iter()
            .filter(|notification| notification.kind == kind)
            .count()
    }
}

/// Notifier double whose transport always fails.
pub(super) struct FailingNotifier;

impl NotificationPublisher for FailingNotifier {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp down".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryCalendar {
    requests: Mutex<Vec<CalendarEventRequest>>,
}

impl CalendarClient for MemoryCalendar {
    fn create_event(
        &self,
        request: CalendarEventRequest,
    ) -> Result<CalendarEventRef, CalendarError> {
        let mut guard = self.requests.lock().expect("calendar mutex poisoned");
        guard.push(request);
        Ok(CalendarEventRef {
            event_id: format!("evt-{}", guard.len()),
            meeting_link: Some("https://meet.example.com/abc".to_string()),
        })
    }
}

impl MemoryCalendar {
    pub(super) fn requests(&self) -> Vec<CalendarEventRequest> {
        self.requests.lock().expect("calendar mutex poisoned").clone()
    }
}

pub(super) struct FailingCalendar;

impl CalendarClient for FailingCalendar {
    fn create_event(
        &self,
        _request: CalendarEventRequest,
    ) -> Result<CalendarEventRef, CalendarError> {
        Err(CalendarError::Unavailable("calendar api timeout".to_string()))
    }
}
