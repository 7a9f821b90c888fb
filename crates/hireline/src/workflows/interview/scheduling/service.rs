use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::domain::{
    ApplicationId, CancellationRecord, ConfirmedBy, ConfirmedSlot, Coordination, CoordinationId,
    CoordinationStatus, JobId, NotificationLedger, PartyId, PartyRole, Slot, SlotProposal, Vote,
    VoteEntry,
};
use super::policy::{ConfidenceReport, ConfirmationPolicy, SchedulingConfig};
use super::repository::{
    CalendarClient, CalendarEventRequest, CoordinationStore, Notification, NotificationKind,
    NotificationPublisher, StoreError,
};
use super::score::score_slot;

/// Error raised by coordination operations. Every variant is an expected
/// business condition; callers translate kinds to transport responses.
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    #[error("no coordination found for application")]
    NotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cannot {operation} while coordination is {status}")]
    InvalidState {
        status: CoordinationStatus,
        operation: &'static str,
    },
    #[error("voting deadline has passed")]
    DeadlineExpired,
    #[error("actor is not a party to this coordination")]
    Forbidden,
    #[error("cancellation window closed: {hours_remaining}h before start, {minimum}h required")]
    TooLate { hours_remaining: i64, minimum: i64 },
    #[error("concurrent update conflict; retry the operation")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inbound payload for opening (or re-opening) a proposal round. The
/// employer id is both a foreign reference and the acting party.
#[derive(Debug, Clone)]
pub struct ProposeRequest {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub employer_id: PartyId,
    pub candidate_id: PartyId,
    pub slots: Vec<SlotProposal>,
    pub voting_deadline: DateTime<Utc>,
}

/// Result of `cast_votes`: the persisted aggregate plus the confirmation
/// outcome, never stale relative to the store.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub coordination: Coordination,
    pub confirmed: bool,
    pub confidence: f32,
    pub report: ConfidenceReport,
}

static COORDINATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_coordination_id() -> CoordinationId {
    let id = COORDINATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CoordinationId(format!("coord-{id:06}"))
}

/// Service composing the slot estimator, confirmation policy, store, and
/// notification/calendar collaborators.
///
/// Every mutation is a read-modify-write guarded by the store's version
/// check, retried a bounded number of times before surfacing `Conflict`.
/// Collaborator side effects run only after the state change is committed;
/// their failures are logged and left visible through the notification
/// ledger rather than rolled into the operation result.
pub struct CoordinationService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    calendar: Option<Arc<dyn CalendarClient>>,
    policy: ConfirmationPolicy,
    config: SchedulingConfig,
}

impl<S, N> CoordinationService<S, N>
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: SchedulingConfig) -> Self {
        Self {
            store,
            notifier,
            calendar: None,
            policy: ConfirmationPolicy::new(config.clone()),
            config,
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarClient>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// Open a proposal round: create the coordination in `Voting`, or
    /// wholesale-replace the slot list on an existing one. Replacement
    /// clears all votes, since slates reference positional indices that stop
    /// being meaningful. Re-proposing a cancelled negotiation reopens it;
    /// a confirmed one must be cancelled first.
    pub fn propose_slots(
        &self,
        request: ProposeRequest,
        now: DateTime<Utc>,
    ) -> Result<Coordination, CoordinationError> {
        if request.slots.is_empty() {
            return Err(CoordinationError::InvalidInput(
                "at least one slot must be proposed".to_string(),
            ));
        }
        if request.voting_deadline <= now {
            return Err(CoordinationError::InvalidInput(
                "voting deadline must be in the future".to_string(),
            ));
        }

        let scored: Vec<Slot> = request
            .slots
            .into_iter()
            .map(|proposal| {
                let score = score_slot(&proposal, now);
                proposal.into_slot(score)
            })
            .collect();
        let deadline = request.voting_deadline;

        let stored = match self.store.fetch(&request.application_id)? {
            None => {
                let coordination = Coordination {
                    coordination_id: next_coordination_id(),
                    application_id: request.application_id.clone(),
                    job_id: request.job_id,
                    employer_id: request.employer_id,
                    candidate_id: request.candidate_id,
                    proposed_slots: scored,
                    votes: BTreeMap::new(),
                    confirmed_slot: None,
                    status: CoordinationStatus::Voting,
                    voting_deadline: Some(deadline),
                    cancellation: None,
                    notifications: NotificationLedger::default(),
                    version: 0,
                };
                self.store.insert(coordination).map_err(|err| match err {
                    StoreError::Conflict => CoordinationError::Conflict,
                    other => CoordinationError::Store(other),
                })?
            }
            Some(_) => self.modify(&request.application_id, |coordination| {
                if coordination.employer_id != request.employer_id {
                    return Err(CoordinationError::Forbidden);
                }
                if coordination.status == CoordinationStatus::Confirmed {
                    return Err(CoordinationError::InvalidState {
                        status: coordination.status,
                        operation: "propose slots",
                    });
                }

                coordination.proposed_slots = scored.clone();
                coordination.votes.clear();
                coordination.status = CoordinationStatus::Voting;
                coordination.voting_deadline = Some(deadline);
                coordination.confirmed_slot = None;
                coordination.cancellation = None;
                // The sent flags dedupe retries within one round; a fresh
                // round must notify its own confirmation and cancellation.
                coordination.notifications.confirmed_sent = false;
                coordination.notifications.cancelled_sent = false;
                Ok(())
            })?,
        };

        Ok(self.notify_proposal(stored, deadline))
    }

    /// Append one scored slot without disturbing existing votes: appends
    /// never shift indices, so in-flight slates stay valid.
    pub fn add_slot(
        &self,
        key: &ApplicationId,
        actor: &PartyId,
        proposal: SlotProposal,
        now: DateTime<Utc>,
    ) -> Result<Coordination, CoordinationError> {
        let score = score_slot(&proposal, now);
        let slot = proposal.into_slot(score);
        let default_window = Duration::hours(self.config.default_voting_window_hours);

        self.modify(key, |coordination| {
            if &coordination.employer_id != actor {
                return Err(CoordinationError::Forbidden);
            }
            match coordination.status {
                CoordinationStatus::Confirmed | CoordinationStatus::Cancelled => {
                    return Err(CoordinationError::InvalidState {
                        status: coordination.status,
                        operation: "add a slot",
                    });
                }
                CoordinationStatus::Pending => {
                    coordination.status = CoordinationStatus::Voting;
                    if coordination.voting_deadline.is_none() {
                        coordination.voting_deadline = Some(now + default_window);
                    }
                }
                CoordinationStatus::Voting => {}
            }

            coordination.proposed_slots.push(slot.clone());
            Ok(())
        })
    }

    /// Record the candidate's slate, replacing any prior one, then run the
    /// confirmation policy synchronously. An auto-confirmation is persisted
    /// before this returns, so the reported flag is never stale.
    ///
    /// Preconditions are checked in order, first failure wins: existence,
    /// status, deadline, actor, slate shape.
    pub fn cast_votes(
        &self,
        key: &ApplicationId,
        candidate_id: &PartyId,
        entries: Vec<VoteEntry>,
        now: DateTime<Utc>,
    ) -> Result<VoteOutcome, CoordinationError> {
        let mut report: Option<ConfidenceReport> = None;

        let stored = self.modify(key, |coordination| {
            match coordination.status {
                CoordinationStatus::Confirmed | CoordinationStatus::Cancelled => {
                    return Err(CoordinationError::InvalidState {
                        status: coordination.status,
                        operation: "cast votes",
                    });
                }
                CoordinationStatus::Pending => {
                    return Err(CoordinationError::InvalidState {
                        status: coordination.status,
                        operation: "cast votes",
                    });
                }
                CoordinationStatus::Voting => {}
            }

            let deadline = match coordination.voting_deadline {
                Some(deadline) => deadline,
                None => {
                    return Err(CoordinationError::InvalidState {
                        status: coordination.status,
                        operation: "cast votes",
                    });
                }
            };
            if now > deadline {
                return Err(CoordinationError::DeadlineExpired);
            }
            if &coordination.candidate_id != candidate_id {
                return Err(CoordinationError::Forbidden);
            }
            validate_slate(&entries, coordination.proposed_slots.len())?;

            let vote = Vote {
                candidate_id: candidate_id.clone(),
                entries: entries.clone(),
                cast_at: now,
            };
            let evaluation = self.policy.evaluate(coordination, &vote);
            coordination.votes.insert(candidate_id.clone(), vote);

            if let Some(winner) = evaluation
                .winner
                .as_ref()
                .filter(|winner| winner.auto_confirm)
            {
                apply_confirmation(coordination, winner.slot_index, ConfirmedBy::Policy, now)?;
                info!(
                    application_id = %coordination.application_id.0,
                    slot_index = winner.slot_index,
                    confidence = winner.confidence,
                    "auto-confirmed interview slot"
                );
            }

            report = Some(evaluation);
            Ok(())
        })?;

        let report = report.take().unwrap_or(ConfidenceReport {
            entries: Vec::new(),
            winner: None,
            threshold: self.config.confirm_threshold,
        });

        let coordination = if stored.status == CoordinationStatus::Confirmed {
            self.send_confirmation_effects(stored)
        } else {
            stored
        };

        Ok(VoteOutcome {
            confirmed: coordination.status == CoordinationStatus::Confirmed,
            confidence: report.confidence(),
            report,
            coordination,
        })
    }

    /// Employer escape hatch when no slot reaches auto-confirm confidence.
    pub fn confirm(
        &self,
        key: &ApplicationId,
        actor: &PartyId,
        slot_index: usize,
        now: DateTime<Utc>,
    ) -> Result<Coordination, CoordinationError> {
        let stored = self.modify(key, |coordination| {
            if &coordination.employer_id != actor {
                return Err(CoordinationError::Forbidden);
            }
            if coordination.status != CoordinationStatus::Voting {
                return Err(CoordinationError::InvalidState {
                    status: coordination.status,
                    operation: "confirm",
                });
            }
            apply_confirmation(coordination, slot_index, ConfirmedBy::Employer, now)
        })?;

        Ok(self.send_confirmation_effects(stored))
    }

    /// Cancel a confirmed interview, enforcing the minimum lead time. The
    /// confirmed slot snapshot is retained for audit.
    pub fn cancel(
        &self,
        key: &ApplicationId,
        actor: &PartyId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Coordination, CoordinationError> {
        let minimum = self.config.min_cancellation_lead_hours;
        let mut actor_role = PartyRole::Employer;

        let stored = self.modify(key, |coordination| {
            let role = coordination
                .role_of(actor)
                .ok_or(CoordinationError::Forbidden)?;
            if coordination.status != CoordinationStatus::Confirmed {
                return Err(CoordinationError::InvalidState {
                    status: coordination.status,
                    operation: "cancel",
                });
            }
            let confirmed = match coordination.confirmed_slot.as_ref() {
                Some(confirmed) => confirmed,
                None => {
                    return Err(CoordinationError::InvalidState {
                        status: coordination.status,
                        operation: "cancel",
                    });
                }
            };

            let lead = confirmed.slot.start - now;
            if lead < Duration::hours(minimum) {
                return Err(CoordinationError::TooLate {
                    hours_remaining: lead.num_hours().max(0),
                    minimum,
                });
            }

            let reason = reason
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| "no reason provided".to_string());
            coordination.status = CoordinationStatus::Cancelled;
            coordination.cancellation = Some(CancellationRecord {
                cancelled_at: now,
                cancelled_by: role,
                reason,
            });
            actor_role = role;
            Ok(())
        })?;

        Ok(self.send_cancellation_effects(stored, actor_role))
    }

    pub fn get(&self, key: &ApplicationId) -> Result<Coordination, CoordinationError> {
        self.store.fetch(key)?.ok_or(CoordinationError::NotFound)
    }

    pub fn list_for_party(
        &self,
        party: &PartyId,
        status: Option<CoordinationStatus>,
    ) -> Result<Vec<Coordination>, CoordinationError> {
        Ok(self.store.list_by_party(party, status)?)
    }

    /// Read-modify-write with optimistic version retry. Bounded by
    /// `max_write_attempts`; exhaustion surfaces `Conflict` so callers can
    /// retry instead of blocking.
    fn modify<F>(&self, key: &ApplicationId, mut apply: F) -> Result<Coordination, CoordinationError>
    where
        F: FnMut(&mut Coordination) -> Result<(), CoordinationError>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut coordination = self.store.fetch(key)?.ok_or(CoordinationError::NotFound)?;
            let expected = coordination.version;
            apply(&mut coordination)?;
            match self.store.update(coordination, expected) {
                Ok(stored) => return Ok(stored),
                Err(StoreError::VersionConflict { .. })
                    if attempts < self.config.max_write_attempts =>
                {
                    continue;
                }
                Err(StoreError::VersionConflict { .. }) => {
                    return Err(CoordinationError::Conflict)
                }
                Err(other) => return Err(CoordinationError::Store(other)),
            }
        }
    }

    /// Best-effort proposal notice to the candidate, emitted once per
    /// distinct deadline value.
    fn notify_proposal(&self, coordination: Coordination, deadline: DateTime<Utc>) -> Coordination {
        if coordination.notifications.proposal_sent_for == Some(deadline) {
            return coordination;
        }

        let mut details = BTreeMap::new();
        details.insert(
            "application_id".to_string(),
            coordination.application_id.0.clone(),
        );
        details.insert(
            "slot_count".to_string(),
            coordination.proposed_slots.len().to_string(),
        );
        details.insert("voting_deadline".to_string(), deadline.to_rfc3339());

        if self.emit(
            &coordination.candidate_id,
            NotificationKind::SlotsProposed,
            details,
        ) {
            if let Some(updated) = self.record_notification(&coordination.application_id, |ledger| {
                ledger.proposal_sent_for = Some(deadline);
            }) {
                return updated;
            }
        }
        coordination
    }

    /// Post-commit side of a confirmation: notify both parties, then attach
    /// a calendar event when a client is wired in. Neither step can undo the
    /// confirmed state.
    fn send_confirmation_effects(&self, stored: Coordination) -> Coordination {
        let mut coordination = stored;

        if !coordination.notifications.confirmed_sent {
            let details = confirmation_details(&coordination);
            let employer_ok = self.emit(
                &coordination.employer_id,
                NotificationKind::InterviewConfirmed,
                details.clone(),
            );
            let candidate_ok = self.emit(
                &coordination.candidate_id,
                NotificationKind::InterviewConfirmed,
                details,
            );
            if employer_ok && candidate_ok {
                if let Some(updated) =
                    self.record_notification(&coordination.application_id, |ledger| {
                        ledger.confirmed_sent = true;
                    })
                {
                    coordination = updated;
                }
            }
        }

        let request = coordination
            .confirmed_slot
            .as_ref()
            .filter(|confirmed| confirmed.calendar_event.is_none())
            .map(|confirmed| calendar_request(&coordination, confirmed));
        if let (Some(calendar), Some(request)) = (self.calendar.as_ref(), request) {
            match calendar.create_event(request) {
                Ok(event) => {
                    let key = coordination.application_id.clone();
                    match self.modify(&key, |record| {
                        if let Some(confirmed) = record.confirmed_slot.as_mut() {
                            confirmed.calendar_event = Some(event.clone());
                        }
                        Ok(())
                    }) {
                        Ok(updated) => coordination = updated,
                        Err(err) => warn!(
                            error = %err,
                            application_id = %key.0,
                            "failed to persist calendar event reference"
                        ),
                    }
                }
                Err(err) => warn!(
                    error = %err,
                    application_id = %coordination.application_id.0,
                    "calendar event creation failed; confirmation stands without one"
                ),
            }
        }

        coordination
    }

    /// Post-commit side of a cancellation: notify the counterparty and
    /// acknowledge the actor.
    fn send_cancellation_effects(
        &self,
        stored: Coordination,
        actor_role: PartyRole,
    ) -> Coordination {
        let mut coordination = stored;
        if coordination.notifications.cancelled_sent {
            return coordination;
        }

        let mut details = BTreeMap::new();
        details.insert(
            "application_id".to_string(),
            coordination.application_id.0.clone(),
        );
        if let Some(record) = coordination.cancellation.as_ref() {
            details.insert("reason".to_string(), record.reason.clone());
            details.insert(
                "cancelled_by".to_string(),
                record.cancelled_by.label().to_string(),
            );
        }

        let counterparty = coordination.counterparty(actor_role).clone();
        let actor = match actor_role {
            PartyRole::Employer => coordination.employer_id.clone(),
            PartyRole::Candidate => coordination.candidate_id.clone(),
        };

        let counterparty_ok = self.emit(
            &counterparty,
            NotificationKind::InterviewCancelled,
            details.clone(),
        );
        let actor_ok = self.emit(
            &actor,
            NotificationKind::CancellationAcknowledged,
            details,
        );
        if counterparty_ok && actor_ok {
            if let Some(updated) = self.record_notification(&coordination.application_id, |ledger| {
                ledger.cancelled_sent = true;
            }) {
                coordination = updated;
            }
        }

        coordination
    }

    /// Fire-and-forget emit. Failures are logged, never propagated.
    fn emit(
        &self,
        recipient: &PartyId,
        kind: NotificationKind,
        details: BTreeMap<String, String>,
    ) -> bool {
        let notification = Notification {
            recipient: recipient.clone(),
            kind,
            details,
        };
        match self.notifier.publish(notification) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    error = %err,
                    recipient = %recipient.0,
                    kind = kind.label(),
                    "notification delivery failed"
                );
                false
            }
        }
    }

    /// Persist a notification ledger change. The flag write is best-effort:
    /// losing it only means a retried operation re-emits an idempotent
    /// notification.
    fn record_notification<F>(&self, key: &ApplicationId, mut mark: F) -> Option<Coordination>
    where
        F: FnMut(&mut NotificationLedger),
    {
        match self.modify(key, |coordination| {
            mark(&mut coordination.notifications);
            Ok(())
        }) {
            Ok(stored) => Some(stored),
            Err(err) => {
                warn!(
                    error = %err,
                    application_id = %key.0,
                    "failed to record notification ledger update"
                );
                None
            }
        }
    }
}

fn validate_slate(entries: &[VoteEntry], slot_count: usize) -> Result<(), CoordinationError> {
    if entries.is_empty() {
        return Err(CoordinationError::InvalidInput(
            "a vote must rank at least one slot".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for entry in entries {
        if entry.slot_index >= slot_count {
            return Err(CoordinationError::InvalidInput(format!(
                "slot index {} is out of range (have {} slots)",
                entry.slot_index, slot_count
            )));
        }
        if entry.rank == 0 {
            return Err(CoordinationError::InvalidInput(
                "ranks start at 1".to_string(),
            ));
        }
        if !seen.insert(entry.slot_index) {
            return Err(CoordinationError::InvalidInput(format!(
                "duplicate vote for slot index {}",
                entry.slot_index
            )));
        }
    }
    Ok(())
}

fn apply_confirmation(
    coordination: &mut Coordination,
    slot_index: usize,
    confirmed_by: ConfirmedBy,
    now: DateTime<Utc>,
) -> Result<(), CoordinationError> {
    let slot = coordination
        .proposed_slots
        .get(slot_index)
        .cloned()
        .ok_or_else(|| {
            CoordinationError::InvalidInput(format!("slot index {slot_index} is out of range"))
        })?;

    coordination.confirmed_slot = Some(ConfirmedSlot {
        slot,
        slot_index,
        confirmed_at: now,
        confirmed_by,
        calendar_event: None,
    });
    coordination.status = CoordinationStatus::Confirmed;
    Ok(())
}

fn confirmation_details(coordination: &Coordination) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert(
        "application_id".to_string(),
        coordination.application_id.0.clone(),
    );
    if let Some(confirmed) = coordination.confirmed_slot.as_ref() {
        details.insert("slot_index".to_string(), confirmed.slot_index.to_string());
        details.insert("start".to_string(), confirmed.slot.start.to_rfc3339());
        details.insert("end".to_string(), confirmed.slot.end.to_rfc3339());
        details.insert(
            "modality".to_string(),
            confirmed.slot.modality.label().to_string(),
        );
        details.insert(
            "confirmed_by".to_string(),
            confirmed.confirmed_by.label().to_string(),
        );
    }
    details
}

fn calendar_request(
    coordination: &Coordination,
    confirmed: &ConfirmedSlot,
) -> CalendarEventRequest {
    CalendarEventRequest {
        title: format!("Interview for application {}", coordination.application_id.0),
        description: format!("Job {}", coordination.job_id.0),
        start: confirmed.slot.start,
        end: confirmed.slot.end,
        timezone: confirmed.slot.timezone.clone(),
        attendees: vec![
            coordination.employer_id.clone(),
            coordination.candidate_id.clone(),
        ],
    }
}
