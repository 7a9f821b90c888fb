use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, JobId, PartyId, SlotProposal, VoteEntry};
use super::repository::{CoordinationStore, NotificationPublisher};
use super::service::{CoordinationError, CoordinationService, ProposeRequest};

/// Router builder exposing the coordination operations. The handlers read
/// wall clock once per request and hand it to the service, which performs
/// all further time comparisons against that instant.
pub fn scheduling_router<S, N>(service: Arc<CoordinationService<S, N>>) -> Router
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/interviews/:application_id/slots",
            post(propose_handler::<S, N>),
        )
        .route(
            "/api/v1/interviews/:application_id/slots/append",
            post(add_slot_handler::<S, N>),
        )
        .route(
            "/api/v1/interviews/:application_id/votes",
            post(cast_votes_handler::<S, N>),
        )
        .route(
            "/api/v1/interviews/:application_id/confirm",
            post(confirm_handler::<S, N>),
        )
        .route(
            "/api/v1/interviews/:application_id/cancel",
            post(cancel_handler::<S, N>),
        )
        .route(
            "/api/v1/interviews/:application_id",
            get(view_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProposeSlotsRequest {
    pub(crate) job_id: String,
    pub(crate) employer_id: String,
    pub(crate) candidate_id: String,
    pub(crate) slots: Vec<SlotProposal>,
    pub(crate) voting_deadline: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddSlotRequest {
    pub(crate) employer_id: String,
    pub(crate) slot: SlotProposal,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CastVotesRequest {
    pub(crate) candidate_id: String,
    pub(crate) entries: Vec<VoteEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmRequest {
    pub(crate) employer_id: String,
    pub(crate) slot_index: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelRequest {
    pub(crate) party_id: String,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

pub(crate) async fn propose_handler<S, N>(
    State(service): State<Arc<CoordinationService<S, N>>>,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<ProposeSlotsRequest>,
) -> Response
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    let now = Utc::now();
    let request = ProposeRequest {
        application_id: ApplicationId(application_id),
        job_id: JobId(payload.job_id),
        employer_id: PartyId(payload.employer_id),
        candidate_id: PartyId(payload.candidate_id),
        slots: payload.slots,
        voting_deadline: payload.voting_deadline,
    };

    match service.propose_slots(request, now) {
        Ok(coordination) => {
            (StatusCode::OK, axum::Json(coordination.view(now))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn add_slot_handler<S, N>(
    State(service): State<Arc<CoordinationService<S, N>>>,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<AddSlotRequest>,
) -> Response
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    let now = Utc::now();
    let key = ApplicationId(application_id);
    let actor = PartyId(payload.employer_id);

    match service.add_slot(&key, &actor, payload.slot, now) {
        Ok(coordination) => {
            (StatusCode::OK, axum::Json(coordination.view(now))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cast_votes_handler<S, N>(
    State(service): State<Arc<CoordinationService<S, N>>>,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<CastVotesRequest>,
) -> Response
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    let now = Utc::now();
    let key = ApplicationId(application_id);
    let candidate = PartyId(payload.candidate_id);

    match service.cast_votes(&key, &candidate, payload.entries, now) {
        Ok(outcome) => {
            let body = json!({
                "confirmed": outcome.confirmed,
                "confidence": outcome.confidence,
                "coordination": outcome.coordination.view(now),
            });
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn confirm_handler<S, N>(
    State(service): State<Arc<CoordinationService<S, N>>>,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<ConfirmRequest>,
) -> Response
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    let now = Utc::now();
    let key = ApplicationId(application_id);
    let actor = PartyId(payload.employer_id);

    match service.confirm(&key, &actor, payload.slot_index, now) {
        Ok(coordination) => {
            (StatusCode::OK, axum::Json(coordination.view(now))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_handler<S, N>(
    State(service): State<Arc<CoordinationService<S, N>>>,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<CancelRequest>,
) -> Response
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    let now = Utc::now();
    let key = ApplicationId(application_id);
    let actor = PartyId(payload.party_id);

    match service.cancel(&key, &actor, payload.reason, now) {
        Ok(coordination) => {
            (StatusCode::OK, axum::Json(coordination.view(now))).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn view_handler<S, N>(
    State(service): State<Arc<CoordinationService<S, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: CoordinationStore + 'static,
    N: NotificationPublisher + 'static,
{
    let now = Utc::now();
    let key = ApplicationId(application_id);

    match service.get(&key) {
        Ok(coordination) => {
            (StatusCode::OK, axum::Json(coordination.view(now))).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Kind-to-status mapping; the coordinator's contract is the kind, the
/// transport representation lives here.
fn error_response(err: CoordinationError) -> Response {
    let status = match &err {
        CoordinationError::NotFound => StatusCode::NOT_FOUND,
        CoordinationError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoordinationError::Forbidden => StatusCode::FORBIDDEN,
        CoordinationError::InvalidState { .. }
        | CoordinationError::DeadlineExpired
        | CoordinationError::TooLate { .. }
        | CoordinationError::Conflict => StatusCode::CONFLICT,
        CoordinationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = axum::Json(json!({ "error": err.to_string() }));
    (status, body).into_response()
}
