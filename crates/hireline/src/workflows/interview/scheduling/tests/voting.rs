use super::common::*;
use crate::workflows::interview::scheduling::domain::{Availability, CoordinationStatus};
use crate::workflows::interview::scheduling::repository::CoordinationStore;
use crate::workflows::interview::scheduling::CoordinationError;

use chrono::Duration;

#[test]
fn cast_votes_requires_an_existing_coordination() {
    let (service, _, _) = build_service(scheduling_config());

    match service.cast_votes(
        &app_key(),
        &candidate(),
        vec![entry(0, 1, Availability::Available)],
        base_time(),
    ) {
        Err(CoordinationError::NotFound) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn cast_votes_rejects_confirmed_coordination() {
    let (service, _, _) = build_service(strict_config());
    let now = base_time();
    service
        .propose_slots(propose_request(vec![prime_slot()]), now)
        .expect("seed");
    service
        .confirm(&app_key(), &employer(), 0, now)
        .expect("confirm");

    match service.cast_votes(
        &app_key(),
        &candidate(),
        vec![entry(0, 1, Availability::Available)],
        now,
    ) {
        Err(CoordinationError::InvalidState { status, .. }) => {
            assert_eq!(status, CoordinationStatus::Confirmed);
        }
        other => panic!("expected invalid state, got {other:?}"),
    }
}

#[test]
fn cast_votes_honors_the_deadline_boundary() {
    let (service, _, _) = build_service(strict_config());
    let now = base_time();
    service
        .propose_slots(propose_request(vec![prime_slot()]), now)
        .expect("seed");

    let at_deadline = default_deadline();
    service
        .cast_votes(
            &app_key(),
            &candidate(),
            vec![entry(0, 1, Availability::Available)],
            at_deadline,
        )
        .expect("vote exactly at the deadline is accepted");

    match service.cast_votes(
        &app_key(),
        &candidate(),
        vec![entry(0, 1, Availability::Available)],
        at_deadline + Duration::seconds(1),
    ) {
        Err(CoordinationError::DeadlineExpired) => {}
        other => panic!("expected deadline expired, got {other:?}"),
    }
}

#[test]
fn cast_votes_is_forbidden_for_non_candidates() {
    let (service, _, _) = build_service(strict_config());
    let now = base_time();
    service
        .propose_slots(propose_request(vec![prime_slot()]), now)
        .expect("seed");

    for actor in [employer(), stranger()] {
        match service.cast_votes(
            &app_key(),
            &actor,
            vec![entry(0, 1, Availability::Available)],
            now,
        ) {
            Err(CoordinationError::Forbidden) => {}
            other => panic!("expected forbidden for {actor:?}, got {other:?}"),
        }
    }
}

#[test]
fn cast_votes_validates_slate_shape() {
    let (service, _, _) = build_service(strict_config());
    let now = base_time();
    service
        .propose_slots(propose_request(vec![prime_slot(), weekend_early_slot()]), now)
        .expect("seed");

    let invalid_slates = [
        Vec::new(),
        vec![entry(2, 1, Availability::Available)],
        vec![
            entry(0, 1, Availability::Available),
            entry(0, 2, Availability::Maybe),
        ],
        vec![entry(0, 0, Availability::Available)],
    ];

    for slate in invalid_slates {
        match service.cast_votes(&app_key(), &candidate(), slate.clone(), now) {
            Err(CoordinationError::InvalidInput(_)) => {}
            other => panic!("expected invalid input for {slate:?}, got {other:?}"),
        }
    }
}

#[test]
fn resubmission_replaces_the_previous_slate() {
    let (service, _, _) = build_service(strict_config());
    let now = base_time();
    service
        .propose_slots(propose_request(vec![prime_slot(), weekend_early_slot()]), now)
        .expect("seed");

    service
        .cast_votes(
            &app_key(),
            &candidate(),
            vec![
                entry(0, 1, Availability::Maybe),
                entry(1, 2, Availability::Maybe),
            ],
            now,
        )
        .expect("first slate");
    let outcome = service
        .cast_votes(
            &app_key(),
            &candidate(),
            vec![entry(1, 1, Availability::Available)],
            now + Duration::hours(1),
        )
        .expect("replacement slate");

    assert_eq!(outcome.coordination.votes.len(), 1);
    let vote = outcome
        .coordination
        .votes
        .get(&candidate())
        .expect("slate stored");
    assert_eq!(vote.entries.len(), 1);
    assert_eq!(vote.entries[0].slot_index, 1);
}

#[test]
fn appended_slot_is_votable_and_prior_votes_survive() {
    let (service, _, _) = build_service(strict_config());
    let now = base_time();
    service
        .propose_slots(propose_request(vec![prime_slot()]), now)
        .expect("seed");
    service
        .cast_votes(
            &app_key(),
            &candidate(),
            vec![entry(0, 1, Availability::Maybe)],
            now,
        )
        .expect("vote on the original slot");

    service
        .add_slot(&app_key(), &employer(), weekend_early_slot(), now)
        .expect("append");
    let outcome = service
        .cast_votes(
            &app_key(),
            &candidate(),
            vec![
                entry(0, 2, Availability::Maybe),
                entry(1, 1, Availability::Available),
            ],
            now + Duration::hours(1),
        )
        .expect("vote referencing the appended index");

    let vote = outcome
        .coordination
        .votes
        .get(&candidate())
        .expect("slate stored");
    assert!(vote.entries.iter().all(|entry| entry.slot_index < 2));
    assert_eq!(outcome.coordination.proposed_slots.len(), 2);
}

#[test]
fn vote_indices_stay_in_bounds_on_read_back() {
    let (service, store, _) = build_service(strict_config());
    let now = base_time();
    service
        .propose_slots(propose_request(vec![prime_slot(), weekend_early_slot()]), now)
        .expect("seed");
    service
        .cast_votes(
            &app_key(),
            &candidate(),
            vec![
                entry(0, 2, Availability::Available),
                entry(1, 1, Availability::Available),
            ],
            now,
        )
        .expect("vote");

    let stored = store
        .fetch(&app_key())
        .expect("fetch works")
        .expect("coordination present");
    for vote in stored.votes.values() {
        for entry in &vote.entries {
            assert!(entry.slot_index < stored.proposed_slots.len());
        }
    }
}
