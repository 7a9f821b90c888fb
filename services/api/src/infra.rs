use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

use hireline::workflows::interview::scheduling::{
    ApplicationId, Coordination, CoordinationStatus, CoordinationStore, Notification,
    NotificationError, NotificationPublisher, PartyId, SchedulingConfig, StoreError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Keyed by application id; the version check backs the service's
/// optimistic retry loop.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCoordinationStore {
    records: Arc<Mutex<HashMap<String, Coordination>>>,
}

impl CoordinationStore for InMemoryCoordinationStore {
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

/// Log-backed publisher; a deployment swaps this for a real transport.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationPublisher {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            recipient = %notification.recipient.0,
            kind = notification.kind.label(),
            "notification dispatched"
        );
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

pub(crate) fn default_scheduling_config() -> SchedulingConfig {
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
