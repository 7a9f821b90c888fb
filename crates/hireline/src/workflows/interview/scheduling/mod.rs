//! Interview scheduling coordination.
//!
//! Negotiates a confirmed interview time between an employer and a candidate:
//! the employer proposes scored time slots, the candidate casts a ranked
//! slate, and the confirmation policy either auto-confirms the winning slot
//! or waits for an explicit employer confirmation. Confirmed interviews can
//! be cancelled by either party while the minimum lead time still holds.
//!
//! Persistence, notifications, and calendar sync are external collaborators
//! behind the traits in [`repository`].

pub mod domain;
pub(crate) mod policy;
pub mod repository;
pub mod router;
pub mod score;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, Availability, CalendarEventRef, CancellationRecord, ConfirmedBy, ConfirmedSlot,
    Coordination, CoordinationId, CoordinationStatus, JobId, NotificationLedger, PartyId,
    PartyRole, Slot, SlotModality, SlotProposal, Vote, VoteEntry,
};
pub use policy::{
    ConfidenceEntry, ConfidenceReport, ConfirmationPolicy, SchedulingConfig, SlotRecommendation,
};
pub use repository::{
    CalendarClient, CalendarError, CalendarEventRequest, CancellationView, CoordinationStore,
    CoordinationView, ConfirmedSlotView, Notification, NotificationError, NotificationKind,
    NotificationPublisher, StoreError,
};
pub use router::scheduling_router;
pub use score::score_slot;
pub use service::{CoordinationError, CoordinationService, ProposeRequest, VoteOutcome};
