//! Core library for the Hireline interview coordination service.
//!
//! The interesting logic lives under [`workflows::interview::scheduling`]: the
//! negotiation of a confirmed interview time between an employer and a
//! candidate through slot proposals, ranked voting, confidence-scored
//! auto-confirmation, manual confirmation, and lead-time gated cancellation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
