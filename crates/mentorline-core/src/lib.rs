//! Business logic and repository trait definitions for Mentorline.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, and the services built on them: the wallet ledger,
//! payment reconciliation, session lifecycle, metering, realtime fan-out and
//! presence. It depends only on `mentorline-types` -- never on
//! `mentorline-infra` or any database/IO crate.

pub mod ledger;
pub mod metering;
pub mod payment;
pub mod realtime;
pub mod repository;
pub mod session;

pub use ledger::Ledger;
pub use metering::{BillingPolicy, MeteringEngine};
pub use payment::PaymentReconciler;
pub use realtime::{FanOut, PresenceTracker};
pub use session::SessionManager;
