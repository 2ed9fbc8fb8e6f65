//! Shared domain types for Mentorline.
//!
//! This crate contains the domain types of the metered conversation engine:
//! wallets and ledger transactions, sessions, messages, presence, realtime
//! events, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod message;
pub mod presence;
pub mod session;
pub mod wallet;
