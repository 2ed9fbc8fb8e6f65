//! Infrastructure layer for Mentorline.
//!
//! Contains implementations of the repository traits defined in
//! `mentorline-core`: SQLite storage for wallets, transactions, sessions,
//! messages, presence and the mentor directory, plus config file loading.

pub mod config;
pub mod sqlite;
