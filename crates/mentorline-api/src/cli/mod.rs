//! CLI command definitions for the `mentorline` binary.
//!
//! Uses clap derive macros for argument parsing. Besides `serve`, the
//! commands are operator tools over the same database the server uses.

pub mod mentor;
pub mod payment;
pub mod token;
pub mod wallet;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use mentorline_observe::LogFormat;
use mentorline_types::identity::{MentorStatus, Role};

/// Metered mentor-student conversation engine.
#[derive(Parser)]
#[command(name = "mentorline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format (human, json).
    #[arg(long, global = true, default_value = "human", env = "MENTORLINE_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "MENTORLINE_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API and WebSocket server.
    Serve {
        /// Port to listen on.
        #[arg(long, short, default_value = "8080", env = "MENTORLINE_PORT")]
        port: u16,

        /// Address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Inspect and adjust wallets.
    Wallet {
        #[command(subcommand)]
        action: WalletCommand,
    },

    /// Payment reconciliation reports.
    Payments {
        #[command(subcommand)]
        action: PaymentCommand,
    },

    /// Mentor directory.
    Mentor {
        #[command(subcommand)]
        action: MentorCommand,
    },

    /// Bearer tokens for development and testing.
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },
}

#[derive(Subcommand)]
pub enum WalletCommand {
    /// Show a user's balance.
    Balance {
        user_id: Uuid,
    },

    /// Show a user's transactions, most recent first.
    History {
        user_id: Uuid,

        /// 1-based page number.
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Credit a wallet by hand (support adjustments, local testing).
    Credit {
        user_id: Uuid,
        amount: i64,

        #[arg(long, default_value = "Manual adjustment")]
        description: String,
    },
}

#[derive(Subcommand)]
pub enum PaymentCommand {
    /// List pending credits older than the configured timeout.
    Stale,
}

#[derive(Subcommand)]
pub enum MentorCommand {
    /// Record a mentor's approval status.
    SetStatus {
        user_id: Uuid,

        /// pending, approved, rejected, suspended
        status: MentorStatus,
    },

    /// Set the price per billing block a registered mentor charges.
    SetRate {
        user_id: Uuid,

        /// Whole currency units per block, must be positive.
        rate: i64,
    },

    /// Show a mentor's approval status, rate, rating and presence.
    Show {
        user_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Mint a token signed with MENTORLINE_JWT_SECRET.
    Issue {
        user_id: Uuid,

        /// student, mentor, admin
        #[arg(long, default_value = "student")]
        role: Role,

        /// Lifetime in minutes.
        #[arg(long, default_value = "60")]
        expiry_mins: i64,
    },
}
