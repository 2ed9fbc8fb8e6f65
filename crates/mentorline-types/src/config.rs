//! Engine configuration types for Mentorline.
//!
//! `EngineConfig` represents the top-level `config.toml` that controls
//! billing policy, block sizes, and payment reconciliation timing.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the metered conversation engine.
///
/// Loaded from `~/.mentorline/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether student messages are charged while the mentor is offline.
    ///
    /// Defaults to `true`: offline messages are delivered as asynchronous
    /// notes and billed like any other message.
    #[serde(default = "default_bill_while_offline")]
    pub bill_while_offline: bool,

    /// Bytes of text content per billing block.
    #[serde(default = "default_text_block_bytes")]
    pub text_block_bytes: u64,

    /// Bytes of attachment size per billing block.
    #[serde(default = "default_file_block_bytes")]
    pub file_block_bytes: u64,

    /// Attachments above this size are rejected before any charge.
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,

    /// Pending credits older than this are reported for operator review.
    #[serde(default = "default_pending_credit_timeout_secs")]
    pub pending_credit_timeout_secs: u64,

    /// Interval between stale pending-credit scans.
    #[serde(default = "default_stale_scan_interval_secs")]
    pub stale_scan_interval_secs: u64,

    /// Default page size when listing a session's messages.
    #[serde(default = "default_message_page_size")]
    pub message_page_size: u32,
}

fn default_bill_while_offline() -> bool {
    true
}

fn default_text_block_bytes() -> u64 {
    160
}

fn default_file_block_bytes() -> u64 {
    1024 * 1024
}

fn default_max_attachment_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_pending_credit_timeout_secs() -> u64 {
    30 * 60
}

fn default_stale_scan_interval_secs() -> u64 {
    5 * 60
}

fn default_message_page_size() -> u32 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bill_while_offline: default_bill_while_offline(),
            text_block_bytes: default_text_block_bytes(),
            file_block_bytes: default_file_block_bytes(),
            max_attachment_bytes: default_max_attachment_bytes(),
            pending_credit_timeout_secs: default_pending_credit_timeout_secs(),
            stale_scan_interval_secs: default_stale_scan_interval_secs(),
            message_page_size: default_message_page_size(),
        }
    }
}
