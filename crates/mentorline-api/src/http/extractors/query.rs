//! Query parameter extractors for list endpoints.

use serde::Deserialize;

/// Offset pagination for session and message listings.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    /// Maximum results. Falls back to the configured page size.
    pub limit: Option<u32>,
    /// Offset for pagination.
    #[serde(default)]
    pub offset: u32,
}

/// Page-numbered listing for wallet history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_history_limit() -> u32 {
    mentorline_core::ledger::DEFAULT_HISTORY_LIMIT
}
