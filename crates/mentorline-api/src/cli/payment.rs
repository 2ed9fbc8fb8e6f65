//! Payment CLI commands: stale pending-credit report.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// List pending credits older than `pending_credit_timeout_secs`.
pub async fn stale(state: &AppState, json: bool) -> Result<()> {
    let max_age = Duration::from_secs(state.config.pending_credit_timeout_secs);
    let stale = state.reconciler.stale_pending(max_age).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stale)?);
        return Ok(());
    }

    if stale.is_empty() {
        println!();
        println!(
            "  {} No pending credits older than {} minutes.",
            style("✓").green().bold(),
            max_age.as_secs() / 60
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Order").fg(Color::White),
        Cell::new("User").fg(Color::White),
        Cell::new("Amount").fg(Color::White),
        Cell::new("Age").fg(Color::White),
    ]);

    let now = Utc::now();
    for tx in &stale {
        let age = now - tx.created_at;
        table.add_row(vec![
            Cell::new(tx.external_ref.as_deref().unwrap_or("-")).fg(Color::Cyan),
            Cell::new(tx.user_id.to_string()),
            Cell::new(tx.amount.to_string()),
            Cell::new(format!("{}m", age.num_minutes())).fg(Color::Yellow),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} stale pending credit{}",
        style(stale.len()).bold(),
        if stale.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}
