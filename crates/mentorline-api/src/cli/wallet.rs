//! Wallet CLI commands: balance, history, credit.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use mentorline_types::wallet::{TransactionKind, TransactionStatus};

use crate::state::AppState;

/// Print a user's balance.
pub async fn balance(state: &AppState, user_id: &Uuid, json: bool) -> Result<()> {
    let balance = state.ledger.balance(user_id).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"user_id": user_id, "balance": balance})
        );
    } else {
        println!();
        println!(
            "  {} {}  {}",
            style("Balance").bold(),
            style(user_id).dim(),
            style(balance).cyan().bold()
        );
        println!();
    }
    Ok(())
}

/// Print one page of a user's transactions.
pub async fn history(
    state: &AppState,
    user_id: &Uuid,
    page: u32,
    limit: u32,
    json: bool,
) -> Result<()> {
    let page = state.ledger.history(user_id, page, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.transactions.is_empty() {
        println!();
        println!(
            "  {} No transactions on page {}.",
            style("i").blue().bold(),
            page.page
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("When").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Amount").fg(Color::White),
        Cell::new("Balance").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Description").fg(Color::White),
    ]);

    for tx in &page.transactions {
        let (sign, color) = match tx.kind {
            TransactionKind::Credit => ("+", Color::Green),
            TransactionKind::Debit => ("-", Color::Red),
        };
        let status_color = match tx.status {
            TransactionStatus::Completed => Color::Green,
            TransactionStatus::Pending => Color::Yellow,
            TransactionStatus::Failed => Color::Red,
        };
        table.add_row(vec![
            Cell::new(tx.created_at.format("%Y-%m-%d %H:%M:%S").to_string()).fg(Color::DarkGrey),
            Cell::new(tx.kind.to_string()),
            Cell::new(format!("{sign}{}", tx.amount)).fg(color),
            Cell::new(
                tx.resulting_balance
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(tx.status.to_string()).fg(status_color),
            Cell::new(&tx.description),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  page {} ({} shown, limit {})",
        style(page.page).bold(),
        page.transactions.len(),
        page.limit
    );
    println!();
    Ok(())
}

/// Credit a wallet without a gateway order.
pub async fn credit(
    state: &AppState,
    user_id: &Uuid,
    amount: i64,
    description: &str,
    json: bool,
) -> Result<()> {
    let outcome = state
        .ledger
        .credit(user_id, amount, description, None, None)
        .await?;
    let tx = outcome.into_transaction();

    if json {
        println!("{}", serde_json::to_string_pretty(&tx)?);
    } else {
        println!(
            "  {} Credited {} to {} (balance {})",
            style("✓").green().bold(),
            style(amount).bold(),
            style(user_id).dim(),
            style(tx.resulting_balance.unwrap_or_default()).cyan()
        );
    }
    Ok(())
}
