//! Mentor directory CLI commands: set-status, set-rate, show.

use anyhow::Result;
use console::style;
use uuid::Uuid;

use mentorline_core::repository::MentorDirectory;
use mentorline_types::identity::MentorStatus;

use crate::state::AppState;

/// Record a mentor's approval status.
pub async fn set_status(
    state: &AppState,
    user_id: &Uuid,
    status: MentorStatus,
    json: bool,
) -> Result<()> {
    state
        .sessions
        .directory()
        .set_mentor_status(user_id, status)
        .await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"user_id": user_id, "status": status})
        );
    } else {
        println!(
            "  {} Mentor {} is now {}",
            style("✓").green().bold(),
            style(user_id).dim(),
            style(status).bold()
        );
    }
    Ok(())
}

/// Set the rate new sessions with this mentor are billed at.
pub async fn set_rate(state: &AppState, user_id: &Uuid, rate: i64, json: bool) -> Result<()> {
    if rate <= 0 {
        anyhow::bail!("rate must be positive, got {rate}");
    }
    if !state
        .sessions
        .directory()
        .set_mentor_rate(user_id, rate)
        .await?
    {
        anyhow::bail!("mentor {user_id} is not registered; set a status first");
    }

    if json {
        println!(
            "{}",
            serde_json::json!({"user_id": user_id, "rate_per_unit": rate})
        );
    } else {
        println!(
            "  {} Mentor {} now charges {} per block",
            style("✓").green().bold(),
            style(user_id).dim(),
            style(rate).bold()
        );
    }
    Ok(())
}

/// Show approval status, rate, rating and presence.
pub async fn show(state: &AppState, user_id: &Uuid, json: bool) -> Result<()> {
    let directory = state.sessions.directory();
    let status = directory.mentor_status(user_id).await?;
    let rate = directory.mentor_rate(user_id).await?;
    let rating = state.sessions.mentor_rating(user_id).await?;
    let presence = state.presence.get(user_id).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "user_id": user_id,
                "status": status,
                "rate_per_unit": rate,
                "rating": rating,
                "presence": presence,
            }))?
        );
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Mentor").bold(), style(user_id).cyan());
    match status {
        Some(status) => println!("  Status:    {status}"),
        None => println!("  Status:    {}", style("not registered").dim()),
    }
    if let Some(rate) = rate {
        println!("  Rate:      {rate} per block");
    }
    match rating.average {
        Some(average) => println!("  Rating:    {average:.1} ({} reviews)", rating.count),
        None => println!("  Rating:    {}", style("no reviews").dim()),
    }
    let online = if presence.is_online {
        style("online").green().to_string()
    } else {
        style("offline").dim().to_string()
    };
    println!("  Presence:  {online}");
    if let Some(seen) = presence.last_seen_at {
        println!("  Last seen: {}", seen.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();
    Ok(())
}
