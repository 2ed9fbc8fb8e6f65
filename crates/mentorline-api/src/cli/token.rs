//! Token CLI command: issue a development bearer token.

use anyhow::{Context, Result};
use console::style;
use uuid::Uuid;

use mentorline_types::identity::Role;

use crate::auth::issue_token;
use crate::state::AppState;

/// Mint a token for `user_id` with the shared JWT secret.
pub fn issue(
    state: &AppState,
    user_id: Uuid,
    role: Role,
    expiry_mins: i64,
    json: bool,
) -> Result<()> {
    let mut config = state
        .jwt
        .clone()
        .context("MENTORLINE_JWT_SECRET must be set to issue tokens")?;
    config.token_expiry_mins = expiry_mins;

    let token = issue_token(user_id, role, &config)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "user_id": user_id,
                "role": role,
                "expires_in_mins": expiry_mins,
                "token": token,
            })
        );
    } else {
        println!();
        println!(
            "  {} {} token for {} ({} min):",
            style("🔑").bold(),
            role,
            style(user_id).dim(),
            expiry_mins
        );
        println!();
        println!("  {}", style(&token).yellow());
        println!();
    }
    Ok(())
}
