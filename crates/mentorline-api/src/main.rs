//! Mentorline CLI and REST API entry point.
//!
//! Binary name: `mentorline`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod auth;
mod background;
mod cli;
mod http;
mod state;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands, MentorCommand, PaymentCommand, TokenCommand, WalletCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,mentorline=debug",
        _ => "trace",
    };
    // The server logs at info by default; one-shot commands stay quiet.
    let filter = match (&cli.command, cli.verbose, cli.quiet) {
        (Commands::Serve { .. }, 0, false) => "info",
        _ => filter,
    };
    mentorline_observe::init_tracing(filter, cli.log_format, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init().await?;

    let result = run(cli, state).await;
    mentorline_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Wallet { action } => match action {
            WalletCommand::Balance { user_id } => {
                cli::wallet::balance(&state, &user_id, cli.json).await?;
            }
            WalletCommand::History {
                user_id,
                page,
                limit,
            } => {
                cli::wallet::history(&state, &user_id, page, limit, cli.json).await?;
            }
            WalletCommand::Credit {
                user_id,
                amount,
                description,
            } => {
                cli::wallet::credit(&state, &user_id, amount, &description, cli.json).await?;
            }
        },

        Commands::Payments { action } => match action {
            PaymentCommand::Stale => {
                cli::payment::stale(&state, cli.json).await?;
            }
        },

        Commands::Mentor { action } => match action {
            MentorCommand::SetStatus { user_id, status } => {
                cli::mentor::set_status(&state, &user_id, status, cli.json).await?;
            }
            MentorCommand::SetRate { user_id, rate } => {
                cli::mentor::set_rate(&state, &user_id, rate, cli.json).await?;
            }
            MentorCommand::Show { user_id } => {
                cli::mentor::show(&state, &user_id, cli.json).await?;
            }
        },

        Commands::Token { action } => match action {
            TokenCommand::Issue {
                user_id,
                role,
                expiry_mins,
            } => {
                cli::token::issue(&state, user_id, role, expiry_mins, cli.json)?;
            }
        },

        Commands::Serve { port, host } => {
            serve(state, &host, port, cli.quiet).await?;
        }
    }

    Ok(())
}

async fn serve(state: AppState, host: &str, port: u16, quiet: bool) -> anyhow::Result<()> {
    if state.jwt.is_none() {
        anyhow::bail!("MENTORLINE_JWT_SECRET must be set to serve the API");
    }
    if state.payment_secret.is_none() {
        anyhow::bail!("MENTORLINE_PAYMENT_SECRET must be set to serve the API");
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if !quiet {
        println!(
            "  {} Mentorline API listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!(
            "  {}",
            console::style("Press Ctrl+C to stop").dim()
        );
    }
    tracing::info!(
        %addr,
        bill_while_offline = state.config.bill_while_offline,
        data_dir = %state.data_dir.display(),
        "Server starting"
    );

    let cancel = CancellationToken::new();
    let scanner = tokio::spawn(background::run_stale_scan(
        state.reconciler.clone(),
        state.config.clone(),
        cancel.clone(),
    ));

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Err(e) = scanner.await {
        tracing::warn!(error = %e, "Stale payment scan task ended abnormally");
    }

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
