//! Session commands: login, logout, status, refresh, watch.

use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use tether_types::credential::AccessToken;
use tether_types::event::SessionEvent;
use tether_types::identity::{UserProfile, UserRole};
use tether_types::session::Session;

use crate::state::AppState;

/// Install a credential issued elsewhere and persist it.
pub async fn login(
    state: &AppState,
    token: String,
    user_id: String,
    email: String,
    name: Option<String>,
    admin: bool,
    json: bool,
) -> Result<()> {
    let token = AccessToken::new(token);
    if token.is_empty() {
        bail!("token must not be empty");
    }

    let mut profile = UserProfile::new(user_id, email);
    if let Some(name) = name {
        profile = profile.with_display_name(name);
    }
    if admin {
        profile = profile.with_role(UserRole::Admin);
    }

    state.session.login(token, profile).await;
    let session = state.session.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&session_json(&session))?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Signed in as {}",
        style("✓").green().bold(),
        style(display_name(&session)).cyan()
    );
    if let Some(credential) = &session.credential {
        println!(
            "  {}",
            style(format!(
                "Credential valid for {}",
                format_remaining(credential.remaining(Utc::now()))
            ))
            .dim()
        );
    }
    println!();
    Ok(())
}

/// Sign out. Always succeeds locally, even when revocation fails.
pub async fn logout(state: &AppState, json: bool) -> Result<()> {
    let was_signed_in = state.session.is_authenticated();
    state.session.logout().await;

    if json {
        let out = serde_json::json!({ "logged_out": true, "was_signed_in": was_signed_in });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    if was_signed_in {
        println!("  {} Signed out", style("✓").green().bold());
    } else {
        println!(
            "  {} No session was active; stored credentials cleared",
            style("i").blue().bold()
        );
    }
    println!();
    Ok(())
}

/// Show the current session and credential lifetime.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let session = state.session.snapshot();

    if json {
        let mut out = session_json(&session);
        out["storage"] = serde_json::json!(state.config.storage.to_string());
        out["data_dir"] = serde_json::json!(state.data_dir.display().to_string());
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("── Session ──").dim());
    match (&session.profile, &session.credential) {
        (Some(profile), Some(credential)) => {
            let now = Utc::now();
            let buffer = state.session.settings().renewal_buffer();
            println!("  User:      {}", style(display_name(&session)).cyan());
            println!("  Id:        {}", profile.id);
            println!("  Role:      {}", profile.role);
            println!("  Expires:   {}", credential.expires_at.to_rfc3339());
            let remaining = format_remaining(credential.remaining(now));
            if credential.within_buffer(now, buffer) {
                println!("  Remaining: {} {}", style(remaining).yellow(), style("(renewal due)").dim());
            } else {
                println!("  Remaining: {}", style(remaining).green());
            }
        }
        _ => {
            println!("  {}", style("Not signed in").yellow());
        }
    }

    println!();
    println!("  {}", style("── Client ──").dim());
    println!("  Identity:  {}", state.config.identity_url);
    println!("  Agent:     {}", state.config.agent_url);
    println!("  Storage:   {}", state.config.storage);
    println!("  Data dir:  {}", state.data_dir.display());
    println!();
    Ok(())
}

/// Renew the credential now.
pub async fn refresh(state: &AppState, json: bool) -> Result<()> {
    if !state.session.is_authenticated() {
        bail!("not signed in; run `tether login` first");
    }

    if !state.session.refresh_token().await {
        bail!("credential renewal failed; the session has been signed out");
    }

    let session = state.session.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&session_json(&session))?);
        return Ok(());
    }

    println!();
    println!("  {} Credential renewed", style("✓").green().bold());
    if let Some(credential) = &session.credential {
        println!(
            "  {}",
            style(format!("Expires {}", credential.expires_at.to_rfc3339())).dim()
        );
    }
    println!();
    Ok(())
}

/// Keep the session alive until Ctrl+C, printing every session event.
pub async fn watch(state: &AppState, json: bool) -> Result<()> {
    if !state.session.is_authenticated() {
        bail!("not signed in; run `tether login` first");
    }

    let mut events = state.events.subscribe();
    let cancel = CancellationToken::new();
    let timers = state.session.spawn_background(cancel.clone());

    if !json {
        println!();
        println!(
            "  {} Keeping {} signed in. Press Ctrl+C to stop.",
            style("●").green(),
            style(display_name(&state.session.snapshot())).cyan()
        );
        println!();
    }

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(anyhow::Error::from),
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event, json)?;
                    if matches!(event, SessionEvent::LoggedOut { .. }) {
                        break Ok(());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "session event subscriber lagged");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    cancel.cancel();
    if let Err(e) = timers.await {
        tracing::warn!(error = %e, "session timer task failed");
    }
    result
}

fn print_event(event: &SessionEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    let stamp = style(Utc::now().format("%H:%M:%S").to_string()).dim();
    match event {
        SessionEvent::LoggedIn { user_id } => {
            println!("  {stamp} signed in as {user_id}");
        }
        SessionEvent::CredentialRenewed { expires_at } => {
            println!(
                "  {stamp} {} credential renewed, expires {}",
                style("✓").green(),
                expires_at.to_rfc3339()
            );
        }
        SessionEvent::ExpiringSoon { expires_at } => {
            println!(
                "  {stamp} {} credential expires {}",
                style("!").yellow(),
                expires_at.to_rfc3339()
            );
        }
        SessionEvent::LoggedOut { reason } => {
            println!("  {stamp} {} signed out ({reason})", style("✗").red());
        }
        SessionEvent::TurnFinished { conversation_id } => match conversation_id {
            Some(id) => println!("  {stamp} turn finished in {id}"),
            None => println!("  {stamp} turn finished"),
        },
    }
    Ok(())
}

fn display_name(session: &Session) -> String {
    match &session.profile {
        Some(profile) => match &profile.display_name {
            Some(name) => format!("{name} <{}>", profile.email),
            None => profile.email.clone(),
        },
        None => "anonymous".to_string(),
    }
}

fn session_json(session: &Session) -> serde_json::Value {
    let now = Utc::now();
    serde_json::json!({
        "authenticated": session.is_authenticated(),
        "profile": session.profile,
        "expires_at": session.credential.as_ref().map(|c| c.expires_at),
        "remaining_secs": session
            .credential
            .as_ref()
            .map(|c| c.remaining(now).num_seconds()),
    })
}

/// Compact "1d 2h", "2h 5m", "42s" rendering of a lifetime.
fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds();
    if secs <= 0 {
        return "expired".to_string();
    }
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {}s", secs % 60)
    } else {
        format!("{secs}s")
    }
}
