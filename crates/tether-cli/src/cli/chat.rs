//! One-shot streamed chat turn.
//!
//! Text deltas are printed as they arrive. A spinner covers the gap between
//! sending and the first event. The session timers run for the duration of
//! the turn so a long stream cannot outlive its credential unnoticed.

use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tether_core::chat::{NoopObserver, TurnObserver, TurnReport};
use tether_types::agent::AgentEvent;
use tether_types::chat::{ConversationId, Reconciliation, TurnState};

use crate::state::AppState;

/// Renders a turn progressively to the terminal.
struct TerminalObserver {
    spinner: Option<ProgressBar>,
    show_reasoning: bool,
    printed_text: bool,
    usage: Option<(u32, u32)>,
}

impl TerminalObserver {
    fn new(show_reasoning: bool) -> Self {
        Self {
            spinner: None,
            show_reasoning,
            printed_text: false,
            usage: None,
        }
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl TurnObserver for TerminalObserver {
    fn on_state(&mut self, _turn_id: Uuid, state: TurnState) {
        if state.is_terminal() {
            self.stop_spinner();
            if self.printed_text {
                println!();
            }
        }
    }

    fn on_waiting(&mut self, waiting: bool) {
        if !waiting {
            self.stop_spinner();
            return;
        }
        let spinner = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(spinner_style);
        spinner.set_message("thinking...");
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    fn on_event(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::TextDelta { text } => {
                if !self.printed_text {
                    print!("\n  {} ", style("agent").cyan().bold());
                    self.printed_text = true;
                }
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
            AgentEvent::ReasoningDelta { text } if self.show_reasoning => {
                eprint!("{}", style(text).dim().italic());
            }
            AgentEvent::ToolActivity { name, detail } => {
                let detail = detail.as_deref().unwrap_or_default();
                eprintln!("  {} {} {}", style("⚙").yellow(), name, style(detail).dim());
            }
            AgentEvent::Usage {
                input_tokens,
                output_tokens,
            } => {
                self.usage = Some((*input_tokens, *output_tokens));
            }
            _ => {}
        }
    }
}

/// Send `message` and stream the reply. Ctrl+C discards the turn.
pub async fn chat(
    state: &AppState,
    message: String,
    conversation: Option<String>,
    json: bool,
    verbose: u8,
) -> Result<()> {
    if message.trim().is_empty() {
        bail!("message must not be empty");
    }
    if !state.session.is_authenticated() {
        bail!("not signed in; run `tether login` first");
    }

    let timers_cancel = CancellationToken::new();
    let timers = state.session.spawn_background(timers_cancel.clone());

    let controller = state.chat.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            controller.discard_active().await;
        }
    });

    let mut terminal = TerminalObserver::new(verbose > 0);
    let mut silent = NoopObserver;
    let observer: &mut dyn TurnObserver = if json { &mut silent } else { &mut terminal };

    let report = state
        .chat
        .submit(message, conversation.map(ConversationId::from), observer)
        .await;

    interrupt.abort();
    timers_cancel.cancel();
    if let Err(e) = timers.await {
        tracing::warn!(error = %e, "session timer task failed");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
        return finish(&report);
    }

    match report.state {
        TurnState::Completed => {
            println!();
            if let Some(id) = &report.conversation_id {
                println!("  {}", style(format!("conversation {id}")).dim());
            }
            if let Some((input, output)) = terminal.usage {
                println!("  {}", style(format!("{input} in / {output} out tokens")).dim());
            }
            println!();
        }
        TurnState::Discarded => {
            eprintln!("\n  {} Turn discarded", style("i").blue().bold());
        }
        _ => {}
    }
    finish(&report)
}

/// Map a failed turn to the command's error.
fn finish(report: &TurnReport) -> Result<()> {
    match &report.error {
        Some(error) if error.is_auth() => {
            bail!("{error}; sign in again with `tether login`")
        }
        Some(error) => bail!("{error}"),
        None => Ok(()),
    }
}

fn report_json(report: &TurnReport) -> serde_json::Value {
    serde_json::json!({
        "turn_id": report.turn_id.to_string(),
        "state": report.state,
        "conversation_id": report.conversation_id,
        "text": report.transcript.text,
        "events": report.transcript.events.len(),
        "created_conversation": matches!(report.reconciliation, Some(Reconciliation::NavigateToNew(_))),
        "reconciliation": report.reconciliation,
        "error": report.error.as_ref().map(|e| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_records_usage() {
        let mut observer = TerminalObserver::new(false);
        observer.on_event(&AgentEvent::Usage {
            input_tokens: 12,
            output_tokens: 34,
        });
        assert_eq!(observer.usage, Some((12, 34)));
    }

    #[test]
    fn observer_spinner_follows_waiting_flag() {
        let mut observer = TerminalObserver::new(false);
        observer.on_waiting(true);
        assert!(observer.spinner.is_some());
        observer.on_waiting(false);
        assert!(observer.spinner.is_none());
    }

    #[test]
    fn terminal_state_clears_spinner() {
        let mut observer = TerminalObserver::new(false);
        observer.on_waiting(true);
        observer.on_state(Uuid::now_v7(), TurnState::Errored);
        assert!(observer.spinner.is_none());
    }
}
