//! Terminal stand-in for the UI's router.
//!
//! A command-line client has no views to switch, so navigation requests are
//! announced on stderr instead.

use console::style;

use tether_core::view::Navigator;
use tether_types::view::{NavTarget, Surface};

pub struct TerminalNavigator {
    announce: bool,
}

impl TerminalNavigator {
    pub fn new(announce: bool) -> Self {
        Self { announce }
    }
}

/// One-line description of a navigation target.
pub fn describe(target: &NavTarget) -> String {
    match target {
        NavTarget::Landing => "signed out".to_string(),
        NavTarget::Conversation { conversation_id } => format!("conversation {conversation_id}"),
    }
}

impl Navigator for TerminalNavigator {
    fn current_surface(&self) -> Surface {
        Surface::Standard
    }

    fn navigate(&self, target: NavTarget) {
        tracing::debug!(?target, "navigate");
        if self.announce {
            eprintln!("  {} {}", style("→").dim(), describe(&target));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_targets() {
        assert_eq!(describe(&NavTarget::Landing), "signed out");
        assert_eq!(
            describe(&NavTarget::Conversation {
                conversation_id: "c-42".into()
            }),
            "conversation c-42"
        );
    }

    #[test]
    fn terminal_is_a_standard_surface() {
        assert_eq!(TerminalNavigator::new(false).current_surface(), Surface::Standard);
    }
}
