use crate::session::{SessionObserver, TurnState};
use crate::types::{ChatMessage, ChatRole, ScenarioMenu, StatsSnapshot};
use crossterm::style::Stylize;
use std::io::Write;
use std::sync::Mutex;

/// Renders the conversation to stdout.
///
/// While an assistant turn streams, the derived display text usually
/// grows, so each update just prints the new suffix of the current
/// message. A message can also be replaced outright, e.g. by the
/// apology after a mid-stream failure; that reprints on a fresh line.
pub struct TerminalUi {
    printed: Mutex<PrintedState>,
}

struct PrintedState {
    /// Transcript index of the message currently being printed
    index: Option<usize>,
    /// Text of that message as rendered so far
    text: String,
}

enum RenderStep<'a> {
    Unchanged,
    Append(&'a str),
    Restart,
}

fn render_step<'a>(previous: &str, current: &'a str) -> RenderStep<'a> {
    if current == previous {
        RenderStep::Unchanged
    } else if let Some(suffix) = current.strip_prefix(previous) {
        RenderStep::Append(suffix)
    } else {
        RenderStep::Restart
    }
}

impl TerminalUi {
    pub fn new() -> Self {
        Self {
            printed: Mutex::new(PrintedState {
                index: None,
                text: String::new(),
            }),
        }
    }

    fn role_header(role: ChatRole) -> String {
        match role {
            ChatRole::User => format!("{}", "Du".bold().dark_green()),
            ChatRole::Assistant => format!("{}", "STATUR".bold().dark_cyan()),
        }
    }

    /// Print one message in full, e.g. the welcome text
    pub fn print_message(&self, index: usize, message: &ChatMessage) {
        let mut printed = match self.printed.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        println!(
            "\n{}: {}",
            Self::role_header(message.role),
            message.display_text
        );
        printed.index = Some(index);
        printed.text = message.display_text.clone();
    }

    pub fn print_scenario_menu(&self, menu: &ScenarioMenu) {
        let available = menu.available();
        if available.is_empty() {
            return;
        }
        println!("\n{}", "Wähle deinen Pfad:".bold());
        for (i, key) in available.iter().enumerate() {
            println!("  [{}] {}", i + 1, key.label());
        }
        println!("(Nummer eingeben, um zu wählen)");
    }

    pub fn print_stats(&self, stats: &StatsSnapshot) {
        let line = format!(
            "Kcal: {} | Protein: {}g | KH: {}g | Fett: {}g",
            stats.calories, stats.protein, stats.carbs, stats.fat
        );
        println!("\n{} {}", "Verbleibend —".bold(), line.dark_yellow());
    }
}

impl Default for TerminalUi {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for TerminalUi {
    fn on_message_updated(&self, index: usize, message: &ChatMessage) {
        let mut printed = match self.printed.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };

        if printed.index != Some(index) {
            print!("\n{}: ", Self::role_header(message.role));
            printed.index = Some(index);
            printed.text.clear();
        }

        match render_step(&printed.text, &message.display_text) {
            RenderStep::Unchanged => {}
            RenderStep::Append(suffix) => {
                print!("{suffix}");
                printed.text.push_str(suffix);
            }
            RenderStep::Restart => {
                println!();
                print!(
                    "{}: {}",
                    Self::role_header(message.role),
                    message.display_text
                );
                printed.text = message.display_text.clone();
            }
        }
        let _ = std::io::stdout().flush();

        if message.role == ChatRole::User {
            println!();
        }
    }

    fn on_stats_updated(&self, stats: &StatsSnapshot) {
        // Stats are printed after the turn closes, via print_stats; a
        // live line would interleave with the streaming reply.
        let _ = stats;
    }

    fn on_turn_state(&self, state: TurnState) {
        if matches!(state, TurnState::Completed | TurnState::Failed) {
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt;

    #[test]
    fn growing_text_prints_only_the_new_suffix() {
        assert!(matches!(
            render_step("Hallo", "Hallo Welt"),
            RenderStep::Append(" Welt")
        ));
        assert!(matches!(render_step("", "Hallo"), RenderStep::Append("Hallo")));
    }

    #[test]
    fn unchanged_text_prints_nothing() {
        assert!(matches!(
            render_step("Hallo Welt", "Hallo Welt"),
            RenderStep::Unchanged
        ));
    }

    #[test]
    fn replaced_text_is_reprinted_in_full() {
        // A partially streamed reply followed by the apology is a
        // replacement, not an extension; appending a suffix would
        // garble the output.
        assert!(matches!(
            render_step("Teilantwort bereits gesendet.", prompt::APOLOGY_MESSAGE),
            RenderStep::Restart
        ));
        assert!(matches!(
            render_step("lange Teilantwort, länger als der Ersatztext", "kurz"),
            RenderStep::Restart
        ));
    }
}
