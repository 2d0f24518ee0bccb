//! The conversation controller: owns the transcript, the stats display
//! state and exactly one turn in flight at a time.

#[cfg(test)]
mod tests;

use crate::prompt;
use crate::streaming::TurnAccumulator;
use crate::types::{ChatMessage, ScenarioKey, ScenarioMenu, StatsSnapshot};
use anyhow::Result;
use llm::{ChatClient, StreamingChunk};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Per-turn state. No new turn may start in Submitting or Streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Submitting,
    Streaming,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound for one complete turn. The external dependency may
    /// hang, so a turn is never allowed to block the session forever.
    pub turn_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(120),
        }
    }
}

/// Observer for everything the UI needs to render live. All methods
/// default to no-ops so tests and headless use stay cheap.
pub trait SessionObserver: Send + Sync {
    fn on_message_updated(&self, _index: usize, _message: &ChatMessage) {}
    fn on_stats_updated(&self, _stats: &StatsSnapshot) {}
    fn on_turn_state(&self, _state: TurnState) {}
}

struct NullObserver;
impl SessionObserver for NullObserver {}

pub struct CoachSession {
    client: Box<dyn ChatClient>,
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
    messages: Vec<ChatMessage>,
    stats: StatsSnapshot,
    state: TurnState,
}

impl CoachSession {
    pub fn new(client: Box<dyn ChatClient>) -> Self {
        Self::with_config(client, SessionConfig::default(), Arc::new(NullObserver))
    }

    pub fn with_config(
        client: Box<dyn ChatClient>,
        config: SessionConfig,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            client,
            config,
            observer,
            messages: vec![ChatMessage::assistant(prompt::WELCOME_MESSAGE)],
            stats: StatsSnapshot::default(),
            state: TurnState::Idle,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn stats(&self) -> &StatsSnapshot {
        &self.stats
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    fn turn_in_flight(&self) -> bool {
        matches!(self.state, TurnState::Submitting | TurnState::Streaming)
    }

    fn set_state(&mut self, state: TurnState) {
        self.state = state;
        self.observer.on_turn_state(state);
    }

    fn notify_message(&self, index: usize) {
        self.observer.on_message_updated(index, &self.messages[index]);
    }

    /// Run one user turn: append the user message plus an assistant
    /// placeholder, stream the reply and apply derived state as it
    /// arrives. Empty input or an in-flight turn is a no-op.
    pub async fn submit(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() || self.turn_in_flight() {
            return Ok(());
        }

        self.set_state(TurnState::Submitting);
        self.messages.push(ChatMessage::user(text));
        self.notify_message(self.messages.len() - 1);
        self.messages.push(ChatMessage::assistant(""));
        let placeholder = self.messages.len() - 1;
        self.notify_message(placeholder);

        let accumulator = Arc::new(Mutex::new(TurnAccumulator::new()));
        let callback: llm::StreamingCallback = {
            let accumulator = accumulator.clone();
            let observer = self.observer.clone();
            Box::new(move |chunk: &StreamingChunk| -> Result<()> {
                if let StreamingChunk::Text(fragment) = chunk {
                    let update = accumulator
                        .lock()
                        .map_err(|_| anyhow::anyhow!("turn accumulator poisoned"))?
                        .append(fragment);
                    let mut message = ChatMessage::assistant(update.display_text);
                    message.scenarios = update.scenarios;
                    observer.on_message_updated(placeholder, &message);
                }
                Ok(())
            })
        };

        self.set_state(TurnState::Streaming);
        let outcome = timeout(
            self.config.turn_timeout,
            self.client.send_message_stream(text, &callback),
        )
        .await;

        match outcome {
            Ok(Ok(_full_reply)) => {
                let update = accumulator
                    .lock()
                    .map_err(|_| anyhow::anyhow!("turn accumulator poisoned"))?
                    .finish();
                self.messages[placeholder].display_text = update.display_text;
                // The accumulator latches menus, so this is monotonic
                self.messages[placeholder].scenarios = update.scenarios;
                self.notify_message(placeholder);
                if let Some(stats) = update.stats {
                    self.stats = stats;
                    self.observer.on_stats_updated(&self.stats);
                }
                self.set_state(TurnState::Completed);
            }
            Ok(Err(e)) => {
                warn!("Turn failed: {}", e);
                self.flush_partial(&accumulator, placeholder);
                self.apologize(placeholder);
                self.set_state(TurnState::Failed);
            }
            Err(_elapsed) => {
                warn!(
                    "Turn timed out after {}s",
                    self.config.turn_timeout.as_secs()
                );
                self.flush_partial(&accumulator, placeholder);
                self.apologize(placeholder);
                self.set_state(TurnState::Failed);
            }
        }

        self.set_state(TurnState::Idle);
        Ok(())
    }

    // Keep whatever the failed stream produced before it broke, so the
    // apology does not erase a half-delivered answer.
    fn flush_partial(
        &mut self,
        accumulator: &Arc<Mutex<TurnAccumulator>>,
        placeholder: usize,
    ) {
        let Ok(mut accumulator) = accumulator.lock() else {
            return;
        };
        let update = accumulator.finish();
        drop(accumulator);

        if !update.display_text.is_empty() {
            self.messages[placeholder].display_text = update.display_text;
            self.messages[placeholder].scenarios = update.scenarios;
            self.notify_message(placeholder);
        }
    }

    // A placeholder that never displayed anything is replaced outright,
    // otherwise the partial reply stays and the apology follows it.
    fn apologize(&mut self, placeholder: usize) {
        if self.messages[placeholder].display_text.is_empty() {
            self.messages[placeholder].display_text = prompt::APOLOGY_MESSAGE.to_string();
            self.notify_message(placeholder);
        } else {
            self.messages
                .push(ChatMessage::assistant(prompt::APOLOGY_MESSAGE));
            self.notify_message(self.messages.len() - 1);
        }
    }

    /// Apply a selected scenario: replace the stats wholesale, then tell
    /// the model which path was chosen. An absent key is a no-op.
    pub async fn select_scenario(&mut self, menu: &ScenarioMenu, key: ScenarioKey) -> Result<()> {
        let Some(target) = menu.get(key) else {
            debug!("Scenario {:?} not offered in this menu", key);
            return Ok(());
        };

        self.stats = target.to_stats();
        self.observer.on_stats_updated(&self.stats);

        let choice = format!("{}{}", prompt::SCENARIO_CHOICE_PREFIX, key.label());
        self.submit(&choice).await
    }

    /// Clear the transcript back to the welcome message and forget all
    /// stats. The model-side chat memory of the owned client is not
    /// touched; callers wanting a truly fresh start build a new session.
    pub fn reset(&mut self) {
        self.messages = vec![ChatMessage::assistant(prompt::WELCOME_MESSAGE)];
        self.stats = StatsSnapshot::default();
        self.set_state(TurnState::Idle);
        self.notify_message(0);
        self.observer.on_stats_updated(&self.stats);
    }
}
