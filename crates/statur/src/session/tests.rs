use super::*;
use crate::types::{ChatRole, MacroValue, ScenarioKey};
use anyhow::anyhow;
use async_trait::async_trait;
use llm::StreamingCallback;
use std::collections::VecDeque;

enum MockTurn {
    Stream(Vec<&'static str>),
    Fail(&'static str),
    StreamThenFail(Vec<&'static str>, &'static str),
    Hang,
}

/// Chat client that plays back scripted turns
struct MockChatClient {
    turns: Mutex<VecDeque<MockTurn>>,
}

impl MockChatClient {
    fn new(turns: Vec<MockTurn>) -> Box<Self> {
        Box::new(Self {
            turns: Mutex::new(turns.into()),
        })
    }

    fn next_turn(&self) -> MockTurn {
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted turn left")
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn send_message(&mut self, _text: &str) -> Result<String> {
        match self.next_turn() {
            MockTurn::Stream(parts) => Ok(parts.concat()),
            MockTurn::Fail(msg) | MockTurn::StreamThenFail(_, msg) => Err(anyhow!(msg)),
            MockTurn::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!()
            }
        }
    }

    async fn send_message_stream(
        &mut self,
        _text: &str,
        callback: &StreamingCallback,
    ) -> Result<String> {
        match self.next_turn() {
            MockTurn::Stream(parts) => {
                for part in &parts {
                    callback(&StreamingChunk::Text(part.to_string()))?;
                }
                callback(&StreamingChunk::StreamingComplete)?;
                Ok(parts.concat())
            }
            MockTurn::Fail(msg) => Err(anyhow!(msg)),
            MockTurn::StreamThenFail(parts, msg) => {
                for part in &parts {
                    callback(&StreamingChunk::Text(part.to_string()))?;
                }
                Err(anyhow!(msg))
            }
            MockTurn::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!()
            }
        }
    }
}

fn known(v: &str) -> MacroValue {
    MacroValue::Known(v.to_string())
}

fn menu_with_recomposition() -> ScenarioMenu {
    serde_json::from_str(r#"{"recomposition":{"kcal":2095,"protein":167,"carbs":200,"fat":65}}"#)
        .unwrap()
}

#[tokio::test]
async fn session_starts_with_welcome_message() {
    let session = CoachSession::new(MockChatClient::new(vec![]));

    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, ChatRole::Assistant);
    assert_eq!(session.messages()[0].display_text, prompt::WELCOME_MESSAGE);
    assert!(session.stats().all_unknown());
    assert_eq!(session.state(), TurnState::Idle);
}

#[tokio::test]
async fn submit_runs_a_full_turn() -> Result<()> {
    let mut session = CoachSession::new(MockChatClient::new(vec![MockTurn::Stream(vec![
        "Verstanden. ",
        "[STAT | Kcal: 1845 | P: 137",
        " | KH: 180 | F: 65]",
    ])]));

    session.submit("Ich wiege 80kg").await?;

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(messages[1].display_text, "Ich wiege 80kg");
    assert_eq!(messages[2].role, ChatRole::Assistant);
    assert_eq!(messages[2].display_text, "Verstanden.");

    assert_eq!(session.stats().calories, known("1845"));
    assert_eq!(session.stats().fat, known("65"));
    assert_eq!(session.state(), TurnState::Idle);
    Ok(())
}

#[tokio::test]
async fn submit_trims_and_ignores_blank_input() -> Result<()> {
    // No scripted turns: the client must never be called
    let mut session = CoachSession::new(MockChatClient::new(vec![]));

    session.submit("").await?;
    session.submit("   \n\t  ").await?;

    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.state(), TurnState::Idle);
    Ok(())
}

#[tokio::test]
async fn failed_stream_yields_single_apology() -> Result<()> {
    let mut session =
        CoachSession::new(MockChatClient::new(vec![MockTurn::Fail("connection reset")]));

    session.submit("Hallo").await?;

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].role, ChatRole::Assistant);
    assert_eq!(messages[2].display_text, prompt::APOLOGY_MESSAGE);
    assert!(session.stats().all_unknown());
    assert_eq!(session.state(), TurnState::Idle);
    Ok(())
}

#[tokio::test]
async fn failure_after_partial_reply_keeps_the_partial_text() -> Result<()> {
    // Error reported by the callback-driven stream after fragments have
    // arrived: simulate by failing on the second turn only
    let mut session = CoachSession::new(MockChatClient::new(vec![
        MockTurn::Stream(vec!["Erste Antwort."]),
        MockTurn::Fail("boom"),
    ]));

    session.submit("eins").await?;
    session.submit("zwei").await?;

    let messages = session.messages();
    assert_eq!(messages[2].display_text, "Erste Antwort.");
    // Second turn: user message, empty placeholder replaced by apology
    assert_eq!(messages[4].display_text, prompt::APOLOGY_MESSAGE);
    assert_eq!(session.state(), TurnState::Idle);
    Ok(())
}

#[tokio::test]
async fn mid_stream_failure_keeps_the_partial_reply_and_appends_apology() -> Result<()> {
    let mut session = CoachSession::new(MockChatClient::new(vec![MockTurn::StreamThenFail(
        vec!["Teilantwort bereits gesendet."],
        "connection reset",
    )]));

    session.submit("Hallo").await?;

    let messages = session.messages();
    assert_eq!(messages.len(), 4);
    // The half-delivered answer survives in the placeholder...
    assert_eq!(messages[2].display_text, "Teilantwort bereits gesendet.");
    // ...and the apology follows it as its own message
    assert_eq!(messages[3].role, ChatRole::Assistant);
    assert_eq!(messages[3].display_text, prompt::APOLOGY_MESSAGE);
    assert_eq!(session.state(), TurnState::Idle);
    Ok(())
}

#[tokio::test]
async fn hanging_stream_is_cut_off_by_the_turn_timeout() -> Result<()> {
    let config = SessionConfig {
        turn_timeout: Duration::from_millis(50),
    };
    let mut session = CoachSession::with_config(
        MockChatClient::new(vec![MockTurn::Hang]),
        config,
        Arc::new(NullObserver),
    );

    session.submit("Hallo").await?;

    assert_eq!(
        session.messages().last().unwrap().display_text,
        prompt::APOLOGY_MESSAGE
    );
    assert_eq!(session.state(), TurnState::Idle);
    Ok(())
}

#[tokio::test]
async fn scenario_menu_is_attached_to_the_assistant_message() -> Result<()> {
    let mut session = CoachSession::new(MockChatClient::new(vec![MockTurn::Stream(vec![
        r#"Analyse fertig. [[SCENARIOS:{"fatLoss":"#,
        r#"{"kcal":1845,"protein":137,"carbs":180,"fat":65}}]]"#,
    ])]));

    session.submit("Meine Daten: 30, 90kg, 180cm").await?;

    let reply = &session.messages()[2];
    assert_eq!(reply.display_text, "Analyse fertig.");
    let menu = reply.scenarios.as_ref().expect("menu attached");
    assert_eq!(menu.available(), vec![ScenarioKey::FatLoss]);
    Ok(())
}

#[tokio::test]
async fn select_scenario_with_absent_key_is_a_noop() -> Result<()> {
    // No scripted turns: nothing may be sent
    let mut session = CoachSession::new(MockChatClient::new(vec![]));
    let menu = menu_with_recomposition();

    session
        .select_scenario(&menu, ScenarioKey::MuscleGain)
        .await?;

    assert_eq!(session.messages().len(), 1);
    assert!(session.stats().all_unknown());
    Ok(())
}

#[tokio::test]
async fn select_scenario_replaces_stats_and_announces_the_choice() -> Result<()> {
    let mut session = CoachSession::new(MockChatClient::new(vec![MockTurn::Stream(vec![
        "Pfad festgelegt.",
    ])]));
    let menu = menu_with_recomposition();

    session
        .select_scenario(&menu, ScenarioKey::Recomposition)
        .await?;

    assert_eq!(session.stats().calories, known("2095"));
    assert_eq!(session.stats().protein, known("167"));
    assert_eq!(session.stats().carbs, known("200"));
    assert_eq!(session.stats().fat, known("65"));

    let user_message = &session.messages()[1];
    assert_eq!(user_message.role, ChatRole::User);
    assert_eq!(user_message.display_text, "Ich wähle: Fett weg & Muskeln");
    Ok(())
}

#[tokio::test]
async fn reset_restores_the_initial_state() -> Result<()> {
    let mut session = CoachSession::new(MockChatClient::new(vec![MockTurn::Stream(vec![
        "Ok. [STAT | Kcal: 2000 | P: 150 | KH: 200 | F: 70]",
    ])]));

    session.submit("Hallo").await?;
    assert!(session.stats().calories.is_known());

    session.reset();

    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].display_text, prompt::WELCOME_MESSAGE);
    assert!(session.stats().all_unknown());
    assert_eq!(session.state(), TurnState::Idle);
    Ok(())
}
