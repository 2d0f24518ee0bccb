mod cli;
mod logging;
mod prompt;
mod session;
mod streaming;
mod types;
mod ui;

use crate::session::{CoachSession, SessionConfig};
use crate::types::{ScenarioKey, ScenarioMenu};
use crate::ui::TerminalUi;
use anyhow::{Context, Result};
use clap::Parser;
use llm::logo::decode_png_data_uri;
use llm::{gemini, GeminiClient, LogoService};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = cli::Args::parse();
    logging::setup_logging(args.verbose);

    if !args.no_logo {
        fetch_logo(&args.base_url).await;
    }

    let ui = Arc::new(TerminalUi::new());
    let mut session = build_session(&args, ui.clone())?;

    println!("STATUR — tippe /reset für einen Neustart, /quit zum Beenden.");
    ui.print_message(0, &session.messages()[0]);

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("\n> ") {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match line.as_str() {
                    "/quit" | "/exit" => break,
                    "/reset" => {
                        // Resetting the transcript alone would leave the
                        // model-side chat memory intact, so start over
                        // with a freshly built client too.
                        session = build_session(&args, ui.clone())?;
                        ui.print_message(0, &session.messages()[0]);
                        continue;
                    }
                    "/stats" => {
                        ui.print_stats(session.stats());
                        continue;
                    }
                    _ => {}
                }

                if let Some((menu, key)) = pending_selection(&session, &line) {
                    session.select_scenario(&menu, key).await?;
                } else {
                    session.submit(&line).await?;
                }

                if !session.stats().all_unknown() {
                    ui.print_stats(session.stats());
                }
                if let Some(menu) = offered_menu(&session) {
                    ui.print_scenario_menu(menu);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn build_session(args: &cli::Args, ui: Arc<TerminalUi>) -> Result<CoachSession> {
    let client = GeminiClient::from_env(args.model.clone(), args.base_url.clone())
        .context("STATUR kann ohne API-Schlüssel nicht starten")?
        .with_system_instruction(prompt::SYSTEM_INSTRUCTION);
    let config = SessionConfig {
        turn_timeout: Duration::from_secs(args.turn_timeout),
    };
    Ok(CoachSession::with_config(Box::new(client), config, ui))
}

/// Menu attached to the latest assistant reply, if any
fn offered_menu(session: &CoachSession) -> Option<&ScenarioMenu> {
    let last = session.messages().last()?;
    last.scenarios.as_ref().filter(|menu| !menu.is_empty())
}

/// Map a numeric input line onto the currently offered scenario menu
fn pending_selection(session: &CoachSession, line: &str) -> Option<(ScenarioMenu, ScenarioKey)> {
    let menu = offered_menu(session)?;
    let choice: usize = line.parse().ok()?;
    let key = *menu.available().get(choice.checked_sub(1)?)?;
    Some((menu.clone(), key))
}

/// Generate the logo once and cache it as a PNG. Purely decorative:
/// any failure leaves the app running without one.
async fn fetch_logo(base_url: &str) {
    let api_key = match std::env::var(gemini::API_KEY_ENV) {
        Ok(key) => key,
        Err(_) => return,
    };

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("statur");
    let logo_path = cache_dir.join("logo.png");
    if logo_path.exists() {
        info!("Using cached logo at {}", logo_path.display());
        return;
    }

    let service = LogoService::new(api_key, base_url.to_string());
    let Some(uri) = service.fetch_logo().await else {
        return;
    };
    let Some(bytes) = decode_png_data_uri(&uri) else {
        warn!("Logo data URI could not be decoded");
        return;
    };

    if let Err(e) = std::fs::create_dir_all(&cache_dir)
        .and_then(|_| std::fs::write(&logo_path, &bytes))
    {
        warn!("Could not cache logo: {}", e);
        return;
    }
    info!("Logo saved to {}", logo_path.display());
}
