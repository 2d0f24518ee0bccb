use super::TurnUpdate;
use crate::types::{MacroValue, ScenarioMenu, StatsSnapshot};
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

const SCENARIO_OPEN: &str = "[[SCENARIOS:";
const SCENARIO_CLOSE: &str = "]]";
const BUTTON_OPEN: &str = "[Button:";
const STAT_OPEN: &str = "[STAT";

// Keyword and unknown-marker are case-insensitive, field labels exact.
// Values keep the permissive digit/dot/dash class so signed and
// fractional numbers pass through verbatim.
fn stat_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\[(?i:STAT)\s*\|\s*Kcal:\s*([\d.\-]+|(?i:unbekannt))\s*\|\s*P:\s*([\d.\-]+|(?i:unbekannt))\s*\|\s*KH:\s*([\d.\-]+|(?i:unbekannt))\s*\|\s*F:\s*([\d.\-]+|(?i:unbekannt))\s*\]",
        )
        .expect("stat tag pattern")
    })
}

enum ScenarioScan {
    /// Tag parsed; bytes consumed and the menu
    Complete(usize, ScenarioMenu),
    /// Opening seen but the payload has not fully arrived yet
    Incomplete,
    NotThisTag,
}

fn scan_scenario_tag(tail: &str) -> ScenarioScan {
    if tail.len() < SCENARIO_OPEN.len() {
        return if SCENARIO_OPEN.starts_with(tail) {
            ScenarioScan::Incomplete
        } else {
            ScenarioScan::NotThisTag
        };
    }
    if !tail.starts_with(SCENARIO_OPEN) {
        return ScenarioScan::NotThisTag;
    }

    // The JSON payload may itself contain "]]" inside a string, so try
    // each candidate terminator until one yields a parseable object.
    let body = &tail[SCENARIO_OPEN.len()..];
    let mut from = 0;
    while let Some(found) = body[from..].find(SCENARIO_CLOSE) {
        let end = from + found;
        if let Ok(menu) = serde_json::from_str::<ScenarioMenu>(body[..end].trim()) {
            return ScenarioScan::Complete(
                SCENARIO_OPEN.len() + end + SCENARIO_CLOSE.len(),
                menu,
            );
        }
        from = end + 1;
    }
    ScenarioScan::Incomplete
}

fn scan_stat_tag(tail: &str) -> Option<(usize, StatsSnapshot)> {
    let caps = stat_regex().captures(tail)?;
    let matched = caps.get(0)?;
    let snapshot = StatsSnapshot {
        calories: MacroValue::parse(&caps[1]),
        protein: MacroValue::parse(&caps[2]),
        carbs: MacroValue::parse(&caps[3]),
        fat: MacroValue::parse(&caps[4]),
    };
    Some((matched.end(), snapshot))
}

enum ButtonScan {
    Consumed(usize),
    Incomplete,
    NotThisTag,
}

fn scan_button_tag(tail: &str) -> ButtonScan {
    if tail.len() < BUTTON_OPEN.len() {
        return if BUTTON_OPEN.starts_with(tail) {
            ButtonScan::Incomplete
        } else {
            ButtonScan::NotThisTag
        };
    }
    if !tail.starts_with(BUTTON_OPEN) {
        return ButtonScan::NotThisTag;
    }
    match tail.find(']') {
        Some(end) => ButtonScan::Consumed(end + 1),
        None => ButtonScan::Incomplete,
    }
}

// A stats tag that is still streaming in: opening keyword seen, no ']'
// yet. Case-insensitive on the keyword like the tag itself.
fn stat_tag_may_grow(tail: &str) -> bool {
    let open = STAT_OPEN.as_bytes();
    let head = &tail.as_bytes()[..tail.len().min(open.len())];
    head.eq_ignore_ascii_case(&open[..head.len()]) && !tail.contains(']')
}

/// Trim the whitespace run a removed tag leaves behind, keeping the
/// strongest separator that was already there (blank line > newline >
/// single space). Returns the remainder after the skipped whitespace.
fn join_removed<'a>(display: &mut String, after: &'a str) -> &'a str {
    let kept_len = display.trim_end().len();
    let trailing_newlines = display[kept_len..].matches('\n').count();
    let had_whitespace = kept_len < display.len();

    let lead_len = after.len() - after.trim_start().len();
    let leading = &after[..lead_len];
    let newlines = trailing_newlines + leading.matches('\n').count();
    let remainder = &after[lead_len..];

    display.truncate(kept_len);
    if !display.is_empty() && !remainder.is_empty() {
        if newlines >= 2 {
            display.push_str("\n\n");
        } else if newlines == 1 {
            display.push('\n');
        } else if had_whitespace || lead_len > 0 {
            display.push(' ');
        }
    }
    remainder
}

fn scan_buffer(buffer: &str, closed: bool) -> TurnUpdate {
    let mut display = String::with_capacity(buffer.len());
    let mut stats: Option<StatsSnapshot> = None;
    let mut scenarios: Option<ScenarioMenu> = None;
    let mut rest = buffer;

    while let Some(pos) = rest.find('[') {
        display.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        match scan_scenario_tag(tail) {
            ScenarioScan::Complete(len, menu) => {
                trace!("scenario menu parsed at offset {}", buffer.len() - tail.len());
                scenarios = Some(menu);
                rest = join_removed(&mut display, &tail[len..]);
                continue;
            }
            ScenarioScan::Incomplete => {
                // Once the turn has closed, a bare "[" or "[[" that
                // never grew into the opener is prose and comes back.
                if closed && !tail.starts_with(SCENARIO_OPEN) {
                    display.push('[');
                    rest = &tail[1..];
                    continue;
                }
                // Withhold the tag from display. A payload that never
                // parses by the end of the turn stays withheld: raw
                // JSON must not reach the transcript.
                rest = "";
                break;
            }
            ScenarioScan::NotThisTag => {}
        }

        if let Some((len, snapshot)) = scan_stat_tag(tail) {
            // First well-formed tag wins; later duplicates are still
            // stripped but their values ignored.
            if stats.is_none() {
                stats = Some(snapshot);
            }
            rest = join_removed(&mut display, &tail[len..]);
            continue;
        }

        match scan_button_tag(tail) {
            ButtonScan::Consumed(len) => {
                rest = join_removed(&mut display, &tail[len..]);
                continue;
            }
            ButtonScan::Incomplete if !closed => {
                rest = "";
                break;
            }
            _ => {}
        }

        if !closed && stat_tag_may_grow(tail) {
            rest = "";
            break;
        }

        // Plain bracket in prose, or a malformed tag that can no longer
        // complete. Emit it literally.
        display.push('[');
        rest = &tail[1..];
    }

    display.push_str(rest);

    TurnUpdate {
        display_text: display.trim().to_string(),
        stats,
        scenarios,
    }
}

/// Re-derive display text and structured payloads from the full raw
/// buffer of one assistant turn. Pure: same buffer, same result.
///
/// A tag opening at the end of the buffer that may still be streaming
/// in is withheld from the display until it either completes or can be
/// ruled out, so the display text only ever grows across calls.
pub fn scan_turn_buffer(buffer: &str) -> TurnUpdate {
    scan_buffer(buffer, false)
}

/// Stateful wrapper around [`scan_turn_buffer`] for one assistant turn.
///
/// Owns the raw buffer and latches structured payloads: once a stats
/// snapshot or scenario menu has been seen it stays in every later
/// update, a later different tag in the same turn replaces it.
#[derive(Default)]
pub struct TurnAccumulator {
    buffer: String,
    stats: Option<StatsSnapshot>,
    scenarios: Option<ScenarioMenu>,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one streamed fragment and re-derive visible state
    pub fn append(&mut self, fragment: &str) -> TurnUpdate {
        self.buffer.push_str(fragment);
        self.derive(false)
    }

    /// Close the turn. Trailing text that looked like a growing stats
    /// tag but never completed is released into the display.
    pub fn finish(&mut self) -> TurnUpdate {
        self.derive(true)
    }

    fn derive(&mut self, closed: bool) -> TurnUpdate {
        let update = scan_buffer(&self.buffer, closed);
        if update.stats.is_some() {
            self.stats = update.stats.clone();
        }
        if update.scenarios.is_some() {
            self.scenarios = update.scenarios.clone();
        }
        TurnUpdate {
            display_text: update.display_text,
            stats: self.stats.clone(),
            scenarios: self.scenarios.clone(),
        }
    }
}
