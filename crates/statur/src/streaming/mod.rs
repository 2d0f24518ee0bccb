//! Incremental extraction of structured state from streamed model text.
//!
//! The model replies in natural language with inline control tags (stats,
//! scenario menus, button directives). This module re-derives, after every
//! received fragment, the text the user should see plus whatever structured
//! payloads have fully arrived so far.

mod tag_processor;

#[cfg(test)]
mod test_utils;

pub use tag_processor::{scan_turn_buffer, TurnAccumulator};

use crate::types::{ScenarioMenu, StatsSnapshot};

/// Derived state of the in-flight assistant turn after one scan
#[derive(Debug, Clone, PartialEq)]
pub struct TurnUpdate {
    /// Raw buffer with all control tags removed and whitespace tidied
    pub display_text: String,
    /// Present once a well-formed stats tag has been seen
    pub stats: Option<StatsSnapshot>,
    /// Present once a scenario tag has parsed completely
    pub scenarios: Option<ScenarioMenu>,
}
