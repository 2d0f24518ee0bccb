use serde::Deserialize;
use std::fmt;

/// Sentinel the model emits when a value cannot be computed yet
pub const UNKNOWN_TOKEN: &str = "unbekannt";

/// One macro-nutrient value as streamed by the model.
///
/// Known values keep the exact numeric string from the wire (including
/// sign and fraction) so they round-trip into the display unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MacroValue {
    Known(String),
    #[default]
    Unknown,
}

impl MacroValue {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case(UNKNOWN_TOKEN) {
            MacroValue::Unknown
        } else {
            MacroValue::Known(raw.to_string())
        }
    }

    pub fn known(value: impl ToString) -> Self {
        MacroValue::Known(value.to_string())
    }

    pub fn is_known(&self) -> bool {
        matches!(self, MacroValue::Known(_))
    }
}

impl fmt::Display for MacroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroValue::Known(value) => write!(f, "{value}"),
            MacroValue::Unknown => write!(f, "--"),
        }
    }
}

/// The user's current daily nutrition targets / remaining budget.
/// Always replaced wholesale, never merged field by field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub calories: MacroValue,
    pub protein: MacroValue,
    pub carbs: MacroValue,
    pub fat: MacroValue,
}

impl StatsSnapshot {
    pub fn all_unknown(&self) -> bool {
        !self.calories.is_known()
            && !self.protein.is_known()
            && !self.carbs.is_known()
            && !self.fat.is_known()
    }
}

/// The fixed set of nutrition-target presets the model may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKey {
    FatLoss,
    MuscleGain,
    Recomposition,
}

impl ScenarioKey {
    pub const ALL: [ScenarioKey; 3] = [
        ScenarioKey::FatLoss,
        ScenarioKey::MuscleGain,
        ScenarioKey::Recomposition,
    ];

    /// User-facing German label, exactly as shown on the selection buttons
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKey::FatLoss => "Fett verlieren",
            ScenarioKey::MuscleGain => "Muskeln aufbauen",
            ScenarioKey::Recomposition => "Fett weg & Muskeln",
        }
    }
}

/// Target tuple for one scenario, as embedded in the scenario tag JSON.
/// Numbers stay as `serde_json::Number` so the model's exact notation
/// survives into the stats display.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioTarget {
    pub kcal: serde_json::Number,
    pub protein: serde_json::Number,
    #[serde(default)]
    pub carbs: Option<serde_json::Number>,
    #[serde(default)]
    pub fat: Option<serde_json::Number>,
}

impl ScenarioTarget {
    pub fn to_stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            calories: MacroValue::known(&self.kcal),
            protein: MacroValue::known(&self.protein),
            carbs: self
                .carbs
                .as_ref()
                .map(MacroValue::known)
                .unwrap_or_default(),
            fat: self.fat.as_ref().map(MacroValue::known).unwrap_or_default(),
        }
    }
}

/// Menu of scenarios offered in one assistant turn. Not all keys are
/// always present; the model only sends the ones it considers relevant.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ScenarioMenu {
    #[serde(rename = "fatLoss")]
    pub fat_loss: Option<ScenarioTarget>,
    #[serde(rename = "muscleGain")]
    pub muscle_gain: Option<ScenarioTarget>,
    pub recomposition: Option<ScenarioTarget>,
}

impl ScenarioMenu {
    pub fn get(&self, key: ScenarioKey) -> Option<&ScenarioTarget> {
        match key {
            ScenarioKey::FatLoss => self.fat_loss.as_ref(),
            ScenarioKey::MuscleGain => self.muscle_gain.as_ref(),
            ScenarioKey::Recomposition => self.recomposition.as_ref(),
        }
    }

    /// Keys actually present in this menu, in canonical order
    pub fn available(&self) -> Vec<ScenarioKey> {
        ScenarioKey::ALL
            .into_iter()
            .filter(|key| self.get(*key).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.available().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the visible transcript. `display_text` is mutated in
/// place while the assistant turn streams, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub display_text: String,
    pub scenarios: Option<ScenarioMenu>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            display_text: text.into(),
            scenarios: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            display_text: text.into(),
            scenarios: None,
        }
    }
}
