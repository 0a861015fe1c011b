use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::{Provider, ProviderError};

pub const SETTINGS_KEY: &str = "settings";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        };
        f.write_str(name)
    }
}

/// What the display does when the video is paused on a cue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseAction {
    #[default]
    Translate,
    Vocabulary,
    None,
}

/// User settings. Written by the configuration surface, read-only to the page controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub target_language: String,
    pub level: Level,
    pub provider: Provider,
    pub pause_action: PauseAction,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            target_language: "en".to_string(),
            level: Level::default(),
            provider: Provider::default(),
            pause_action: PauseAction::default(),
        }
    }
}

impl Settings {
    pub fn api_key(&self) -> Result<String, ProviderError> {
        self.provider.resolve_api_key(self.api_key.as_deref())
    }
}
