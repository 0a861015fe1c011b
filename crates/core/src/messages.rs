use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::types::Cue;

/// Requests delivered to the page controller from other contexts
/// (popup, background worker, terminal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    GenerateSubtitles { api_key: Option<String> },
    SubtitlesGenerated { cues: Vec<Cue> },
    GoToPreviousSentence,
    Translate,
    ShowVocabulary,
    SaveWord { word: String, translation: String },
    ExampleSentence { word: String },
    ToggleLoop { rate: f64 },
    SetPlaybackRate { rate: f64 },
    ClearSubtitles,
    DismissPopup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CommandResponse {
    Started,
    Success,
    NoSubtitlesFound,
    /// Nothing to act on at the current position; not an error.
    NoOp,
    Rejected { reason: String },
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Pause,
    Play,
    Seeked,
}

#[derive(Debug)]
pub enum PageEvent {
    Player(PlayerEvent),
    /// The page URL changed without a full reload.
    Navigated { url: String },
    Command {
        command: Command,
        reply: Option<oneshot::Sender<CommandResponse>>,
    },
}

impl PageEvent {
    pub fn command(command: Command) -> (Self, oneshot::Receiver<CommandResponse>) {
        let (tx, rx) = oneshot::channel();
        (
            PageEvent::Command {
                command,
                reply: Some(tx),
            },
            rx,
        )
    }
}
