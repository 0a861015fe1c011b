//! In-memory stand-ins for the host page and the language model.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::{
    player::{Attachment, PageHost, PopupContent, PopupId, SubtitleDisplay, VideoPlayer},
    service::{Credential, ServiceError, TextService, TranslationRequest, VocabularyRequest},
    session::Session,
    settings::Level,
    types::{Cue, CueList},
    vocabulary::VocabularyTerm,
};

pub const PAGE_URL: &str = "https://www.youtube.com/watch?v=abc123&t=5s";

#[derive(Debug)]
struct PlayerState {
    time_ms: u64,
    paused: bool,
    rate: f64,
    connected: bool,
    seeks: Vec<u64>,
}

#[derive(Debug)]
pub struct FakePlayer {
    state: Mutex<PlayerState>,
}

impl FakePlayer {
    pub fn at(time_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PlayerState {
                time_ms,
                paused: false,
                rate: 1.0,
                connected: true,
                seeks: Vec::new(),
            }),
        })
    }

    /// Moves the clock without recording a seek.
    pub fn set_time(&self, time_ms: u64) {
        self.state.lock().unwrap().time_ms = time_ms;
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().unwrap().paused = paused;
    }

    pub fn disconnect(&self) {
        self.state.lock().unwrap().connected = false;
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.state.lock().unwrap().seeks.clone()
    }
}

impl VideoPlayer for FakePlayer {
    fn current_time_ms(&self) -> u64 {
        self.state.lock().unwrap().time_ms
    }

    fn set_current_time_ms(&self, time_ms: u64) {
        let mut state = self.state.lock().unwrap();
        state.time_ms = time_ms;
        state.seeks.push(time_ms);
    }

    fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.state.lock().unwrap().rate = rate;
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}

#[derive(Debug, Default)]
struct DisplayState {
    visible: bool,
    original: Option<String>,
    translation: Option<String>,
    message: Option<String>,
    popup: Option<(PopupId, PopupContent)>,
    original_writes: usize,
    hides: usize,
}

#[derive(Debug, Default)]
pub struct FakeDisplay {
    state: Mutex<DisplayState>,
}

impl FakeDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }

    pub fn original(&self) -> Option<String> {
        self.state.lock().unwrap().original.clone()
    }

    pub fn translation(&self) -> Option<String> {
        self.state.lock().unwrap().translation.clone()
    }

    pub fn message(&self) -> Option<String> {
        self.state.lock().unwrap().message.clone()
    }

    pub fn popup(&self) -> Option<PopupContent> {
        self.state.lock().unwrap().popup.as_ref().map(|(_, c)| c.clone())
    }

    pub fn original_writes(&self) -> usize {
        self.state.lock().unwrap().original_writes
    }

    pub fn hides(&self) -> usize {
        self.state.lock().unwrap().hides
    }
}

impl SubtitleDisplay for FakeDisplay {
    fn show_original(&self, text: &str) {
        let mut state = self.state.lock().unwrap();
        state.visible = true;
        state.original = Some(text.to_string());
        state.original_writes += 1;
    }

    fn show_translation(&self, text: &str) {
        let mut state = self.state.lock().unwrap();
        state.visible = true;
        state.translation = Some(text.to_string());
    }

    fn clear_translation(&self) {
        self.state.lock().unwrap().translation = None;
    }

    fn hide(&self) {
        let mut state = self.state.lock().unwrap();
        state.visible = false;
        state.original = None;
        state.translation = None;
        state.hides += 1;
    }

    fn show_message(&self, text: &str) {
        self.state.lock().unwrap().message = Some(text.to_string());
    }

    fn open_popup(&self, content: PopupContent) -> PopupId {
        let id = PopupId::new();
        self.state.lock().unwrap().popup = Some((id, content));
        id
    }

    fn update_popup(&self, id: PopupId, content: PopupContent) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.popup.as_mut() {
            Some((open, slot)) if *open == id => {
                *slot = content;
                true
            }
            _ => false,
        }
    }

    fn close_popup(&self, id: PopupId) {
        let mut state = self.state.lock().unwrap();
        if state.popup.as_ref().is_some_and(|(open, _)| *open == id) {
            state.popup = None;
        }
    }

    fn open_popup_id(&self) -> Option<PopupId> {
        self.state.lock().unwrap().popup.as_ref().map(|(id, _)| *id)
    }
}

pub fn attachment(player: &Arc<FakePlayer>, display: &Arc<FakeDisplay>) -> Attachment {
    Attachment {
        player: player.clone(),
        display: display.clone(),
        page_url: PAGE_URL.to_string(),
    }
}

pub fn session_with(player: &Arc<FakePlayer>, display: &Arc<FakeDisplay>, cues: CueList) -> Session {
    let mut session = Session::new(attachment(player, display));
    session.cues = cues;
    session
}

/// Hands out queued discovery results, then `None` forever.
#[derive(Default)]
pub struct FakeHost {
    results: Mutex<VecDeque<Option<Attachment>>>,
    calls: AtomicUsize,
}

impl FakeHost {
    pub fn new(results: Vec<Option<Attachment>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, result: Option<Attachment>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageHost for FakeHost {
    async fn discover(&self) -> Option<Attachment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.lock().unwrap().pop_front().flatten()
    }
}

pub struct FakeService {
    pub subtitles: Mutex<Result<Vec<Cue>, ServiceError>>,
    pub translation: Mutex<Result<String, ServiceError>>,
    pub vocabulary: Mutex<Result<Vec<VocabularyTerm>, ServiceError>>,
    pub example: Mutex<Result<String, ServiceError>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subtitles: Mutex::new(Ok(Vec::new())),
            translation: Mutex::new(Ok("translated".into())),
            vocabulary: Mutex::new(Ok(Vec::new())),
            example: Mutex::new(Ok("An example.".into())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl TextService for FakeService {
    async fn generate_subtitles(
        &self,
        _credential: &Credential,
        video_url: &str,
    ) -> Result<Vec<Cue>, ServiceError> {
        self.record(format!("subtitles:{video_url}"));
        self.subtitles.lock().unwrap().clone()
    }

    async fn translate(
        &self,
        _credential: &Credential,
        request: &TranslationRequest,
    ) -> Result<String, ServiceError> {
        self.record(format!(
            "translate:{}:{}:{}",
            request.text, request.target_language, request.level
        ));
        self.translation.lock().unwrap().clone()
    }

    async fn extract_vocabulary(
        &self,
        _credential: &Credential,
        request: &VocabularyRequest,
    ) -> Result<Vec<VocabularyTerm>, ServiceError> {
        self.record(format!("vocabulary:{}", request.text));
        self.vocabulary.lock().unwrap().clone()
    }

    async fn generate_example_sentence(
        &self,
        _credential: &Credential,
        word: &str,
        _level: Level,
    ) -> Result<String, ServiceError> {
        self.record(format!("example:{word}"));
        self.example.lock().unwrap().clone()
    }
}
