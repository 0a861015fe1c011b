//! The page controller: owns the session and runs the single cooperative
//! event loop that every other component is driven from.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc},
    time::Instant,
};

use crate::{
    dispatcher::{ActionDispatcher, PopupTimer, ServiceReply, error_text},
    messages::{Command, CommandResponse, PageEvent, PlayerEvent},
    persistence::Persistence,
    player::{Attachment, PageHost},
    sentence_loop::{LoopToggle, SentenceLoop},
    service::TextService,
    session::Session,
    settings::PauseAction,
    sync::SyncDriver,
    types::{Cue, CueList},
    video_url::normalize_video_url,
};

pub const MAX_DISCOVERY_ATTEMPTS: u32 = 10;
pub const DISCOVERY_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DISCOVERY_MAX_DELAY: Duration = Duration::from_secs(4);

/// Delay before discovery attempt `attempt` (zero-based) is retried.
pub fn discovery_delay(attempt: u32) -> Duration {
    DISCOVERY_BASE_DELAY
        .saturating_mul(1 << attempt.min(16))
        .min(DISCOVERY_MAX_DELAY)
}

#[derive(Debug, Default)]
struct Discovery {
    attempt: u32,
    next_at: Option<Instant>,
}

impl Discovery {
    fn schedule_now(&mut self) {
        self.attempt = 0;
        self.next_at = Some(Instant::now());
    }

    fn cancel(&mut self) {
        self.next_at = None;
    }

    fn is_pending(&self) -> bool {
        self.next_at.is_some()
    }

    async fn due(&self) {
        match self.next_at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

pub struct PageController {
    host: Arc<dyn PageHost>,
    dispatcher: ActionDispatcher,
    replies_rx: mpsc::UnboundedReceiver<ServiceReply>,
    sync: SyncDriver,
    sentence_loop: SentenceLoop,
    popup_timer: PopupTimer,
    discovery: Discovery,
    session: Option<Session>,
}

impl PageController {
    pub fn new(
        host: Arc<dyn PageHost>,
        service: Arc<dyn TextService>,
        persistence: Persistence,
    ) -> Self {
        let (dispatcher, replies_rx) = ActionDispatcher::new(service, persistence);
        Self {
            host,
            dispatcher,
            replies_rx,
            sync: SyncDriver::new(),
            sentence_loop: SentenceLoop::new(),
            popup_timer: PopupTimer::default(),
            discovery: Discovery::default(),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_running()
    }

    pub fn is_looping(&self) -> bool {
        self.sentence_loop.is_engaged()
    }

    fn persistence(&self) -> &Persistence {
        self.dispatcher.persistence()
    }

    /// Runs until shutdown or until every event sender is dropped.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<PageEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        self.discovery.schedule_now();
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                Some(reply) = self.replies_rx.recv() => self.handle_reply(reply).await,
                _ = self.discovery.due() => self.discover_once().await,
                _ = self.sync.tick() => self.on_sync_tick(),
                _ = self.sentence_loop.tick() => self.on_loop_tick(),
                popup = self.popup_timer.expired() => {
                    self.popup_timer.disarm();
                    if let Some(session) = &self.session {
                        session.display.close_popup(popup);
                    }
                }
            }
        }
        self.teardown();
        tracing::info!("page controller stopped");
        Ok(())
    }

    /// One discovery pass; on failure the next one is scheduled with backoff.
    pub async fn discover_once(&mut self) {
        match self.host.discover().await {
            Some(attachment) => {
                self.discovery.cancel();
                self.attach(attachment).await;
            }
            None => {
                self.discovery.attempt += 1;
                if self.discovery.attempt >= MAX_DISCOVERY_ATTEMPTS {
                    self.discovery.cancel();
                    tracing::error!(
                        attempts = self.discovery.attempt,
                        "video player not found after multiple attempts"
                    );
                    return;
                }
                let delay = discovery_delay(self.discovery.attempt - 1);
                tracing::info!(
                    attempt = self.discovery.attempt,
                    max = MAX_DISCOVERY_ATTEMPTS,
                    ?delay,
                    "video player not found, retrying"
                );
                self.discovery.next_at = Some(Instant::now() + delay);
            }
        }
    }

    pub async fn attach(&mut self, attachment: Attachment) {
        self.teardown();
        let mut session = Session::new(attachment);
        tracing::info!(url = %session.cache_key(), "video attached");

        if let Some(cues) = self.persistence().load_cues(&session.page_url).await {
            log_cue_issues(&cues);
            session.cues = cues;
        }
        if !session.cues.is_empty() {
            self.sync.start(&session);
        }
        self.session = Some(session);
    }

    /// Stops both timers, closes overlays and drops the session.
    pub fn teardown(&mut self) {
        self.sync.stop();
        self.sentence_loop.stop();
        self.popup_timer.disarm();
        self.dispatcher.reset();
        if let Some(session) = self.session.take() {
            if let Some(popup) = session.display.open_popup_id() {
                session.display.close_popup(popup);
            }
            session.display.hide();
            tracing::debug!(url = %session.cache_key(), "session torn down");
        }
    }

    pub fn on_sync_tick(&mut self) {
        let Some(session) = &self.session else {
            self.sync.stop();
            return;
        };
        if !session.player.is_connected() {
            tracing::info!("video element left the page, rediscovering");
            self.teardown();
            self.discovery.schedule_now();
            return;
        }
        self.sync.refresh(session);
    }

    pub fn on_loop_tick(&mut self) {
        match &self.session {
            Some(session) => {
                self.sentence_loop.clamp(session);
            }
            None => self.sentence_loop.stop(),
        }
    }

    pub async fn handle_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::Player(event) => self.handle_player_event(event).await,
            PageEvent::Navigated { url } => {
                tracing::info!(%url, "page url changed");
                self.teardown();
                self.discovery.schedule_now();
            }
            PageEvent::Command { command, reply } => {
                let response = self.handle_command(command).await;
                if let Some(reply) = reply {
                    let _ = reply.send(response);
                }
            }
        }
    }

    async fn handle_player_event(&mut self, event: PlayerEvent) {
        let Some(session) = &self.session else {
            return;
        };
        if !self.sync.is_running() {
            return;
        }
        match event {
            PlayerEvent::Pause => {
                if self.sync.on_pause(session).is_none() {
                    return;
                }
                let settings = self.persistence().load_settings().await;
                match settings.pause_action {
                    PauseAction::Translate => {
                        self.dispatcher.translate_current(session).await;
                    }
                    PauseAction::Vocabulary => {
                        self.dispatcher
                            .show_vocabulary(session, &mut self.popup_timer)
                            .await;
                    }
                    PauseAction::None => {}
                }
            }
            PlayerEvent::Play => {
                self.popup_timer.disarm();
                self.sync.on_play(session);
            }
            PlayerEvent::Seeked => self.sync.on_seeked(session),
        }
    }

    async fn handle_reply(&mut self, reply: ServiceReply) {
        match reply {
            ServiceReply::Subtitles { page_url, result } => {
                let same_page = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.cache_key() == normalize_video_url(&page_url));
                match result {
                    Ok(cues) if same_page => {
                        self.handle_command(Command::SubtitlesGenerated { cues }).await;
                    }
                    Ok(cues) => {
                        // The user navigated away; keep the work for their return.
                        let cues = CueList::new(cues);
                        if let Err(e) = self.persistence().save_cues(&page_url, &cues).await {
                            tracing::warn!(error = %e, "failed to cache subtitles");
                        }
                    }
                    Err(e) => {
                        tracing::error!(url = %page_url, error = %e, "subtitle generation failed");
                        if let Some(session) = self.session.as_ref().filter(|_| same_page) {
                            session.display.show_message(error_text(&e));
                        }
                    }
                }
            }
            other => self.dispatcher.apply_reply(other, self.session.as_ref()).await,
        }
    }

    pub async fn handle_command(&mut self, command: Command) -> CommandResponse {
        if self.session.is_none() {
            return CommandResponse::Error {
                message: "no video attached".into(),
            };
        }

        match command {
            Command::GenerateSubtitles { api_key } => {
                self.clear_subtitles();
                let Some(session) = &self.session else {
                    return CommandResponse::NoOp;
                };
                if self
                    .dispatcher
                    .generate_subtitles(session, api_key.as_deref())
                    .await
                {
                    CommandResponse::Started
                } else {
                    CommandResponse::Rejected {
                        reason: "missing API key".into(),
                    }
                }
            }
            Command::SubtitlesGenerated { cues } => self.subtitles_generated(cues).await,
            Command::GoToPreviousSentence => match self.with_session(|d, s| d.go_to_previous(s)) {
                Some(Some(_)) => CommandResponse::Success,
                _ => CommandResponse::NoOp,
            },
            Command::Translate => {
                let Some(session) = &self.session else {
                    return CommandResponse::NoOp;
                };
                if self.dispatcher.translate_current(session).await {
                    CommandResponse::Started
                } else {
                    CommandResponse::NoOp
                }
            }
            Command::ShowVocabulary => {
                let Some(session) = &self.session else {
                    return CommandResponse::NoOp;
                };
                match self
                    .dispatcher
                    .show_vocabulary(session, &mut self.popup_timer)
                    .await
                {
                    Some(_) => CommandResponse::Started,
                    None => CommandResponse::NoOp,
                }
            }
            Command::SaveWord { word, translation } => {
                match self
                    .dispatcher
                    .save_word(self.session.as_ref(), &word, &translation)
                    .await
                {
                    Ok(()) => CommandResponse::Success,
                    Err(e) => CommandResponse::Error {
                        message: e.to_string(),
                    },
                }
            }
            Command::ExampleSentence { word } => {
                let Some(session) = &self.session else {
                    return CommandResponse::NoOp;
                };
                if self.dispatcher.example_sentence(session, &word).await {
                    CommandResponse::Started
                } else {
                    CommandResponse::NoOp
                }
            }
            Command::ToggleLoop { rate } => {
                let Some(session) = &self.session else {
                    return CommandResponse::NoOp;
                };
                match self
                    .dispatcher
                    .toggle_loop(session, &mut self.sentence_loop, rate)
                {
                    Ok(LoopToggle::Engaged { .. } | LoopToggle::Released) => {
                        CommandResponse::Success
                    }
                    Err(rejected) => CommandResponse::Rejected {
                        reason: rejected.to_string(),
                    },
                }
            }
            Command::SetPlaybackRate { rate } => {
                match self.with_session(|d, s| d.set_playback_rate(s, rate)) {
                    Some(Ok(())) => CommandResponse::Success,
                    Some(Err(e)) => CommandResponse::Rejected {
                        reason: e.to_string(),
                    },
                    None => CommandResponse::NoOp,
                }
            }
            Command::ClearSubtitles => {
                self.clear_subtitles();
                let Some(session) = &self.session else {
                    return CommandResponse::NoOp;
                };
                match self.persistence().clear_cues(&session.page_url).await {
                    Ok(()) => CommandResponse::Success,
                    Err(e) => CommandResponse::Error {
                        message: e.to_string(),
                    },
                }
            }
            Command::DismissPopup => {
                self.popup_timer.disarm();
                if let Some(session) = &self.session {
                    if let Some(popup) = session.display.open_popup_id() {
                        session.display.close_popup(popup);
                    }
                }
                CommandResponse::Success
            }
        }
    }

    fn with_session<T>(&self, f: impl FnOnce(&ActionDispatcher, &Session) -> T) -> Option<T> {
        self.session.as_ref().map(|s| f(&self.dispatcher, s))
    }

    async fn subtitles_generated(&mut self, cues: Vec<Cue>) -> CommandResponse {
        let cues = CueList::new(cues);
        if cues.is_empty() {
            self.clear_subtitles();
            tracing::info!("no subtitles found for this video");
            return CommandResponse::NoSubtitlesFound;
        }
        log_cue_issues(&cues);

        self.release_loop();
        let Some(session) = self.session.as_mut() else {
            return CommandResponse::NoOp;
        };
        session.cues = cues;
        self.sync.start(session);

        let Some(session) = &self.session else {
            return CommandResponse::NoOp;
        };
        if let Err(e) = self
            .persistence()
            .save_cues(&session.page_url, &session.cues)
            .await
        {
            tracing::warn!(error = %e, "failed to cache subtitles");
        }
        CommandResponse::Success
    }

    /// Ends an engaged loop and puts the player back to normal speed.
    fn release_loop(&mut self) {
        match &self.session {
            Some(session) if self.sentence_loop.is_engaged() => self.sentence_loop.release(session),
            _ => self.sentence_loop.stop(),
        }
    }

    fn clear_subtitles(&mut self) {
        self.sync.stop();
        self.release_loop();
        if let Some(session) = self.session.as_mut() {
            session.cues = CueList::default();
            self.sync.clear(session);
        }
        tracing::info!("subtitles cleared");
    }

    /// True while a discovery pass is scheduled.
    pub fn is_discovering(&self) -> bool {
        self.discovery.is_pending()
    }
}

fn log_cue_issues(cues: &CueList) {
    let issues = cues.validate();
    if !issues.is_empty() {
        tracing::warn!(count = issues.len(), first = ?issues[0], "malformed cue list, using it as-is");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        player::{PopupContent, VideoPlayer},
        service::ServiceError,
        settings::Settings,
        store::MemoryStore,
        testing::{FakeDisplay, FakeHost, FakePlayer, FakeService, PAGE_URL, attachment},
        vocabulary::VocabularyTerm,
    };

    struct Harness {
        player: Arc<FakePlayer>,
        display: Arc<FakeDisplay>,
        host: Arc<FakeHost>,
        service: Arc<FakeService>,
        persistence: Persistence,
    }

    impl Harness {
        async fn new(pause_action: PauseAction) -> Self {
            let player = FakePlayer::at(0);
            let display = FakeDisplay::new();
            let host = FakeHost::new(vec![Some(attachment(&player, &display))]);
            let persistence = Persistence::new(Arc::new(MemoryStore::new()));
            persistence
                .save_settings(&Settings {
                    api_key: Some("test-key".into()),
                    pause_action,
                    ..Settings::default()
                })
                .await
                .unwrap();
            Self {
                player,
                display,
                host,
                service: FakeService::new(),
                persistence,
            }
        }

        fn controller(&self) -> PageController {
            PageController::new(
                self.host.clone(),
                self.service.clone(),
                self.persistence.clone(),
            )
        }

        fn spawn(&self) -> (mpsc::Sender<PageEvent>, broadcast::Sender<()>) {
            let (events_tx, events_rx) = mpsc::channel(16);
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            tokio::spawn(self.controller().run(events_rx, shutdown_rx));
            (events_tx, shutdown_tx)
        }
    }

    fn cues() -> Vec<Cue> {
        vec![
            Cue::new(0, 1000, "Hello world"),
            Cue::new(1500, 2500, "Goodbye"),
            Cue::new(5000, 8000, "x"),
        ]
    }

    async fn send(events: &mpsc::Sender<PageEvent>, command: Command) -> CommandResponse {
        let (event, rx) = PageEvent::command(command);
        events.send(event).await.unwrap();
        rx.await.unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    #[test]
    fn discovery_backoff_doubles_up_to_cap() {
        assert_eq!(discovery_delay(0), Duration::from_millis(500));
        assert_eq!(discovery_delay(1), Duration::from_secs(1));
        assert_eq!(discovery_delay(2), Duration::from_secs(2));
        assert_eq!(discovery_delay(3), DISCOVERY_MAX_DELAY);
        assert_eq!(discovery_delay(30), DISCOVERY_MAX_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_gives_up_after_bounded_attempts() {
        let harness = Harness::new(PauseAction::None).await;
        let host = FakeHost::new(Vec::new());
        let (_events_tx, events_rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let controller = PageController::new(
            host.clone(),
            harness.service.clone(),
            harness.persistence.clone(),
        );
        tokio::spawn(controller.run(events_rx, shutdown_rx));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(host.calls(), MAX_DISCOVERY_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn attach_loads_cached_cues_and_starts_sync() {
        let harness = Harness::new(PauseAction::None).await;
        harness
            .persistence
            .save_cues("https://www.youtube.com/watch?v=abc123", &CueList::new(cues()))
            .await
            .unwrap();
        let mut controller = harness.controller();

        controller.discover_once().await;
        assert!(controller.is_syncing());
        assert_eq!(controller.session().unwrap().cues.len(), 3);
        assert_eq!(harness.display.original().as_deref(), Some("Hello world"));
    }

    #[tokio::test]
    async fn attach_without_cache_stays_idle() {
        let harness = Harness::new(PauseAction::None).await;
        let mut controller = harness.controller();
        controller.discover_once().await;
        assert!(controller.session().is_some());
        assert!(!controller.is_syncing());
    }

    #[tokio::test]
    async fn lost_player_tears_down_and_rediscovers() {
        let harness = Harness::new(PauseAction::None).await;
        let mut controller = harness.controller();
        controller.discover_once().await;
        controller
            .handle_command(Command::SubtitlesGenerated { cues: cues() })
            .await;
        harness.player.set_paused(true);
        harness.player.set_time(6000);
        controller
            .handle_command(Command::ToggleLoop { rate: 1.5 })
            .await;
        assert!(controller.is_looping());

        harness.player.disconnect();
        controller.on_sync_tick();
        assert!(controller.session().is_none());
        assert!(!controller.is_syncing());
        assert!(!controller.is_looping());
        assert!(controller.is_discovering());

        let player = FakePlayer::at(0);
        harness.host.push(Some(attachment(&player, &harness.display)));
        controller.discover_once().await;
        assert!(controller.session().is_some());
        assert!(controller.is_syncing(), "cached cues reloaded on reattach");
    }

    #[tokio::test]
    async fn generated_subtitles_are_cached_and_shown() {
        let harness = Harness::new(PauseAction::None).await;
        let mut controller = harness.controller();
        controller.discover_once().await;

        let response = controller
            .handle_command(Command::SubtitlesGenerated { cues: cues() })
            .await;
        assert_eq!(response, CommandResponse::Success);
        assert!(controller.is_syncing());
        assert_eq!(
            harness.persistence.load_cues(PAGE_URL).await,
            Some(CueList::new(cues()))
        );

        let response = controller
            .handle_command(Command::SubtitlesGenerated { cues: Vec::new() })
            .await;
        assert_eq!(response, CommandResponse::NoSubtitlesFound);
        assert!(!controller.is_syncing());
        assert!(!harness.display.visible());
    }

    #[tokio::test]
    async fn commands_without_video_are_errors() {
        let harness = Harness::new(PauseAction::None).await;
        let mut controller = harness.controller();
        assert!(matches!(
            controller.handle_command(Command::Translate).await,
            CommandResponse::Error { .. }
        ));
    }

    #[tokio::test]
    async fn clear_subtitles_discards_cache() {
        let harness = Harness::new(PauseAction::None).await;
        let mut controller = harness.controller();
        controller.discover_once().await;
        controller
            .handle_command(Command::SubtitlesGenerated { cues: cues() })
            .await;

        let response = controller.handle_command(Command::ClearSubtitles).await;
        assert_eq!(response, CommandResponse::Success);
        assert!(harness.persistence.load_cues(PAGE_URL).await.is_none());
        assert!(controller.session().unwrap().cues.is_empty());
        assert!(!harness.display.visible());
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_subtitles_releases_loop_rate() {
        let harness = Harness::new(PauseAction::None).await;
        let mut controller = harness.controller();
        controller.discover_once().await;
        controller
            .handle_command(Command::SubtitlesGenerated { cues: cues() })
            .await;
        harness.player.set_time(6000);
        harness.player.set_paused(true);
        controller
            .handle_command(Command::ToggleLoop { rate: 1.5 })
            .await;
        assert!(controller.is_looping());

        controller.handle_command(Command::ClearSubtitles).await;
        assert!(!controller.is_looping());
        assert_eq!(harness.player.playback_rate(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_subtitles_release_loop_rate() {
        let harness = Harness::new(PauseAction::None).await;
        let mut controller = harness.controller();
        controller.discover_once().await;
        controller
            .handle_command(Command::SubtitlesGenerated { cues: cues() })
            .await;
        harness.player.set_time(6000);
        harness.player.set_paused(true);
        controller
            .handle_command(Command::ToggleLoop { rate: 0.75 })
            .await;

        controller
            .handle_command(Command::SubtitlesGenerated { cues: cues() })
            .await;
        assert!(!controller.is_looping());
        assert_eq!(harness.player.playback_rate(), 1.0);

        // The next toggle engages a fresh loop instead of releasing a stale one.
        let response = controller
            .handle_command(Command::ToggleLoop { rate: 1.5 })
            .await;
        assert_eq!(response, CommandResponse::Success);
        assert!(controller.is_looping());
        assert_eq!(harness.player.playback_rate(), 1.5);
    }

    #[tokio::test(start_paused = true)]
    async fn generate_subtitles_round_trip_through_service() {
        let harness = Harness::new(PauseAction::None).await;
        *harness.service.subtitles.lock().unwrap() = Ok(cues());
        let (events, _shutdown) = harness.spawn();
        settle().await;

        let response = send(&events, Command::GenerateSubtitles { api_key: None }).await;
        assert_eq!(response, CommandResponse::Started);
        settle().await;

        assert_eq!(harness.service.requests(), vec![format!("subtitles:{PAGE_URL}")]);
        assert_eq!(
            harness.persistence.load_cues(PAGE_URL).await,
            Some(CueList::new(cues()))
        );
        assert_eq!(harness.display.original().as_deref(), Some("Hello world"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_generation_shows_message() {
        let harness = Harness::new(PauseAction::None).await;
        *harness.service.subtitles.lock().unwrap() = Err(ServiceError::InvalidCredential);
        let (events, _shutdown) = harness.spawn();
        settle().await;

        send(&events, Command::GenerateSubtitles { api_key: None }).await;
        settle().await;
        assert_eq!(
            harness.display.message().as_deref(),
            Some(crate::dispatcher::INVALID_CREDENTIAL_TEXT)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poll_follows_playback_clock() {
        let harness = Harness::new(PauseAction::None).await;
        let (events, _shutdown) = harness.spawn();
        settle().await;
        send(&events, Command::SubtitlesGenerated { cues: cues() }).await;

        harness.player.set_time(1800);
        settle().await;
        assert_eq!(harness.display.original().as_deref(), Some("Goodbye"));

        harness.player.set_time(3000);
        settle().await;
        assert!(!harness.display.visible());
        assert_eq!(harness.display.original_writes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_translates_and_play_restores() {
        let harness = Harness::new(PauseAction::Translate).await;
        *harness.service.translation.lock().unwrap() = Ok("你好世界".into());
        let (events, _shutdown) = harness.spawn();
        settle().await;
        send(&events, Command::SubtitlesGenerated { cues: cues() }).await;

        harness.player.set_time(400);
        harness.player.set_paused(true);
        events.send(PageEvent::Player(PlayerEvent::Pause)).await.unwrap();
        settle().await;
        assert_eq!(harness.display.translation().as_deref(), Some("你好世界"));
        assert_eq!(harness.display.original().as_deref(), Some("Hello world"));

        harness.player.set_paused(false);
        events.send(PageEvent::Player(PlayerEvent::Play)).await.unwrap();
        settle().await;
        assert!(harness.display.translation().is_none());
        assert_eq!(harness.display.original().as_deref(), Some("Hello world"));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_can_open_vocabulary_which_expires() {
        let harness = Harness::new(PauseAction::Vocabulary).await;
        *harness.service.vocabulary.lock().unwrap() = Ok(vec![VocabularyTerm {
            word: "world".into(),
            translation: "世界".into(),
        }]);
        let (events, _shutdown) = harness.spawn();
        settle().await;
        send(&events, Command::SubtitlesGenerated { cues: cues() }).await;

        harness.player.set_paused(true);
        events.send(PageEvent::Player(PlayerEvent::Pause)).await.unwrap();
        settle().await;
        assert!(matches!(
            harness.display.popup(),
            Some(PopupContent::Vocabulary { .. })
        ));

        tokio::time::sleep(crate::dispatcher::VOCABULARY_POPUP_TTL).await;
        assert!(harness.display.popup().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sentence_loop_scenario() {
        let harness = Harness::new(PauseAction::None).await;
        let (events, _shutdown) = harness.spawn();
        settle().await;
        send(&events, Command::SubtitlesGenerated { cues: cues() }).await;

        harness.player.set_time(6100);
        let response = send(&events, Command::ToggleLoop { rate: 1.5 }).await;
        assert!(matches!(response, CommandResponse::Rejected { .. }));

        harness.player.set_paused(true);
        let response = send(&events, Command::ToggleLoop { rate: 1.5 }).await;
        assert_eq!(response, CommandResponse::Success);
        assert_eq!(harness.player.current_time_ms(), 5000);
        assert_eq!(harness.player.playback_rate(), 1.5);

        harness.player.set_paused(false);
        for _ in 0..3 {
            harness.player.set_time(8000);
            tokio::time::sleep(Duration::from_millis(60)).await;
            assert_eq!(harness.player.current_time_ms(), 5000);
        }

        let response = send(&events, Command::ToggleLoop { rate: 1.5 }).await;
        assert_eq!(response, CommandResponse::Success);
        assert_eq!(harness.player.playback_rate(), 1.0);
        harness.player.set_time(8000);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(harness.player.current_time_ms(), 8000);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_stops_loop_and_sync() {
        let harness = Harness::new(PauseAction::None).await;
        let (events, _shutdown) = harness.spawn();
        settle().await;
        send(&events, Command::SubtitlesGenerated { cues: cues() }).await;
        harness.player.set_time(6000);
        harness.player.set_paused(true);
        send(&events, Command::ToggleLoop { rate: 1.5 }).await;

        events
            .send(PageEvent::Navigated {
                url: "https://www.youtube.com/watch?v=other".into(),
            })
            .await
            .unwrap();
        settle().await;

        // The old player is no longer clamped or polled.
        harness.player.set_time(8000);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(harness.player.current_time_ms(), 8000);
        assert!(!harness.display.visible());
        assert_eq!(harness.host.calls(), 2);
    }
}
