//! User commands that act on the current position: previous sentence,
//! translation, vocabulary, loop and playback speed.
//!
//! Calls to the text service run as spawned tasks and report back through
//! a channel as [`ServiceReply`], so the controller loop never waits on
//! the network.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time::Instant};

use crate::{
    error::LinguaError,
    persistence::Persistence,
    player::{PopupContent, PopupId},
    provider::{EnvLookup, ProviderError, process_env},
    sentence_loop::{LoopRejected, LoopToggle, SentenceLoop},
    service::{Credential, ServiceError, TextService, TranslationRequest, VocabularyRequest},
    session::Session,
    settings::Settings,
    store::StoreError,
    timeline::find_previous_cue,
    types::{ActiveCue, Cue},
    vocabulary::{VocabularyEntry, VocabularyTerm, annotate, highlight_spans},
};

pub const PLAYBACK_RATES: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];
pub const VOCABULARY_POPUP_TTL: Duration = Duration::from_secs(15);

pub const MISSING_CREDENTIAL_TEXT: &str = "Set an API key in settings first";
pub const UNAVAILABLE_TEXT: &str = "Translation service unavailable";
pub const FAILED_TEXT: &str = "Translation failed";
pub const INVALID_CREDENTIAL_TEXT: &str = "Invalid API key, check settings";

pub fn error_text(error: &ServiceError) -> &'static str {
    match error {
        ServiceError::Unavailable(_) => UNAVAILABLE_TEXT,
        ServiceError::InvalidCredential => INVALID_CREDENTIAL_TEXT,
        ServiceError::RequestFailed(_) | ServiceError::InvalidResponse(_) => FAILED_TEXT,
    }
}

pub fn validate_rate(rate: f64) -> Result<f64, LinguaError> {
    if PLAYBACK_RATES.contains(&rate) {
        Ok(rate)
    } else {
        Err(LinguaError::UnsupportedRate { rate })
    }
}

#[derive(Debug)]
pub enum ServiceReply {
    Translation {
        cue_index: usize,
        result: Result<String, ServiceError>,
    },
    Vocabulary {
        popup: PopupId,
        sentence: String,
        result: Result<Vec<VocabularyTerm>, ServiceError>,
    },
    ExampleSentence {
        word: String,
        result: Result<String, ServiceError>,
    },
    Subtitles {
        page_url: String,
        result: Result<Vec<Cue>, ServiceError>,
    },
}

/// Auto-close deadline for the open popup.
#[derive(Debug, Default)]
pub struct PopupTimer {
    deadline: Option<(PopupId, Instant)>,
}

impl PopupTimer {
    pub fn arm(&mut self, popup: PopupId, ttl: Duration) {
        self.deadline = Some((popup, Instant::now() + ttl));
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn armed_for(&self) -> Option<PopupId> {
        self.deadline.map(|(id, _)| id)
    }

    /// Completes at the deadline; pends forever when disarmed.
    pub async fn expired(&self) -> PopupId {
        match self.deadline {
            Some((id, at)) => {
                tokio::time::sleep_until(at).await;
                id
            }
            None => std::future::pending().await,
        }
    }
}

struct OpenVocabulary {
    popup: PopupId,
    sentence: String,
    entries: Vec<VocabularyEntry>,
}

pub struct ActionDispatcher {
    service: Arc<dyn TextService>,
    persistence: Persistence,
    replies: mpsc::UnboundedSender<ServiceReply>,
    vocabulary: Option<OpenVocabulary>,
    env: EnvLookup,
}

impl ActionDispatcher {
    pub fn new(
        service: Arc<dyn TextService>,
        persistence: Persistence,
    ) -> (Self, mpsc::UnboundedReceiver<ServiceReply>) {
        let (replies, replies_rx) = mpsc::unbounded_channel();
        (
            Self {
                service,
                persistence,
                replies,
                vocabulary: None,
                env: process_env,
            },
            replies_rx,
        )
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Where credentials not stored in settings are looked up.
    pub fn set_env_lookup(&mut self, env: EnvLookup) {
        self.env = env;
    }

    async fn credential(
        &self,
        api_key: Option<&str>,
    ) -> (Settings, Result<Credential, ProviderError>) {
        let settings = self.persistence.load_settings().await;
        let credential = settings
            .provider
            .resolve_api_key_with(api_key.or(settings.api_key.as_deref()), self.env)
            .map(|api_key| Credential {
                provider: settings.provider,
                api_key,
            });
        (settings, credential)
    }

    /// Seeks to the start of the last cue that ended before the current position.
    pub fn go_to_previous(&self, session: &Session) -> Option<ActiveCue> {
        let now = session.player.current_time_ms();
        let Some(previous) = find_previous_cue(session.cues.as_slice(), now) else {
            tracing::info!(time_ms = now, "no previous sentence");
            return None;
        };
        session.player.set_current_time_ms(previous.cue.start_time);
        tracing::info!(
            start_ms = previous.cue.start_time,
            text = %previous.cue.text,
            "jumped to previous sentence"
        );
        Some(previous)
    }

    /// Returns true when a translation request was issued.
    pub async fn translate_current(&self, session: &Session) -> bool {
        let Some(active) = session.active_cue() else {
            tracing::debug!("nothing to translate at this position");
            return false;
        };
        let (settings, credential) = self.credential(None).await;
        let credential = match credential {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "translation skipped");
                session.display.show_translation(MISSING_CREDENTIAL_TEXT);
                return false;
            }
        };

        tracing::info!(
            time_ms = session.player.current_time_ms(),
            text = %active.cue.text,
            "translating"
        );
        let request = TranslationRequest {
            text: active.cue.text,
            target_language: settings.target_language,
            level: settings.level,
        };
        let service = Arc::clone(&self.service);
        let replies = self.replies.clone();
        let cue_index = active.index;
        tokio::spawn(async move {
            let result = service.translate(&credential, &request).await;
            let _ = replies.send(ServiceReply::Translation { cue_index, result });
        });
        true
    }

    /// Opens the vocabulary popup for the active cue, replacing any open popup.
    pub async fn show_vocabulary(
        &mut self,
        session: &Session,
        timer: &mut PopupTimer,
    ) -> Option<PopupId> {
        let Some(active) = session.active_cue() else {
            tracing::debug!("no sentence for vocabulary at this position");
            return None;
        };
        let (settings, credential) = self.credential(None).await;
        let credential = match credential {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "vocabulary skipped");
                session.display.show_message(MISSING_CREDENTIAL_TEXT);
                return None;
            }
        };

        if let Some(previous) = session.display.open_popup_id() {
            session.display.close_popup(previous);
        }
        let sentence = active.cue.text;
        let popup = session.display.open_popup(PopupContent::Loading {
            sentence: sentence.clone(),
        });
        timer.arm(popup, VOCABULARY_POPUP_TTL);
        self.vocabulary = None;

        let request = VocabularyRequest {
            text: sentence.clone(),
            target_language: settings.target_language,
            level: settings.level,
        };
        let service = Arc::clone(&self.service);
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let result = service.extract_vocabulary(&credential, &request).await;
            let _ = replies.send(ServiceReply::Vocabulary {
                popup,
                sentence,
                result,
            });
        });
        Some(popup)
    }

    /// Persists a term and flips it to "saved" in the open vocabulary popup.
    pub async fn save_word(
        &mut self,
        session: Option<&Session>,
        word: &str,
        translation: &str,
    ) -> Result<(), StoreError> {
        self.persistence.save_word(word, translation).await?;
        tracing::info!(word, "word saved");

        let (Some(session), Some(open)) = (session, self.vocabulary.as_mut()) else {
            return Ok(());
        };
        let key = word.trim().to_lowercase();
        let mut changed = false;
        for entry in open.entries.iter_mut() {
            if entry.word.to_lowercase() == key && !entry.saved {
                entry.saved = true;
                changed = true;
            }
        }
        if changed {
            session
                .display
                .update_popup(open.popup, vocabulary_content(&open.sentence, &open.entries));
        }
        Ok(())
    }

    pub async fn example_sentence(&self, session: &Session, word: &str) -> bool {
        let (settings, credential) = self.credential(None).await;
        let credential = match credential {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "example sentence skipped");
                session.display.show_message(MISSING_CREDENTIAL_TEXT);
                return false;
            }
        };
        let service = Arc::clone(&self.service);
        let replies = self.replies.clone();
        let word = word.to_string();
        tokio::spawn(async move {
            let result = service
                .generate_example_sentence(&credential, &word, settings.level)
                .await;
            let _ = replies.send(ServiceReply::ExampleSentence { word, result });
        });
        true
    }

    pub async fn generate_subtitles(&self, session: &Session, api_key: Option<&str>) -> bool {
        let (_, credential) = self.credential(api_key).await;
        let credential = match credential {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "subtitle generation skipped");
                session.display.show_message(MISSING_CREDENTIAL_TEXT);
                return false;
            }
        };
        let service = Arc::clone(&self.service);
        let replies = self.replies.clone();
        let page_url = session.page_url.clone();
        tracing::info!(url = %page_url, "requesting subtitles");
        tokio::spawn(async move {
            let result = service.generate_subtitles(&credential, &page_url).await;
            let _ = replies.send(ServiceReply::Subtitles { page_url, result });
        });
        true
    }

    pub fn set_playback_rate(&self, session: &Session, rate: f64) -> Result<(), LinguaError> {
        let rate = validate_rate(rate)?;
        session.player.set_playback_rate(rate);
        tracing::info!(rate, "playback rate changed");
        Ok(())
    }

    /// Rejections are shown to the user as well as returned.
    pub fn toggle_loop(
        &self,
        session: &Session,
        sentence_loop: &mut SentenceLoop,
        rate: f64,
    ) -> Result<LoopToggle, LoopRejected> {
        let rate = validate_rate(rate).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to normal loop rate");
            1.0
        });
        let toggled = sentence_loop.toggle(session, rate);
        if let Err(rejected) = &toggled {
            session.display.show_message(&rejected.to_string());
        }
        toggled
    }

    /// Forget the vocabulary popup state, for teardown.
    pub fn reset(&mut self) {
        self.vocabulary = None;
    }

    /// Renders a finished service call. `Subtitles` replies are the controller's.
    pub async fn apply_reply(&mut self, reply: ServiceReply, session: Option<&Session>) {
        let Some(session) = session else {
            tracing::debug!("dropping service reply for a detached session");
            return;
        };

        match reply {
            ServiceReply::Translation { cue_index, result } => {
                if session.active_cue().map(|a| a.index) != Some(cue_index) {
                    tracing::debug!(cue_index, "dropping translation for a cue no longer shown");
                    return;
                }
                match result {
                    Ok(translation) => {
                        tracing::info!(%translation, "translation completed");
                        session.display.show_translation(&translation);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "translation failed");
                        session.display.show_translation(error_text(&e));
                    }
                }
            }
            ServiceReply::Vocabulary {
                popup,
                sentence,
                result,
            } => {
                if !session.display.popup_exists(popup) {
                    tracing::debug!(%popup, "vocabulary popup closed before reply");
                    return;
                }
                match result {
                    Ok(terms) => {
                        let saved = self.persistence.get_saved_words().await;
                        let entries = annotate(&terms, &saved);
                        session
                            .display
                            .update_popup(popup, vocabulary_content(&sentence, &entries));
                        self.vocabulary = Some(OpenVocabulary {
                            popup,
                            sentence,
                            entries,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "vocabulary extraction failed");
                        session.display.update_popup(
                            popup,
                            PopupContent::Failed {
                                message: error_text(&e).to_string(),
                            },
                        );
                    }
                }
            }
            ServiceReply::ExampleSentence { word, result } => match result {
                Ok(sentence) => session.display.show_message(&format!("{word}: {sentence}")),
                Err(e) => {
                    tracing::warn!(%word, error = %e, "example sentence failed");
                    session.display.show_message(error_text(&e));
                }
            },
            ServiceReply::Subtitles { page_url, .. } => {
                tracing::debug!(url = %page_url, "subtitle reply routed to dispatcher, ignoring");
            }
        }
    }
}

fn vocabulary_content(sentence: &str, entries: &[VocabularyEntry]) -> PopupContent {
    PopupContent::Vocabulary {
        sentence: sentence.to_string(),
        highlights: highlight_spans(sentence, entries),
        entries: entries.to_vec(),
    }
}
