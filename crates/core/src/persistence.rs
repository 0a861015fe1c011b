use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Map;

use crate::{
    settings::{SETTINGS_KEY, Settings},
    store::{KeyValueStore, StoreError},
    types::{CueList, SavedWords},
    video_url::normalize_video_url,
};

pub const SAVED_WORDS_KEY: &str = "savedWords";

/// Typed access to the cue cache, saved words and settings.
///
/// Reads are best-effort: a failing or corrupt store is logged and reads as absent.
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_strict(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "storage read failed");
                None
            }
        }
    }

    /// Like `read`, but a failing store or a value of the wrong shape is an error.
    async fn read_strict<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut found = self.store.get(&[key]).await?;
        let Some(value) = found.remove(key).filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: key.into(),
                source,
            })
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Corrupt {
            path: key.into(),
            source,
        })?;
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        self.store.set(items).await
    }

    /// `url` may be a raw page URL; it is normalized before lookup.
    pub async fn load_cues(&self, url: &str) -> Option<CueList> {
        let key = normalize_video_url(url);
        let cues: Option<CueList> = self.read(&key).await;
        match &cues {
            Some(cues) => tracing::info!(url = %key, count = cues.len(), "found cached subtitles"),
            None => tracing::info!(url = %key, "no cached subtitles"),
        }
        cues
    }

    pub async fn save_cues(&self, url: &str, cues: &CueList) -> Result<(), StoreError> {
        let key = normalize_video_url(url);
        self.write(&key, cues).await?;
        tracing::info!(url = %key, count = cues.len(), "subtitles cached");
        Ok(())
    }

    pub async fn clear_cues(&self, url: &str) -> Result<(), StoreError> {
        let key = normalize_video_url(url);
        self.store.remove(&[key.as_str()]).await
    }

    pub async fn get_saved_words(&self) -> SavedWords {
        self.read(SAVED_WORDS_KEY).await.unwrap_or_default()
    }

    /// The key is lower-cased; a later save of the same word overwrites.
    ///
    /// Fails without writing when the existing words can't be read.
    pub async fn save_word(&self, word: &str, translation: &str) -> Result<(), StoreError> {
        let mut words: SavedWords = self.read_strict(SAVED_WORDS_KEY).await?.unwrap_or_default();
        words.insert(word.trim().to_lowercase(), translation.trim().to_string());
        self.write(SAVED_WORDS_KEY, &words).await
    }

    pub async fn lookup_word(&self, word: &str) -> Option<String> {
        self.get_saved_words()
            .await
            .remove(&word.trim().to_lowercase())
    }

    pub async fn load_settings(&self) -> Settings {
        self.read(SETTINGS_KEY).await.unwrap_or_default()
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.write(SETTINGS_KEY, settings).await
    }
}
