use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A timed subtitle entry. Offsets are milliseconds from the start of the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub start_time: u64,
    pub end_time: u64,
    pub text: String,
}

impl Cue {
    pub fn new(start_time: u64, end_time: u64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
        }
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, time_ms: u64) -> bool {
        time_ms >= self.start_time && time_ms <= self.end_time
    }
}

/// Problems found by [`CueList::validate`]. Reported, never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueIssue {
    EmptyInterval { index: usize },
    OutOfOrder { index: usize },
    Overlap { index: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CueList(Vec<Cue>);

impl CueList {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self(cues)
    }

    pub fn as_slice(&self) -> &[Cue] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.0.iter()
    }

    pub fn duration_ms(&self) -> u64 {
        self.0.iter().map(|c| c.end_time).max().unwrap_or(0)
    }

    pub fn validate(&self) -> Vec<CueIssue> {
        let mut issues = Vec::new();
        for (index, cue) in self.0.iter().enumerate() {
            if cue.start_time >= cue.end_time {
                issues.push(CueIssue::EmptyInterval { index });
            }
            if index == 0 {
                continue;
            }
            let prev = &self.0[index - 1];
            if cue.start_time < prev.start_time {
                issues.push(CueIssue::OutOfOrder { index });
            } else if cue.start_time < prev.end_time {
                issues.push(CueIssue::Overlap { index });
            }
        }
        issues
    }
}

impl From<Vec<Cue>> for CueList {
    fn from(cues: Vec<Cue>) -> Self {
        Self(cues)
    }
}

impl<'a> IntoIterator for &'a CueList {
    type Item = &'a Cue;
    type IntoIter = std::slice::Iter<'a, Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Lower-cased word or phrase -> saved translation.
pub type SavedWords = BTreeMap<String, String>;

/// A cue together with its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCue {
    pub index: usize,
    pub cue: Cue,
}

/// Snapshot of the player, derived on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub time_ms: u64,
    pub paused: bool,
    pub active: Option<ActiveCue>,
}
