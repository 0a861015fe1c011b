use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::types::SavedWords;

/// Upper bound on terms extracted per sentence.
pub const MAX_VOCABULARY_TERMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    pub word: String,
    pub translation: String,
}

/// A term as shown to the user, marked against the saved-word mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub word: String,
    pub translation: String,
    pub saved: bool,
}

/// Byte range of a highlighted term within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub saved: bool,
}

/// Parse `word - translation` lines. Blank or word-less lines are skipped.
pub fn parse_vocabulary(raw: &str) -> Vec<VocabularyTerm> {
    raw.lines()
        .map(|line| line.trim().trim_start_matches(['*', '•']).trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (word, translation) = line
                .split_once(" - ")
                .or_else(|| line.split_once('-'))
                .unwrap_or((line, ""));
            let word = word.trim();
            if word.is_empty() {
                return None;
            }
            Some(VocabularyTerm {
                word: word.to_string(),
                translation: translation.trim().to_string(),
            })
        })
        .take(MAX_VOCABULARY_TERMS)
        .collect()
}

pub fn annotate(terms: &[VocabularyTerm], saved: &SavedWords) -> Vec<VocabularyEntry> {
    terms
        .iter()
        .map(|t| VocabularyEntry {
            word: t.word.clone(),
            translation: t.translation.clone(),
            saved: saved.contains_key(&t.word.to_lowercase()),
        })
        .collect()
}

/// Case-insensitive whole-word occurrences of each entry in `text`.
///
/// Terms are matched literally. A term that does not appear in the text
/// (for example because the model paraphrased it) yields no span. Where
/// occurrences overlap, the earlier entry keeps its span.
pub fn highlight_spans(text: &str, entries: &[VocabularyEntry]) -> Vec<HighlightSpan> {
    let mut spans: Vec<HighlightSpan> = Vec::new();
    for entry in entries {
        let pattern = format!(r"\b{}\b", regex::escape(&entry.word));
        let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
            continue;
        };
        for m in re.find_iter(text) {
            let overlaps = spans.iter().any(|s| m.start() < s.end && s.start < m.end());
            if !overlaps {
                spans.push(HighlightSpan {
                    start: m.start(),
                    end: m.end(),
                    saved: entry.saved,
                });
            }
        }
    }
    spans.sort_by_key(|s| s.start);
    spans
}
