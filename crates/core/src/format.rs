use crate::types::{Cue, CueList};

/// Format milliseconds as MM:SS.mmm
pub fn format_timestamp(ms: u64) -> String {
    let mins = ms / 60_000;
    let secs = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}.{:03}", mins, secs, millis)
}

pub fn format_cue(cue: &Cue) -> String {
    format!(
        "[{}-{}] {}",
        format_timestamp(cue.start_time),
        format_timestamp(cue.end_time),
        cue.text.trim()
    )
}

/// One line per cue, with timestamps
pub fn format_cue_list(cues: &CueList) -> String {
    cues.iter().map(format_cue).collect::<Vec<_>>().join("\n")
}
