//! Resolve playback time against a cue list.
//!
//! Both lookups are linear scans. Malformed lists (overlapping or unsorted)
//! are tolerated: the first cue in list order that satisfies the predicate wins.

use crate::types::{ActiveCue, Cue};

/// The first cue whose `[start_time, end_time]` contains `time_ms`.
pub fn find_active_cue(cues: &[Cue], time_ms: u64) -> Option<ActiveCue> {
    cues.iter()
        .position(|cue| cue.contains(time_ms))
        .map(|index| ActiveCue {
            index,
            cue: cues[index].clone(),
        })
}

/// Scanning from the end, the first cue that ended strictly before `time_ms`.
pub fn find_previous_cue(cues: &[Cue], time_ms: u64) -> Option<ActiveCue> {
    cues.iter()
        .rposition(|cue| cue.end_time < time_ms)
        .map(|index| ActiveCue {
            index,
            cue: cues[index].clone(),
        })
}
