//! A terminal stand-in for the browser page: a virtual player driven by a
//! wall clock, and an overlay that prints to stdout.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use async_trait::async_trait;
use console::style;
use lingualoop_core::{
    Attachment, Command, PageHost, PopupContent, PopupId, SubtitleDisplay, VideoPlayer,
    format_timestamp, vocabulary::VocabularyEntry,
};

struct Clock {
    base_ms: u64,
    resumed_at: Option<Instant>,
    rate: f64,
    duration_ms: u64,
}

impl Clock {
    fn now_ms(&self) -> u64 {
        let elapsed = self
            .resumed_at
            .map(|at| (at.elapsed().as_secs_f64() * 1000.0 * self.rate) as u64)
            .unwrap_or(0);
        (self.base_ms + elapsed).min(self.duration_ms)
    }

    fn rebase(&mut self) {
        self.base_ms = self.now_ms();
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }
}

/// Plays a video of `duration_ms` on the wall clock.
pub struct VirtualPlayer {
    clock: Mutex<Clock>,
}

impl VirtualPlayer {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            clock: Mutex::new(Clock {
                base_ms: 0,
                resumed_at: None,
                rate: 1.0,
                duration_ms,
            }),
        }
    }

    pub fn play(&self) {
        let mut clock = self.clock.lock().expect("VirtualPlayer poisoned");
        if clock.resumed_at.is_none() {
            clock.resumed_at = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut clock = self.clock.lock().expect("VirtualPlayer poisoned");
        clock.base_ms = clock.now_ms();
        clock.resumed_at = None;
    }

    /// Grow the timeline once subtitles arrive for a video that had none.
    pub fn extend_to(&self, duration_ms: u64) {
        let mut clock = self.clock.lock().expect("VirtualPlayer poisoned");
        clock.rebase();
        clock.duration_ms = clock.duration_ms.max(duration_ms);
    }
}

impl VideoPlayer for VirtualPlayer {
    fn current_time_ms(&self) -> u64 {
        self.clock.lock().expect("VirtualPlayer poisoned").now_ms()
    }

    fn set_current_time_ms(&self, time_ms: u64) {
        let mut clock = self.clock.lock().expect("VirtualPlayer poisoned");
        clock.base_ms = time_ms.min(clock.duration_ms);
        if clock.resumed_at.is_some() {
            clock.resumed_at = Some(Instant::now());
        }
    }

    fn paused(&self) -> bool {
        self.clock
            .lock()
            .expect("VirtualPlayer poisoned")
            .resumed_at
            .is_none()
    }

    fn playback_rate(&self) -> f64 {
        self.clock.lock().expect("VirtualPlayer poisoned").rate
    }

    fn set_playback_rate(&self, rate: f64) {
        let mut clock = self.clock.lock().expect("VirtualPlayer poisoned");
        clock.rebase();
        clock.rate = rate;
    }

    fn is_connected(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct Overlay {
    popup: Option<PopupId>,
    entries: Vec<VocabularyEntry>,
    translation_shown: bool,
}

/// Prints each overlay change as a line.
#[derive(Default)]
pub struct TerminalDisplay {
    overlay: Mutex<Overlay>,
}

impl TerminalDisplay {
    /// Term `n` (1-based) of the open vocabulary popup.
    pub fn vocabulary_entry(&self, n: usize) -> Option<VocabularyEntry> {
        let overlay = self.overlay.lock().expect("TerminalDisplay poisoned");
        overlay.popup?;
        n.checked_sub(1).and_then(|i| overlay.entries.get(i).cloned())
    }

    fn render_popup(&self, id: PopupId, content: &PopupContent) {
        let mut overlay = self.overlay.lock().expect("TerminalDisplay poisoned");
        overlay.popup = Some(id);
        overlay.entries.clear();
        match content {
            PopupContent::Loading { sentence } => {
                println!("{} \"{}\"", style("Analyzing vocabulary...").dim(), sentence);
            }
            PopupContent::Vocabulary {
                sentence,
                highlights,
                entries,
            } => {
                println!("{}", highlight(sentence, highlights));
                for (i, entry) in entries.iter().enumerate() {
                    let status = if entry.saved {
                        style("saved".to_string()).yellow()
                    } else {
                        style(format!("s {}", i + 1)).green()
                    };
                    println!(
                        "  {:>2}. {} - {}  [{}]",
                        i + 1,
                        entry.word,
                        style(&entry.translation).green(),
                        status
                    );
                }
                overlay.entries = entries.clone();
            }
            PopupContent::Failed { message } => {
                println!("{} {}", style("Vocabulary failed:").red().bold(), message);
            }
        }
    }
}

fn highlight(sentence: &str, spans: &[lingualoop_core::vocabulary::HighlightSpan]) -> String {
    let mut out = String::new();
    let mut cursor = 0;
    for span in spans {
        out.push_str(&sentence[cursor..span.start]);
        let word = &sentence[span.start..span.end];
        let styled = if span.saved {
            style(word).yellow().underlined()
        } else {
            style(word).green().underlined()
        };
        out.push_str(&styled.to_string());
        cursor = span.end;
    }
    out.push_str(&sentence[cursor..]);
    out
}

impl SubtitleDisplay for TerminalDisplay {
    fn show_original(&self, text: &str) {
        println!("{} {}", style("▌").cyan(), style(text).bold());
    }

    fn show_translation(&self, text: &str) {
        self.overlay
            .lock()
            .expect("TerminalDisplay poisoned")
            .translation_shown = true;
        println!("{} {}", style("▌").magenta(), style(text).magenta());
    }

    fn clear_translation(&self) {
        let mut overlay = self.overlay.lock().expect("TerminalDisplay poisoned");
        if std::mem::take(&mut overlay.translation_shown) {
            println!("{}", style("▌").magenta().dim());
        }
    }

    fn hide(&self) {
        self.overlay
            .lock()
            .expect("TerminalDisplay poisoned")
            .translation_shown = false;
        println!("{}", style("▌ ···").dim());
    }

    fn show_message(&self, text: &str) {
        println!("{} {}", style("ℹ").blue(), text);
    }

    fn open_popup(&self, content: PopupContent) -> PopupId {
        let id = PopupId::new();
        self.render_popup(id, &content);
        id
    }

    fn update_popup(&self, id: PopupId, content: PopupContent) -> bool {
        if !self.popup_exists(id) {
            return false;
        }
        self.render_popup(id, &content);
        true
    }

    fn close_popup(&self, id: PopupId) {
        let mut overlay = self.overlay.lock().expect("TerminalDisplay poisoned");
        if overlay.popup == Some(id) {
            overlay.popup = None;
            overlay.entries.clear();
        }
    }

    fn open_popup_id(&self) -> Option<PopupId> {
        self.overlay.lock().expect("TerminalDisplay poisoned").popup
    }
}

/// Always finds the same player and display.
pub struct TerminalHost {
    attachment: Attachment,
}

impl TerminalHost {
    pub fn new(
        player: Arc<VirtualPlayer>,
        display: Arc<TerminalDisplay>,
        page_url: String,
    ) -> Self {
        Self {
            attachment: Attachment {
                player,
                display,
                page_url,
            },
        }
    }
}

#[async_trait]
impl PageHost for TerminalHost {
    async fn discover(&self) -> Option<Attachment> {
        Some(self.attachment.clone())
    }
}

/// A line typed while watching.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    TogglePlay,
    Seek { secs: f64 },
    Save { n: usize },
    Status,
    Help,
    Quit,
    Send(Command),
    Invalid(String),
}

pub fn parse_input(line: &str) -> Option<Input> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return line.starts_with(' ').then_some(Input::TogglePlay);
    };
    let arg = parts.next();
    let rest = parts.collect::<Vec<_>>();

    let number = |arg: Option<&str>| arg.and_then(|a| a.parse::<f64>().ok());

    let input = match head {
        "p" | "play" | "pause" => Input::TogglePlay,
        "b" | "back" => Input::Send(Command::GoToPreviousSentence),
        "t" | "translate" => Input::Send(Command::Translate),
        "v" | "vocab" => Input::Send(Command::ShowVocabulary),
        "x" | "close" => Input::Send(Command::DismissPopup),
        "g" | "generate" => Input::Send(Command::GenerateSubtitles { api_key: None }),
        "l" | "loop" => Input::Send(Command::ToggleLoop {
            rate: number(arg).unwrap_or(1.0),
        }),
        "r" | "rate" => match number(arg) {
            Some(rate) => Input::Send(Command::SetPlaybackRate { rate }),
            None => Input::Invalid("usage: r <rate>".into()),
        },
        "seek" => match number(arg) {
            Some(secs) if secs >= 0.0 => Input::Seek { secs },
            _ => Input::Invalid("usage: seek <seconds>".into()),
        },
        "s" | "save" => match arg.and_then(|a| a.parse::<usize>().ok()) {
            Some(n) if n > 0 => Input::Save { n },
            _ => Input::Invalid("usage: s <n>".into()),
        },
        "e" | "example" => match arg {
            Some(word) => {
                let word = std::iter::once(word).chain(rest).collect::<Vec<_>>().join(" ");
                Input::Send(Command::ExampleSentence { word })
            }
            None => Input::Invalid("usage: e <word>".into()),
        },
        "?" | "status" => Input::Status,
        "h" | "help" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("unknown command: {other}")),
    };
    Some(input)
}

pub const HELP: &str = "\
  p / space    play or pause
  b            previous sentence
  t            translate current sentence
  v            vocabulary for current sentence
  s <n>        save vocabulary term n
  e <word>     example sentence
  l [rate]     toggle sentence loop (pause first)
  r <rate>     playback rate (0.5 0.75 1 1.25 1.5 2)
  seek <secs>  jump to position
  g            generate subtitles
  x            close popup
  ?            status
  q            quit";

pub fn format_status(player: &VirtualPlayer) -> String {
    format!(
        "{} {} at {}x",
        if player.paused() { "paused" } else { "playing" },
        format_timestamp(player.current_time_ms()),
        player.playback_rate()
    )
}
