use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lingualoop_core::{
    Command, CommandResponse, CueList, JsonFileStore, Level, LlmService, PageController,
    PageEvent, PauseAction, Persistence, PlayerEvent, Provider, TextService, VideoPlayer,
    format_cue_list, normalize_video_url, service::Credential, store::get_default_store_path,
    video_url::video_id,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, mpsc},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::terminal::{
    HELP, Input, TerminalDisplay, TerminalHost, VirtualPlayer, format_status, parse_input,
};

mod terminal;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliProvider {
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<CliLevel> for Level {
    fn from(cli: CliLevel) -> Self {
        match cli {
            CliLevel::Beginner => Level::Beginner,
            CliLevel::Intermediate => Level::Intermediate,
            CliLevel::Advanced => Level::Advanced,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliPauseAction {
    Translate,
    Vocabulary,
    #[value(name = "none")]
    Off,
}

impl From<CliPauseAction> for PauseAction {
    fn from(cli: CliPauseAction) -> Self {
        match cli {
            CliPauseAction::Translate => PauseAction::Translate,
            CliPauseAction::Vocabulary => PauseAction::Vocabulary,
            CliPauseAction::Off => PauseAction::None,
        }
    }
}

#[derive(Parser)]
#[command(name = "lingualoop")]
#[command(about = "Watch subtitles, translate sentences, loop them and collect vocabulary")]
struct Cli {
    /// Storage file (defaults to the user data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Show or update settings
    Config {
        #[arg(long)]
        api_key: Option<String>,
        /// Target language for translations (e.g. "zh", "en", "es")
        #[arg(short, long)]
        lang: Option<String>,
        #[arg(long)]
        level: Option<CliLevel>,
        #[arg(short, long)]
        provider: Option<CliProvider>,
        /// What happens when the video is paused on a sentence
        #[arg(long)]
        pause_action: Option<CliPauseAction>,
    },
    /// Generate subtitles for a video and cache them
    Generate { url: String },
    /// Print cached subtitles
    Cues { url: String },
    /// Drop cached subtitles
    Clear { url: String },
    /// Play cached subtitles in the terminal
    Watch { url: String },
    /// List saved words
    Words,
    /// Save a word and its translation
    SaveWord { word: String, translation: String },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingualoop=info,lingualoop_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let store_path = cli.store.unwrap_or_else(get_default_store_path);
    let persistence = Persistence::new(Arc::new(JsonFileStore::new(&store_path)));
    tracing::debug!(store = %store_path.display(), "using storage file");

    match cli.command {
        CliCommand::Config {
            api_key,
            lang,
            level,
            provider,
            pause_action,
        } => {
            let mut settings = persistence.load_settings().await;
            let changed = api_key.is_some()
                || lang.is_some()
                || level.is_some()
                || provider.is_some()
                || pause_action.is_some();
            if let Some(api_key) = api_key {
                settings.api_key = Some(api_key.trim().to_string()).filter(|k| !k.is_empty());
            }
            if let Some(lang) = lang {
                settings.target_language = lang;
            }
            if let Some(level) = level {
                settings.level = level.into();
            }
            if let Some(provider) = provider {
                settings.provider = provider.into();
            }
            if let Some(pause_action) = pause_action {
                settings.pause_action = pause_action.into();
            }
            if changed {
                persistence.save_settings(&settings).await?;
                println!("{} Settings saved", style("✓").green().bold());
            }
            println!("{:<14}{}", style("provider").dim(), settings.provider.name());
            println!("{:<14}{}", style("language").dim(), settings.target_language);
            println!("{:<14}{}", style("level").dim(), settings.level);
            println!("{:<14}{:?}", style("on pause").dim(), settings.pause_action);
            let key_status = match settings.api_key() {
                Ok(_) => style("set".to_string()).green(),
                Err(e) => style(e.to_string()).red(),
            };
            println!("{:<14}{}", style("api key").dim(), key_status);
        }
        CliCommand::Generate { url } => {
            let settings = persistence.load_settings().await;
            let credential = Credential {
                provider: settings.provider,
                api_key: settings.api_key()?,
            };
            let service = LlmService::new()?;
            let spinner = create_spinner(&format!(
                "Generating subtitles with {}...",
                settings.provider.name()
            ));
            let cues = match service.generate_subtitles(&credential, &url).await {
                Ok(cues) => cues,
                Err(e) => {
                    spinner.finish_and_clear();
                    return Err(e).context("subtitle generation failed");
                }
            };
            let cues = CueList::new(cues);
            persistence.save_cues(&url, &cues).await?;
            spinner.finish_with_message(format!(
                "{} {} subtitles cached for {}",
                style("✓").green().bold(),
                cues.len(),
                style(normalize_video_url(&url)).dim()
            ));
        }
        CliCommand::Cues { url } => match persistence.load_cues(&url).await {
            Some(cues) => println!("{}", format_cue_list(&cues)),
            None => println!("{}", style("No cached subtitles for this video.").dim()),
        },
        CliCommand::Clear { url } => {
            persistence.clear_cues(&url).await?;
            println!("{} Subtitles cleared", style("✓").green().bold());
        }
        CliCommand::Words => {
            let words = persistence.get_saved_words().await;
            if words.is_empty() {
                println!("{}", style("No saved words yet.").dim());
            }
            for (word, translation) in words {
                println!("{} - {}", word, style(translation).green());
            }
        }
        CliCommand::SaveWord { word, translation } => {
            persistence.save_word(&word, &translation).await?;
            println!("{} Saved {}", style("✓").green().bold(), word.to_lowercase());
        }
        CliCommand::Watch { url } => watch(url, persistence).await?,
    }

    Ok(())
}

async fn watch(url: String, persistence: Persistence) -> Result<()> {
    let duration_ms = match persistence.load_cues(&url).await {
        Some(cues) => cues.duration_ms(),
        None => {
            println!(
                "{} No cached subtitles, press {} to generate them.",
                style("ℹ").blue(),
                style("g").bold()
            );
            0
        }
    };

    let player = Arc::new(VirtualPlayer::new(duration_ms));
    let display = Arc::new(TerminalDisplay::default());
    let host = Arc::new(TerminalHost::new(player.clone(), display.clone(), url.clone()));
    let service: Arc<dyn TextService> = Arc::new(LlmService::new()?);
    let controller = PageController::new(host, service, persistence.clone());

    let (events_tx, events_rx) = mpsc::channel::<PageEvent>(32);
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let controller_task = tokio::spawn(controller.run(events_rx, shutdown_rx));

    let title = video_id(&url).unwrap_or_else(|| normalize_video_url(&url));
    println!(
        "\n{}  {}\n",
        style("lingualoop").cyan().bold(),
        style(title).dim()
    );
    println!("{}", style(HELP).dim());
    println!("{}", style("─".repeat(60)).dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(input) = parse_input(&line) else {
            continue;
        };
        match input {
            Input::Quit => break,
            Input::Help => println!("{}", style(HELP).dim()),
            Input::Status => println!("{}", style(format_status(&player)).dim()),
            Input::Invalid(msg) => println!("{} {}", style("?").yellow(), msg),
            Input::TogglePlay => {
                let event = if player.paused() {
                    player.play();
                    PlayerEvent::Play
                } else {
                    player.pause();
                    PlayerEvent::Pause
                };
                events_tx.send(PageEvent::Player(event)).await?;
            }
            Input::Seek { secs } => {
                player.set_current_time_ms((secs * 1000.0) as u64);
                events_tx.send(PageEvent::Player(PlayerEvent::Seeked)).await?;
            }
            Input::Save { n } => match display.vocabulary_entry(n) {
                Some(entry) => {
                    send_command(
                        &events_tx,
                        Command::SaveWord {
                            word: entry.word,
                            translation: entry.translation,
                        },
                    )
                    .await?;
                }
                None => println!("{} no vocabulary term {}", style("?").yellow(), n),
            },
            Input::Send(command) => {
                let generating = matches!(command, Command::GenerateSubtitles { .. });
                let response = send_command(&events_tx, command).await?;
                if generating && response == CommandResponse::Started {
                    println!("{}", style("Generating subtitles... (this may take a while)").dim());
                }
            }
        }

        // Subtitles generated during this session lengthen the timeline.
        if let Some(cues) = persistence.load_cues(&url).await {
            player.extend_to(cues.duration_ms());
        }
    }

    let _ = shutdown_tx.send(());
    controller_task.await??;
    Ok(())
}

async fn send_command(
    events: &mpsc::Sender<PageEvent>,
    command: Command,
) -> Result<CommandResponse> {
    let (event, rx) = PageEvent::command(command);
    events.send(event).await?;
    let response = rx.await?;
    match &response {
        CommandResponse::Rejected { reason } => {
            println!("{} {}", style("✗").yellow(), reason)
        }
        CommandResponse::Error { message } => {
            println!("{} {}", style("Error:").red().bold(), message)
        }
        CommandResponse::NoSubtitlesFound => {
            println!("{}", style("No subtitles found for this video.").dim())
        }
        CommandResponse::NoOp => println!("{}", style("Nothing to do here.").dim()),
        CommandResponse::Started | CommandResponse::Success => {}
    }
    Ok(response)
}
