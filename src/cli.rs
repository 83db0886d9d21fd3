//! Terminal front-end: command-line flags, the interactive command set and
//! rendering of the session for display.

use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use crate::config::{save_config_to, Config};
use crate::level::{self, ProficiencyLevel};
use crate::model_config::get_all_models;
use crate::session::{Session, SessionState};
use crate::themes::THEMES;

/// Speak about a picture in English and get a score
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Proficiency level for this run (STARTER, A1, MOVER, A2, FLYER, B1, B2)
    #[arg(short, long)]
    pub level: Option<ProficiencyLevel>,

    /// Child's name used in the script introduction
    #[arg(short, long)]
    pub name: Option<String>,

    /// Catalog theme id, or any free text
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Text model id for scripts and scoring
    #[arg(short, long)]
    pub model: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Per-run overrides. Not persisted.
    pub fn apply(&self, config: &mut Config) {
        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            config.child_name = name.to_string();
        }
        if let Some(model) = &self.model {
            config.text_model = model.clone();
        }
    }
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Themes,
    Theme(String),
    Custom(String),
    Level(ProficiencyLevel),
    Levels,
    Name(String),
    Start,
    Play,
    Hush,
    Practice,
    Stop,
    Retry,
    Reset,
    Key(String, Option<String>),
    Models,
    SaveAudio,
    SavePicture,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };

        let needs_arg = |what: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("Usage: {} <{}>", word, what))
            } else {
                Ok(rest.to_string())
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "themes" => Ok(Command::Themes),
            "theme" => needs_arg("id").map(Command::Theme),
            "custom" => needs_arg("text").map(Command::Custom),
            "level" => {
                let key = needs_arg("level")?;
                key.parse().map(Command::Level)
            }
            "levels" => Ok(Command::Levels),
            "name" => needs_arg("name").map(Command::Name),
            "start" | "go" => Ok(Command::Start),
            "play" | "listen" => Ok(Command::Play),
            "hush" => Ok(Command::Hush),
            "practice" | "record" => Ok(Command::Practice),
            "stop" | "done" => Ok(Command::Stop),
            "retry" | "again" => Ok(Command::Retry),
            "reset" | "new" => Ok(Command::Reset),
            "key" => {
                let args = needs_arg("api key> [model")?;
                let mut parts = args.split_whitespace();
                let key = parts.next().unwrap_or_default().to_string();
                Ok(Command::Key(key, parts.next().map(str::to_string)))
            }
            "models" => Ok(Command::Models),
            "save-audio" => Ok(Command::SaveAudio),
            "save-picture" => Ok(Command::SavePicture),
            "status" | "" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("Unknown command '{}'. Type 'help'.", other)),
        }
    }
}

pub const HELP: &str = "\
Commands:
  themes                list picture themes
  theme <id>            pick a theme from the list
  custom <text>         describe your own theme
  levels / level <key>  list levels / choose a level
  name <name>           set the child's name
  start                 draw the picture and write the script
  play / hush           listen to the example / stop it
  practice / stop       start reading aloud / finish and get a score
  retry                 practice again, or retry what failed
  reset                 start over with a new theme
  key <api key> [model] set the Gemini API key
  models                list text models
  save-audio            save the example reading as WAV
  save-picture          save the picture
  status                show where you are
  quit";

pub fn render_themes() -> String {
    THEMES
        .iter()
        .map(|t| format!("  {} {:<8} {} - {}", t.icon, t.id, t.label, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_levels(current: ProficiencyLevel) -> String {
    ProficiencyLevel::ALL
        .iter()
        .map(|&l| {
            let policy = level::policy(l);
            let marker = if l == current { "*" } else { " " };
            format!(
                " {} {:<8} {} ({} words)",
                marker,
                l.key(),
                policy.description,
                policy.vocabulary_size
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_models(current: &str) -> String {
    get_all_models()
        .iter()
        .map(|m| {
            let marker = if m.id == current { "*" } else { " " };
            format!(" {} {:<24} {} - {}", marker, m.id, m.name, m.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything the user should see for the current state.
pub fn render_status(session: &Session) -> String {
    let mut out = format!("[{}]", session.state());

    match session.state() {
        SessionState::Idle => {
            let selection = session.selection();
            let theme = match (selection.selected(), selection.theme_text()) {
                (Some(t), _) => format!("{} {}", t.icon, t.label),
                (None, Some(text)) => text,
                (None, None) => "(none)".to_string(),
            };
            out.push_str(&format!(
                " theme: {} | level: {} | name: {}",
                theme,
                session.level().policy().label,
                session.child_name()
            ));
        }
        SessionState::Ready => {
            if let Some(p) = session.presentation() {
                out.push_str(&format!(" {} ({}, {} words)\n", p.theme, p.level, p.word_count()));
                out.push_str(&format!("  {}\n", p.intro));
                for point in &p.points {
                    out.push_str(&format!("  {}\n", point));
                }
                out.push_str(&format!("  {}", p.conclusion));
            }
        }
        SessionState::Practicing => {
            let mic = if session.is_capturing() {
                level_meter(session.input_level())
            } else {
                "off".to_string()
            };
            out.push_str(&format!(" mic {} | heard: {}", mic, session.transcript().text()));
        }
        SessionState::Result => {
            if let Some(r) = session.result() {
                let stars = r.stars() as usize;
                out.push_str(&format!(
                    " {}{} {:.0}/100 | level {}\n  {}\n  You said: {}",
                    "★".repeat(stars),
                    "☆".repeat(5 - stars),
                    r.score,
                    r.cefr_level,
                    r.feedback,
                    r.transcript
                ));
                if !r.mistakes.is_empty() {
                    out.push_str(&format!("\n  Practice these words: {}", r.mistakes.join(", ")));
                }
            }
        }
        _ => {}
    }

    if let Some(err) = session.last_error() {
        let hint = if err.action.is_some() {
            " (type 'retry', 'key', or 'reset')"
        } else {
            ""
        };
        out.push_str(&format!("\n  ! {}{}", err.message(), hint));
    }
    out
}

fn level_meter(level: f32) -> String {
    let filled = (level.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(10 - filled))
}

/// Read stdin on a separate thread so the live transcript can be polled
/// while waiting for the next command.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Background ticks redraw only for new words or a state change.
fn needs_redraw(shown: SessionState, now: SessionState, appended: usize) -> bool {
    appended > 0 || shown != now
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn persist(config: &Config, path: &Path) {
    if let Err(e) = save_config_to(config, path) {
        tracing::error!("Failed to save config: {}", e);
    }
}

/// Interactive loop until `quit` or end of input.
pub fn run(mut session: Session, mut config: Config, config_path: &Path) -> anyhow::Result<()> {
    println!("Speaking Buddy - type 'help' for commands.");
    if !session.credentials().is_configured() {
        println!("No API key yet: type 'key <your Gemini API key>'.");
    }
    println!("{}", render_status(&session));
    prompt();

    let lines = spawn_stdin_reader();
    let export_dir = PathBuf::from(&config.export_dir);
    let mut shown = session.state();

    loop {
        let line = match lines.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => line,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let appended = session.poll();
                if needs_redraw(shown, session.state(), appended) {
                    shown = session.state();
                    println!("\n{}", render_status(&session));
                    prompt();
                }
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        let command = match Command::parse(&line) {
            Ok(c) => c,
            Err(msg) => {
                println!("{}", msg);
                prompt();
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Themes => println!("{}", render_themes()),
            Command::Levels => println!("{}", render_levels(session.level())),
            Command::Models => println!("{}", render_models(&session.credentials().text_model)),
            Command::Theme(id) => {
                session.select_theme(&id);
            }
            Command::Custom(text) => {
                session.set_custom_theme(&text);
            }
            Command::Level(level) => {
                if session.set_level(level) {
                    config.level = level;
                    persist(&config, config_path);
                }
            }
            Command::Name(name) => {
                if session.set_child_name(&name) {
                    config.child_name = session.child_name().to_string();
                    persist(&config, config_path);
                }
            }
            Command::Start => {
                if session.selection().theme_text().is_some()
                    && session.state() == SessionState::Idle
                {
                    println!("Drawing the picture and writing the script...");
                }
                session.start();
            }
            Command::Play => {
                if session.play_example() {
                    println!("Playing the example. Type 'hush' to stop.");
                }
            }
            Command::Hush => {
                session.stop_example();
            }
            Command::Practice => {
                if session.start_practice() && session.state() == SessionState::Practicing {
                    println!("Listening... read the script, then type 'stop'.");
                }
            }
            Command::Stop => {
                if session.state() == SessionState::Practicing {
                    println!("Checking how you did...");
                }
                session.stop_practice();
            }
            Command::Retry => {
                session.retry();
            }
            Command::Reset => session.reset(),
            Command::Key(key, model) => {
                let model = model.unwrap_or_else(|| session.credentials().text_model.clone());
                session.change_credential(&key, &model);
                config.gemini_api_key = session.credentials().api_key.clone();
                config.text_model = session.credentials().text_model.clone();
                persist(&config, config_path);
                println!("API key saved.");
            }
            Command::SaveAudio => {
                if let Some(path) = session.export_audio(&export_dir) {
                    println!("Saved {}", path.display());
                }
            }
            Command::SavePicture => {
                if let Some(path) = session.export_illustration(&export_dir) {
                    println!("Saved {}", path.display());
                }
            }
            Command::Status => {}
        }

        shown = session.state();
        println!("{}", render_status(&session));
        prompt();
    }

    session.reset();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_ticks_do_not_redraw() {
        assert!(!needs_redraw(SessionState::Error, SessionState::Error, 0));
        assert!(!needs_redraw(SessionState::Ready, SessionState::Ready, 0));
        assert!(needs_redraw(SessionState::Practicing, SessionState::Error, 0));
        assert!(needs_redraw(SessionState::Practicing, SessionState::Practicing, 2));
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(Command::parse("theme zoo"), Ok(Command::Theme("zoo".into())));
        assert_eq!(
            Command::parse("custom  my pet robot "),
            Ok(Command::Custom("my pet robot".into()))
        );
        assert_eq!(
            Command::parse("LEVEL mover"),
            Ok(Command::Level(ProficiencyLevel::Mover))
        );
        assert_eq!(
            Command::parse("key abc gemini-2.5-flash"),
            Ok(Command::Key("abc".into(), Some("gemini-2.5-flash".into())))
        );
        assert_eq!(Command::parse("key abc"), Ok(Command::Key("abc".into(), None)));
    }

    #[test]
    fn aliases_and_blank_line() {
        assert_eq!(Command::parse("go"), Ok(Command::Start));
        assert_eq!(Command::parse("done"), Ok(Command::Stop));
        assert_eq!(Command::parse("   "), Ok(Command::Status));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
    }

    #[test]
    fn missing_argument_and_unknown_command() {
        assert!(Command::parse("theme").is_err());
        assert!(Command::parse("level C2").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn args_override_config() {
        let args = Args::parse_from(["speaking-buddy", "--level", "a2", "--name", " Minh "]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.level, ProficiencyLevel::A2);
        assert_eq!(config.child_name, "Minh");
    }

    #[test]
    fn level_list_marks_current() {
        let listing = render_levels(ProficiencyLevel::Flyer);
        assert_eq!(listing.lines().count(), ProficiencyLevel::ALL.len());
        assert!(listing.lines().any(|l| l.starts_with(" * FLYER")));
    }

    #[test]
    fn meter_is_bounded() {
        assert_eq!(level_meter(0.0), "[..........]");
        assert_eq!(level_meter(2.0), "[##########]");
    }
}
