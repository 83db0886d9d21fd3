mod api;
mod audio;
mod cli;
mod config;
mod error;
mod export;
mod level;
mod model_config;
mod session;
mod themes;

use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use api::{GeminiClient, LiveTranscriber};
use audio::CpalAudio;
use config::{get_config_path, load_config_from};
use session::Session;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to stderr so they never interleave with the prompt on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let config_path = args.config.clone().unwrap_or_else(get_config_path);
    let mut config = load_config_from(&config_path);
    config.apply_env();
    args.apply(&mut config);
    tracing::info!(
        path = %config_path.display(),
        level = %config.level,
        model = %config.text_model,
        "Configuration loaded"
    );

    let gemini = GeminiClient::new(Duration::from_secs(config.request_timeout_secs));
    let live = LiveTranscriber::new(Duration::from_secs(config.live_setup_timeout_secs));
    let mut session = Session::new(
        Box::new(gemini.clone()),
        Box::new(gemini),
        Box::new(live),
        Box::new(CpalAudio::new()),
        config.credentials(),
    );
    session.set_level(config.level);
    session.set_child_name(&config.child_name);

    if let Some(theme) = args.theme.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        if themes::find_theme(theme).is_some() {
            session.select_theme(theme);
        } else {
            session.set_custom_theme(theme);
        }
    }

    cli::run(session, config, &config_path)
}
