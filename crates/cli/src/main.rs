// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgGroup, Command};
use narrate_config::ConfigManager;
use std::path::PathBuf;

mod commands;
mod player;

fn build_cli() -> Command {
    Command::new("narrate")
        .version(env!("CARGO_PKG_VERSION"))
        .author("DrTomLLC")
        .about("Streaming audiobook player")
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config dir)")
                .global(true),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("Audiobook API base URL, overriding the config file")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("play")
                .about("Play an audiobook in the terminal")
                .arg(Arg::new("id").required(true).value_name("AUDIOBOOK_ID").help("Audiobook ID"))
                .arg(
                    Arg::new("chapter")
                        .short('c')
                        .long("chapter")
                        .value_name("N")
                        .help("Chapter number to start from")
                        .value_parser(clap::value_parser!(u32).range(1..))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("position")
                        .short('p')
                        .long("position")
                        .value_name("SECONDS")
                        .help("Position within the starting chapter")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("sleep")
                        .short('s')
                        .long("sleep")
                        .value_name("MINUTES|eoc")
                        .help("Arm a sleep timer: 5, 10, 15, 30, 45, 60 or eoc (end of chapter)"),
                )
                .arg(
                    Arg::new("simulate")
                        .long("simulate")
                        .help("Play a built-in demo audiobook without contacting the API")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Show an audiobook and its chapters")
                .arg(Arg::new("id").required(true).value_name("AUDIOBOOK_ID").help("Audiobook ID"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the raw JSON document")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or manage the configuration file")
                .arg(Arg::new("init").long("init").help("Write a commented default config if none exists").action(ArgAction::SetTrue))
                .arg(Arg::new("reset").long("reset").help("Overwrite the config with defaults").action(ArgAction::SetTrue))
                .arg(Arg::new("path").long("path").help("Print the config file path").action(ArgAction::SetTrue))
                .group(ArgGroup::new("action").args(["init", "reset", "path"])),
        )
}

fn open_config(matches: &clap::ArgMatches) -> Result<ConfigManager> {
    let manager = match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    };
    manager.context("Failed to locate the configuration directory")
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let manager = open_config(&matches)?;
    let mut config = manager
        .load_with_env_overrides()
        .context("Failed to load configuration")?;
    if let Some(url) = matches.get_one::<String>("api-url") {
        config.app.api_base_url = url.clone();
    }

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        config.app.log_level.as_filter()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        Some(("play", sub_matches)) => {
            let options = commands::play_options(sub_matches)?;
            player::start_playback(manager, config, options).await
        }
        Some(("info", sub_matches)) => commands::show_audiobook_info(&config, sub_matches).await,
        Some(("config", sub_matches)) => commands::manage_config(&manager, sub_matches),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
