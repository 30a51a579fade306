// FILE: crates/cli/src/commands.rs

use crate::player::format_clock;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use console::style;
use narrate_config::{Config, ConfigManager};
use narrate_core::{Audiobook, AudiobookId, SleepTimer};
use narrate_network::{ApiClient, ClientConfig};
use narrate_resilience::RetryPolicy;
use std::time::Duration;

/// Arguments of the `play` subcommand
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOptions {
    pub audiobook_id: AudiobookId,
    /// Zero-based index of the starting chapter
    pub chapter_index: usize,
    pub position: f64,
    pub sleep_timer: Option<SleepTimer>,
    pub simulate: bool,
}

pub fn play_options(matches: &ArgMatches) -> Result<PlayOptions> {
    let chapter = matches.get_one::<u32>("chapter").copied().unwrap_or(1);
    let sleep_timer = matches
        .get_one::<String>("sleep")
        .map(|value| value.parse::<SleepTimer>())
        .transpose()
        .context("Invalid sleep timer")?;

    Ok(PlayOptions {
        audiobook_id: audiobook_id(matches)?,
        chapter_index: chapter.saturating_sub(1) as usize,
        position: matches.get_one::<f64>("position").copied().unwrap_or(0.0),
        sleep_timer,
        simulate: matches.get_flag("simulate"),
    })
}

fn audiobook_id(matches: &ArgMatches) -> Result<AudiobookId> {
    matches
        .get_one::<String>("id")
        .map(|id| AudiobookId::new(id.trim()))
        .filter(|id| !id.as_str().is_empty())
        .ok_or_else(|| anyhow!("Audiobook ID is required"))
}

/// Builds the API client from the `app` and `sync` config sections
pub fn api_client(config: &Config) -> Result<ApiClient> {
    let client_config = ClientConfig {
        timeout: config.sync.timeout(),
        retry_policy: Some(
            RetryPolicy::new(config.sync.fetch_retries as usize)
                .with_initial_delay(Duration::from_millis(200)),
        ),
        bearer_token: config.app.api_token.clone(),
        ..ClientConfig::default()
    };

    ApiClient::new(&config.app.api_base_url, client_config)
        .with_context(|| format!("Invalid API URL: {}", config.app.api_base_url))
}

pub async fn fetch_audiobook(config: &Config, id: &AudiobookId) -> Result<Audiobook> {
    api_client(config)?
        .fetch_audiobook(id)
        .await
        .with_context(|| format!("Failed to fetch audiobook {}", id))
}

/// Show an audiobook and its chapter list
pub async fn show_audiobook_info(config: &Config, matches: &ArgMatches) -> Result<()> {
    let id = audiobook_id(matches)?;
    let audiobook = fetch_audiobook(config, &id).await?;

    if matches.get_flag("json") {
        let json = serde_json::to_string_pretty(&audiobook)
            .context("Failed to serialize audiobook")?;
        println!("{}", json);
        return Ok(());
    }

    for line in describe_audiobook(&audiobook) {
        println!("{}", line);
    }
    Ok(())
}

pub fn describe_audiobook(audiobook: &Audiobook) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        style("Audiobook Information").bold().cyan().to_string(),
        "=".repeat(80),
        format!("ID: {}", audiobook.id),
        format!("Title: {}", style(&audiobook.title).bold()),
        format!("Author: {}", audiobook.author),
    ];

    if let Some(narrator) = &audiobook.narrator {
        lines.push(format!("Narrator: {}", narrator));
    }
    if !audiobook.cover_url.is_empty() {
        lines.push(format!("Cover: {}", audiobook.cover_url));
    }
    lines.push(format!(
        "Length: {} in {} chapters",
        format_clock(audiobook.total_duration()),
        audiobook.chapter_count()
    ));

    lines.push(String::new());
    for chapter in &audiobook.chapters {
        lines.push(format!(
            "  {:>3}. {:<60} {:>9}",
            chapter.number,
            chapter.title,
            format_clock(chapter.duration)
        ));
    }
    lines
}

/// Handle `config [--init|--reset|--path]`
pub fn manage_config(manager: &ConfigManager, matches: &ArgMatches) -> Result<()> {
    let path = manager.config_path();

    if matches.get_flag("path") {
        println!("{}", path.display());
        return Ok(());
    }

    if matches.get_flag("init") {
        if manager
            .initialize()
            .context("Failed to write default configuration")?
        {
            println!("{} Created {}", style("✓").green().bold(), path.display());
        } else {
            println!("Configuration already exists at {}", path.display());
        }
        return Ok(());
    }

    if matches.get_flag("reset") {
        manager.reset().context("Failed to reset configuration")?;
        println!("{} Reset {}", style("✓").green().bold(), path.display());
        return Ok(());
    }

    let config = manager.load().context("Failed to load configuration")?;
    println!("{}", style(path.display()).dim());
    println!("{}", render_config(&config)?);

    let problems = manager
        .validate()
        .context("Failed to validate configuration")?;
    for problem in problems {
        println!("{} {}", style("warning:").yellow().bold(), problem);
    }
    Ok(())
}

/// Pretty JSON view of `config` with the API token masked
pub fn render_config(config: &Config) -> Result<String> {
    let mut shown = config.clone();
    if shown.app.api_token.is_some() {
        shown.app.api_token = Some("********".to_string());
    }
    serde_json::to_string_pretty(&shown).context("Failed to serialize configuration")
}
