//! Edge case and error scenario tests

use narrate_config::{Config, ConfigError, ConfigManager};
use narrate_core::PlaybackSpeed;
use std::fs;
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_corrupted_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "this is not valid TOML {{{")?;

    assert!(matches!(manager.load(), Err(ConfigError::ParseError { .. })));
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_save_creates_parent_directories() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let nested_path = temp_dir.path().join("a").join("b").join("c");
    let manager = ConfigManager::with_directory(nested_path)?;

    manager.save(&Config::default())?;
    assert!(manager.config_path().exists());

    Ok(())
}

#[test]
fn test_concurrent_config_loads() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().to_path_buf();
    ConfigManager::with_directory(config_dir.clone())?.initialize()?;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let dir = config_dir.clone();
            std::thread::spawn(move || {
                if let Ok(mgr) = ConfigManager::with_directory(dir) {
                    for _ in 0..10 {
                        let _ = mgr.load();
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().is_ok());
    }

    Ok(())
}

#[test]
fn test_boundary_values_validation() {
    let mut config = Config::default();

    config.player.volume = 1.0;
    config.player.playback_speed = PlaybackSpeed::Double;
    assert!(config.validate().is_ok());

    config.player.volume = 0.0;
    config.player.playback_speed = PlaybackSpeed::Half;
    assert!(config.validate().is_ok());

    config.player.volume = 1.0001;
    assert!(config.validate().is_err());

    config.player.volume = f32::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn test_empty_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "   \n")?;

    assert!(matches!(manager.load(), Err(ConfigError::ReadError { .. })));
    assert_eq!(manager.load_or_default(), Config::default());

    Ok(())
}

#[test]
fn test_partial_config_toml() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let partial_toml = r#"
version = 1

[player]
playback_speed = 2.0
"#;
    fs::write(manager.config_path(), partial_toml)?;

    let config = manager.load()?;
    assert_eq!(config.player.playback_speed, PlaybackSpeed::Double);
    assert_eq!(config.player.volume, 1.0);
    assert_eq!(config.sync.interval_secs, 5);

    Ok(())
}

#[test]
fn test_speed_outside_offered_set_is_parse_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "[player]\nplayback_speed = 3.0\n")?;

    assert!(matches!(manager.load(), Err(ConfigError::ParseError { .. })));

    Ok(())
}

#[test]
fn test_update_with_invalid_value() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.initialize()?;

    let result = manager.update(|config| {
        config.sync.timeout_secs = 0;
    });
    assert!(result.is_err());

    assert_eq!(manager.load()?.sync.timeout_secs, 10);

    Ok(())
}

#[test]
fn test_backup_holds_previous_contents() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let mut config = Config::default();
    config.player.volume = 0.75;
    manager.save(&config)?;

    config.player.volume = 0.25;
    manager.save(&config)?;

    let backup_path = manager.config_path().with_extension("toml.backup");
    let backup_config: Config = toml::from_str(&fs::read_to_string(&backup_path)?)?;
    assert_eq!(backup_config.player.volume, 0.75);

    Ok(())
}

#[test]
fn test_unknown_version_still_loads() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    fs::write(manager.config_path(), "version = 7\n[sync]\ninterval_secs = 9\n")?;

    let config = manager.load()?;
    assert_eq!(config.version, 7);
    assert_eq!(config.sync.interval_secs, 9);

    Ok(())
}
