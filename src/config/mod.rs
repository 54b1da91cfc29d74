pub mod schema;

use crate::error::{RadioError, Result};
use crate::event::Event;
use schema::{AppConfig, StationKind};
use std::path::{Path, PathBuf};

/// Load and parse configuration from a TOML file.
///
/// # Errors
/// Returns `RadioError::ConfigNotFound` if the file doesn't exist,
/// `RadioError::Io` on read errors, `RadioError::TomlParse` on syntax errors,
/// or `RadioError::Config` on validation failures.
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(RadioError::ConfigNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse and validate configuration text.
///
/// # Errors
/// Returns `RadioError::TomlParse` or `RadioError::Config`.
pub fn parse(content: &str) -> Result<AppConfig> {
    let content = expand_env_vars(content);
    let config: AppConfig = toml::from_str(&content)?;

    validate(&config)?;
    Ok(config)
}

/// Resolve a config-relative path.
#[must_use]
pub fn resolve(config_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_dir.join(path)
    }
}

/// Expand `${VAR}` and `$VAR` patterns in the config string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if let Ok(val) = std::env::var(&var_name) {
                    result.push_str(&val);
                } else {
                    // Keep original if env var not found
                    use std::fmt::Write;
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                let mut var_name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        var_name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else if let Ok(val) = std::env::var(&var_name) {
                    result.push_str(&val);
                } else {
                    result.push('$');
                    result.push_str(&var_name);
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Validate config constraints.
fn validate(config: &AppConfig) -> Result<()> {
    if config.stations.is_empty() {
        return Err(RadioError::Config("at least one station is required".into()));
    }

    let radio = &config.radio;
    if radio.flash_ms == 0 {
        return Err(RadioError::Config("flash_ms must be positive".into()));
    }
    if radio.tick_interval_secs == 0 {
        return Err(RadioError::Config("tick_interval_secs must be positive".into()));
    }
    if radio.status_timeout_secs == 0 {
        return Err(RadioError::Config("status_timeout_secs must be positive".into()));
    }
    if radio.event_buffer == 0 {
        return Err(RadioError::Config("event_buffer must be positive".into()));
    }
    if radio.volume_step == 0 || radio.volume_step > 100 {
        return Err(RadioError::Config("volume_step must be 1-100".into()));
    }
    if radio.player.is_empty() {
        return Err(RadioError::Config("player command is empty".into()));
    }

    for (idx, station) in config.stations.iter().enumerate() {
        match station.kind {
            StationKind::Custom => {
                let ok = station
                    .command
                    .as_ref()
                    .is_some_and(|cmd| cmd.first().is_some_and(|p| !p.is_empty()));
                if !ok {
                    return Err(RadioError::Config(format!(
                        "station {idx}: custom station needs a non-empty command"
                    )));
                }
                if station.name.is_none() {
                    return Err(RadioError::Config(format!(
                        "station {idx}: custom station needs a name"
                    )));
                }
            }
            StationKind::Nts => {
                if !matches!(station.channel.unwrap_or(1), 1 | 2) {
                    return Err(RadioError::Config(format!(
                        "station {idx}: NTS channel must be 1 or 2"
                    )));
                }
            }
            _ => {}
        }
    }

    if let Some(buttons) = &config.buttons {
        for name in buttons.keys.keys() {
            name.parse::<Event>()
                .map_err(|_| RadioError::Config(format!("buttons.keys: unknown event '{name}'")))?;
        }
    }

    if let Some(remote) = &config.remote {
        for (key, name) in &remote.keys {
            name.parse::<Event>().map_err(|_| {
                RadioError::Config(format!("remote.keys.{key}: unknown event '{name}'"))
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_var_expansion() {
        std::env::set_var("RADIOD_TEST_VAR", "hello");
        let result = expand_env_vars("url = \"${RADIOD_TEST_VAR}/path\"");
        assert_eq!(result, "url = \"hello/path\"");
        let result = expand_env_vars("url = \"$RADIOD_TEST_VAR/path\"");
        assert_eq!(result, "url = \"hello/path\"");
        std::env::remove_var("RADIOD_TEST_VAR");
    }

    #[test]
    fn env_var_missing_kept() {
        let result = expand_env_vars("url = \"${RADIOD_NONEXISTENT}/path\"");
        assert_eq!(result, "url = \"${RADIOD_NONEXISTENT}/path\"");
    }

    #[test]
    fn no_stations_rejected() {
        let err = parse("[radio]\nflash_ms = 100\n").unwrap_err();
        assert!(matches!(err, RadioError::Config(_)));
    }

    #[test]
    fn custom_station_needs_command() {
        let err = parse(
            r#"
[[stations]]
kind = "custom"
name = "Pipe"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-empty command"));
    }

    #[test]
    fn nts_channel_range_checked() {
        let err = parse(
            r#"
[[stations]]
kind = "nts"
channel = 3
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("channel"));
    }

    #[test]
    fn remote_key_map_must_name_events() {
        let err = parse(
            r#"
[remote]
[remote.keys]
KEY_OK = "select"

[[stations]]
kind = "kxlu"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("select"));
    }

    #[test]
    fn load_missing_file() {
        let err = load(Path::new("/nonexistent/radiod.toml")).unwrap_err();
        assert!(matches!(err, RadioError::ConfigNotFound(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[stations]]\nkind = \"wfmu\"\n\n[[stations]]\nkind = \"wmbr\"").unwrap();
        let config = load(file.path()).unwrap();
        assert_eq!(config.stations.len(), 2);
    }

    #[test]
    fn resolve_relative_paths() {
        let dir = Path::new("/etc/radiod");
        assert_eq!(
            resolve(dir, Path::new("logos/a.gif")),
            PathBuf::from("/etc/radiod/logos/a.gif")
        );
        assert_eq!(resolve(dir, Path::new("/abs.gif")), PathBuf::from("/abs.gif"));
    }

    #[test]
    fn load_example_config() {
        let dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
        let path = PathBuf::from(dir).join("config.example.toml");
        if path.exists() {
            let config = load(&path).unwrap();
            assert!(!config.stations.is_empty());
        }
    }
}
