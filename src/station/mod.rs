pub mod bluetooth;
pub mod http;
pub mod registry;
pub mod wmbr;

pub use registry::Registry;

use crate::config::resolve;
use crate::config::schema::{RadioConfig, StationConfig, StationKind};
use crate::error::{RadioError, Result};
use crate::process::LaunchSpec;
use image::DynamicImage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a station is currently airing. Produced fresh on every query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub show: String,
    pub artist: String,
    pub track: String,
    pub album: String,
}

impl Status {
    /// A status carrying only a short diagnostic in the show line.
    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self {
            show: message.into(),
            ..Self::default()
        }
    }
}

/// Where a station's now-playing information comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSource {
    /// No metadata; always an empty status.
    None,
    Kfjc,
    Wfmu,
    Wmbr,
    Nts { channel: usize },
    Aporee,
    Bluetooth,
    /// Shell snippet whose stdout lines are show, artist, track, album.
    Command(String),
}

/// A playable source plus its metadata.
#[derive(Debug, Clone)]
pub struct Station {
    name: String,
    logo: Option<Arc<DynamicImage>>,
    launch: LaunchSpec,
    source: StatusSource,
}

impl Station {
    pub fn new(name: impl Into<String>, launch: LaunchSpec, source: StatusSource) -> Self {
        Self {
            name: name.into(),
            logo: None,
            launch,
            source,
        }
    }

    #[must_use]
    pub fn with_logo(mut self, logo: DynamicImage) -> Self {
        self.logo = Some(Arc::new(logo));
        self
    }

    /// Build a station from its config entry. A logo that fails to load is
    /// logged and skipped.
    ///
    /// # Errors
    /// Returns `RadioError::Config` for incomplete `custom` entries.
    pub fn from_config(cfg: &StationConfig, radio: &RadioConfig, config_dir: &Path) -> Result<Self> {
        let builtin = builtin(cfg);
        let name = cfg.name.clone().unwrap_or_else(|| builtin.name.clone());

        let launch = match cfg.kind {
            StationKind::Bluetooth => LaunchSpec::new("bluealsa-aplay", Vec::<String>::new()),
            StationKind::Custom => {
                let (program, args) = cfg
                    .command
                    .as_deref()
                    .and_then(<[String]>::split_first)
                    .ok_or_else(|| RadioError::Config(format!("station {name}: missing command")))?;
                LaunchSpec::new(program, args.iter().cloned())
            }
            _ => {
                let (program, player_args) = radio
                    .player
                    .split_first()
                    .ok_or_else(|| RadioError::Config("player command is empty".into()))?;
                let stream = cfg.stream.clone().unwrap_or(builtin.stream);
                let mut args = player_args.to_vec();
                args.push(stream);
                LaunchSpec::new(program, args)
            }
        };

        let mut station = Self::new(name, launch, builtin.source);

        if let Some(ref logo) = cfg.logo {
            let path = resolve(config_dir, logo);
            match image::open(&path) {
                Ok(img) => station = station.with_logo(img),
                Err(e) => warn!("failed to load logo {}: {e}", path.display()),
            }
        }

        Ok(station)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logo(&self) -> Option<&Arc<DynamicImage>> {
        self.logo.as_ref()
    }

    pub fn launch(&self) -> &LaunchSpec {
        &self.launch
    }

    pub fn source(&self) -> &StatusSource {
        &self.source
    }

    /// Query what is on air. Never fails: any error becomes a diagnostic
    /// status so the caller always has something to show.
    pub async fn status(&self, client: &reqwest::Client) -> Status {
        let result = match &self.source {
            StatusSource::None => Ok(Status::default()),
            StatusSource::Kfjc => http::kfjc(client).await,
            StatusSource::Wfmu => http::wfmu(client).await,
            StatusSource::Wmbr => wmbr::fetch(client).await,
            StatusSource::Nts { channel } => http::nts(client, *channel).await,
            StatusSource::Aporee => http::aporee(client).await,
            StatusSource::Bluetooth => bluetooth::status().await,
            StatusSource::Command(script) => command_status(script).await,
        };

        match result {
            Ok(status) => {
                debug!("{} status: {:?}", self.name, status);
                status
            }
            Err(e) => {
                warn!("{} status failed: {e}", self.name);
                Status::diagnostic(short_diagnostic(&e))
            }
        }
    }
}

struct Builtin {
    name: String,
    stream: String,
    source: StatusSource,
}

fn builtin(cfg: &StationConfig) -> Builtin {
    let (name, stream, source) = match cfg.kind {
        StationKind::Kfjc => (
            "KFJC".to_string(),
            "http://netcast.kfjc.org/kfjc-320k-aac",
            StatusSource::Kfjc,
        ),
        StationKind::Kxlu => (
            "KXLU".to_string(),
            "https://kxlu.streamguys1.com/kxlu-hi",
            StatusSource::None,
        ),
        StationKind::Wfmu => ("WFMU".to_string(), "https://wfmu.org/wfmu.pls", StatusSource::Wfmu),
        StationKind::Wmbr => ("WMBR".to_string(), "http://wmbr.org:8000/hi", StatusSource::Wmbr),
        StationKind::Nts => {
            let channel = usize::from(cfg.channel.unwrap_or(1));
            let stream = if channel == 2 {
                "https://stream-relay-geo.ntslive.net/stream2"
            } else {
                "https://stream-relay-geo.ntslive.net/stream"
            };
            (format!("NTS {channel}"), stream, StatusSource::Nts { channel })
        }
        StationKind::Aporee => (
            "Aporee".to_string(),
            "http://radio.aporee.org:8000/aporee_high.m3u",
            StatusSource::Aporee,
        ),
        StationKind::Bluetooth => ("Bluetooth".to_string(), "", StatusSource::Bluetooth),
        StationKind::Custom => (
            "Custom".to_string(),
            "",
            cfg.status_command
                .clone()
                .map_or(StatusSource::None, StatusSource::Command),
        ),
    };

    Builtin {
        name,
        stream: stream.to_string(),
        source,
    }
}

/// Run a status shell snippet; its first four stdout lines fill the fields.
async fn command_status(script: &str) -> Result<Status> {
    let output = tokio::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(script)
        .stdin(std::process::Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RadioError::Shell {
            command: script.to_string(),
            message: format!("exit {}: {}", output.status, stderr.trim()),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines().map(|l| l.trim().to_string());
    Ok(Status {
        show: lines.next().unwrap_or_default(),
        artist: lines.next().unwrap_or_default(),
        track: lines.next().unwrap_or_default(),
        album: lines.next().unwrap_or_default(),
    })
}

/// Keep diagnostics readable on a 128px wide screen.
fn short_diagnostic(err: &RadioError) -> String {
    const MAX: usize = 40;
    let text = err.to_string();
    if text.chars().count() <= MAX {
        text
    } else {
        text.chars().take(MAX).collect()
    }
}
