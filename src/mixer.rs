use crate::config::schema::MixerConfig;
use crate::error::{RadioError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// System output volume, in percent.
#[async_trait]
pub trait Mixer: Send + Sync {
    async fn volume(&self) -> Result<u8>;

    async fn set_volume(&self, percent: u8) -> Result<()>;

    /// Change the volume by `delta` percent, clamped to 0-100, and return the
    /// new level as reported by the device.
    async fn adjust(&self, delta: i16) -> Result<u8> {
        let current = self.volume().await?;
        let target = (i16::from(current) + delta).clamp(0, 100) as u8;
        self.set_volume(target).await?;
        self.volume().await
    }
}

/// ALSA mixer driven through `amixer`.
pub struct Amixer {
    control: String,
    card: Option<String>,
}

impl Amixer {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            control: config.control.clone(),
            card: config.card.clone(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = tokio::process::Command::new("amixer");
        if let Some(ref card) = self.card {
            cmd.arg("-c").arg(card);
        }
        // -M: mapped volume, matches what alsamixer shows.
        let output = cmd.arg("-M").args(args).output().await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RadioError::Shell {
                command: format!("amixer {}", args.join(" ")),
                message: stderr.trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl Mixer for Amixer {
    async fn volume(&self) -> Result<u8> {
        let out = self.run(&["sget", &self.control]).await?;
        parse_percent(&out)
            .ok_or_else(|| RadioError::Mixer(format!("no volume in amixer output for {}", self.control)))
    }

    async fn set_volume(&self, percent: u8) -> Result<()> {
        debug!("amixer: {} → {percent}%", self.control);
        self.run(&["sset", &self.control, &format!("{percent}%")]).await?;
        Ok(())
    }
}

/// First `[NN%]` in `amixer sget` output.
fn parse_percent(output: &str) -> Option<u8> {
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    let re = PERCENT.get_or_init(|| Regex::new(r"\[(\d{1,3})%\]").expect("valid regex"));
    re.captures(output)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMixer;

    #[test]
    fn parse_amixer_output() {
        let out = "Simple mixer control 'Master',0\n  Capabilities: pvolume pswitch\n  Playback channels: Front Left - Front Right\n  Limits: Playback 0 - 65536\n  Mono:\n  Front Left: Playback 42597 [65%] [on]\n  Front Right: Playback 42597 [65%] [on]\n";
        assert_eq!(parse_percent(out), Some(65));
        assert_eq!(parse_percent("Mono: Playback [100%] [0.00dB]"), Some(100));
        assert_eq!(parse_percent("no volume here"), None);
    }

    #[tokio::test]
    async fn adjust_clamps() {
        let mixer = FakeMixer::new(97);
        assert_eq!(mixer.adjust(5).await.unwrap(), 100);
        assert_eq!(mixer.adjust(-5).await.unwrap(), 95);

        let quiet = FakeMixer::new(3);
        assert_eq!(quiet.adjust(-5).await.unwrap(), 0);
    }
}
