use crate::config::schema::RemoteConfig;
use crate::error::{RadioError, Result};
use crate::event::{Event, Input};
use crate::input::forward;
use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One decoded lircd broadcast line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LircKey {
    /// 0 for the initial press, incremented while the key is held.
    pub repeat: u32,
    pub name: String,
}

impl LircKey {
    /// Parse `<code> <repeat-hex> <key-name> <remote-name>`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let _code = fields.next()?;
        let repeat = u32::from_str_radix(fields.next()?, 16).ok()?;
        let name = fields.next()?.to_string();
        let _remote = fields.next()?;
        Some(Self { repeat, name })
    }
}

/// IR remote decoded by lircd.
pub struct RemoteSource {
    lines: Lines<BufReader<UnixStream>>,
    keys: HashMap<String, Event>,
}

impl RemoteSource {
    /// Connect to the lircd socket.
    ///
    /// # Errors
    /// Returns `RadioError::Input` if the socket can't be reached or the key
    /// map names an unknown event.
    pub async fn open(config: &RemoteConfig) -> Result<Self> {
        let keys = config
            .keys
            .iter()
            .map(|(key, name)| {
                let event = name.parse::<Event>().map_err(|e| RadioError::Input {
                    source_name: "remote",
                    message: e.to_string(),
                })?;
                Ok((key.clone(), event))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let stream = UnixStream::connect(&config.socket)
            .await
            .map_err(|e| RadioError::Input {
                source_name: "remote",
                message: format!("{}: {e}", config.socket.display()),
            })?;

        info!("remote: connected to {}", config.socket.display());
        Ok(Self {
            lines: BufReader::new(stream).lines(),
            keys,
        })
    }

    /// Forward key presses until cancelled, lircd hangs up, or the
    /// controller goes away.
    ///
    /// # Errors
    /// Returns `RadioError::Input` on socket read errors or hang-up.
    pub async fn run(mut self, tx: mpsc::Sender<Input>, cancel: CancellationToken) -> Result<()> {
        loop {
            let line = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                line = self.lines.next_line() => line.map_err(|e| RadioError::Input {
                    source_name: "remote",
                    message: e.to_string(),
                })?,
            };

            let Some(line) = line else {
                return Err(RadioError::Input {
                    source_name: "remote",
                    message: "lircd closed the connection".into(),
                });
            };

            let Some(key) = LircKey::parse(&line) else {
                debug!("remote: unparsable line {line:?}");
                continue;
            };
            if key.repeat > 0 {
                continue;
            }
            let Some(&event) = self.keys.get(&key.name) else {
                debug!("remote: unknown key {}", key.name);
                continue;
            };
            if !forward(&tx, event, "remote").await {
                return Ok(());
            }
        }
    }
}
