use crate::config::schema::ButtonsConfig;
use crate::error::{RadioError, Result};
use crate::event::{Event, Input};
use crate::input::forward;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// `struct timeval` is two C longs.
const TIMEVAL_SIZE: usize = 2 * std::mem::size_of::<usize>();

/// `struct input_event`: timeval, u16 type, u16 code, i32 value.
pub const INPUT_EVENT_SIZE: usize = TIMEVAL_SIZE + 8;

const EV_KEY: u16 = 0x01;
const KEY_PRESS: i32 = 1;

/// One decoded `input_event` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn parse(buf: &[u8; INPUT_EVENT_SIZE]) -> Self {
        let rest = &buf[TIMEVAL_SIZE..];
        Self {
            kind: u16::from_ne_bytes([rest[0], rest[1]]),
            code: u16::from_ne_bytes([rest[2], rest[3]]),
            value: i32::from_ne_bytes([rest[4], rest[5], rest[6], rest[7]]),
        }
    }

    /// Key went down. Releases (0) and autorepeat (2) don't count.
    pub fn is_press(&self) -> bool {
        self.kind == EV_KEY && self.value == KEY_PRESS
    }
}

/// Drops presses of the same key that follow each other too closely.
pub struct Debouncer {
    window: Duration,
    last: HashMap<u16, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: HashMap::new(),
        }
    }

    pub fn accept(&mut self, code: u16, now: Instant) -> bool {
        match self.last.get(&code) {
            Some(&prev) if now.duration_since(prev) < self.window => false,
            _ => {
                self.last.insert(code, now);
                true
            }
        }
    }
}

/// Front-panel buttons wired as a gpio-keys evdev device.
pub struct ButtonSource {
    path: PathBuf,
    device: pipe::Receiver,
    keys: HashMap<u16, Event>,
    debouncer: Debouncer,
}

impl ButtonSource {
    /// Open the evdev node non-blocking and register it with the reactor, so
    /// a pending read is dropped cleanly on cancel.
    ///
    /// # Errors
    /// Returns `RadioError::Input` if the device can't be opened or the key
    /// map names an unknown event.
    pub async fn open(config: &ButtonsConfig) -> Result<Self> {
        let keys = key_map(config)?;
        // Not a FIFO: evdev nodes are character devices.
        let device = pipe::OpenOptions::new()
            .unchecked(true)
            .open_receiver(&config.device)
            .map_err(|e| RadioError::Input {
                source_name: "buttons",
                message: format!("{}: {e}", config.device.display()),
            })?;

        info!("buttons: listening on {}", config.device.display());
        Ok(Self {
            path: config.device.clone(),
            device,
            keys,
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
        })
    }

    /// Read key presses until cancelled or the controller goes away.
    ///
    /// # Errors
    /// Returns `RadioError::Input` if the device stops delivering events.
    pub async fn run(mut self, tx: mpsc::Sender<Input>, cancel: CancellationToken) -> Result<()> {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                read = self.device.read_exact(&mut buf) => {
                    read.map_err(|e| RadioError::Input {
                        source_name: "buttons",
                        message: format!("{}: {e}", self.path.display()),
                    })?;
                }
            }

            let raw = RawEvent::parse(&buf);
            if !raw.is_press() {
                continue;
            }
            let Some(&event) = self.keys.get(&raw.code) else {
                debug!("buttons: unmapped key code {}", raw.code);
                continue;
            };
            if !self.debouncer.accept(raw.code, Instant::now()) {
                debug!("buttons: bounce on {event}");
                continue;
            }
            if !forward(&tx, event, "buttons").await {
                return Ok(());
            }
        }
    }
}

fn key_map(config: &ButtonsConfig) -> Result<HashMap<u16, Event>> {
    config
        .keys
        .iter()
        .map(|(name, &code)| {
            let event = name.parse::<Event>().map_err(|e| RadioError::Input {
                source_name: "buttons",
                message: e.to_string(),
            })?;
            Ok((code, event))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: u16, code: u16, value: i32) -> [u8; INPUT_EVENT_SIZE] {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        buf[TIMEVAL_SIZE..TIMEVAL_SIZE + 2].copy_from_slice(&kind.to_ne_bytes());
        buf[TIMEVAL_SIZE + 2..TIMEVAL_SIZE + 4].copy_from_slice(&code.to_ne_bytes());
        buf[TIMEVAL_SIZE + 4..].copy_from_slice(&value.to_ne_bytes());
        buf
    }

    #[test]
    fn parse_key_press() {
        let raw = RawEvent::parse(&record(EV_KEY, 105, 1));
        assert_eq!(
            raw,
            RawEvent {
                kind: EV_KEY,
                code: 105,
                value: 1
            }
        );
        assert!(raw.is_press());
    }

    #[test]
    fn release_repeat_and_sync_ignored() {
        assert!(!RawEvent::parse(&record(EV_KEY, 105, 0)).is_press());
        assert!(!RawEvent::parse(&record(EV_KEY, 105, 2)).is_press());
        assert!(!RawEvent::parse(&record(0, 0, 1)).is_press());
    }

    #[test]
    fn debounce_per_key() {
        let mut d = Debouncer::new(Duration::from_millis(30));
        let t0 = Instant::now();
        assert!(d.accept(105, t0));
        assert!(!d.accept(105, t0 + Duration::from_millis(10)));
        assert!(d.accept(106, t0 + Duration::from_millis(10)));
        assert!(d.accept(105, t0 + Duration::from_millis(40)));
    }

    fn fifo(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("event0");
        let status = std::process::Command::new("mkfifo").arg(&path).status().unwrap();
        assert!(status.success());
        path
    }

    fn config(device: PathBuf) -> ButtonsConfig {
        ButtonsConfig {
            device,
            debounce_ms: 0,
            keys: HashMap::from([("right".to_string(), 106), ("power".to_string(), 28)]),
        }
    }

    #[tokio::test]
    async fn reads_presses_from_device() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = fifo(&dir);
        let source = ButtonSource::open(&config(path.clone())).await.unwrap();

        let mut writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        for rec in [
            record(EV_KEY, 106, 1),
            record(EV_KEY, 106, 0),
            record(0, 0, 0),
            record(EV_KEY, 28, 1),
            record(EV_KEY, 999, 1),
        ] {
            writer.write_all(&rec).unwrap();
        }
        drop(writer);

        let (tx, mut rx) = mpsc::channel(8);
        // EOF ends the loop with an error once every record is consumed.
        let result = source.run(tx, CancellationToken::new()).await;
        assert!(result.is_err());

        assert_eq!(rx.recv().await.unwrap().event, Event::Right);
        assert_eq!(rx.recv().await.unwrap().event, Event::Power);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn cancel_on_idle_device_lets_runtime_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo(&dir);
        // Idle writer: the device stays open but never produces data.
        let _writer = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();

        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let source = ButtonSource::open(&config(path.clone())).await.unwrap();
            let (tx, _rx) = mpsc::channel(1);
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(source.run(tx, cancel.clone()));

            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
            handle.await.unwrap().unwrap();
        });

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(rt);
            let _ = done_tx.send(());
        });
        done_rx
            .recv_timeout(Duration::from_secs(3))
            .expect("runtime shut down while the device was idle");
    }

    #[tokio::test]
    async fn missing_device_is_fatal() {
        let config = ButtonsConfig {
            device: PathBuf::from("/nonexistent/event0"),
            debounce_ms: 30,
            keys: HashMap::new(),
        };
        let err = ButtonSource::open(&config).await.err().unwrap();
        assert!(matches!(err, RadioError::Input { source_name: "buttons", .. }));
    }
}
