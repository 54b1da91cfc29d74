use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub mixer: MixerConfig,

    #[serde(default)]
    pub web: WebConfig,

    /// GPIO button panel exposed as an evdev device. Absent = no buttons.
    #[serde(default)]
    pub buttons: Option<ButtonsConfig>,

    /// IR remote via lircd. Absent = no remote.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,

    /// Stations in dial order.
    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

/// Controller timings and playback settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RadioConfig {
    /// Player command for stream stations; the stream URL is appended.
    #[serde(default = "default_player")]
    pub player: Vec<String>,

    /// Seconds between status/clock refresh ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Cached status older than this is re-queried on the next tick.
    #[serde(default = "default_status_refresh")]
    pub status_refresh_secs: u64,

    /// Upper bound on a single station status query.
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,

    /// How long logos and volume readouts stay on screen.
    #[serde(default = "default_flash_ms")]
    pub flash_ms: u64,

    /// Volume change per Up/Down press, in percent.
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,

    /// Capacity of the input mailbox. Small on purpose: producers wait for
    /// the controller instead of queueing stale presses.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            tick_interval_secs: default_tick_interval(),
            status_refresh_secs: default_status_refresh(),
            status_timeout_secs: default_status_timeout(),
            flash_ms: default_flash_ms(),
            volume_step: default_volume_step(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayBackend {
    /// Write screen contents to the log.
    Log,
    /// Rasterize each frame into a PNG file.
    Png,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_display_backend")]
    pub backend: DisplayBackend,

    /// Output file for the `png` backend.
    #[serde(default = "default_png_path")]
    pub png_path: PathBuf,

    /// TTF/OTF font for text lines (relative to config dir or absolute).
    #[serde(default)]
    pub font: Option<PathBuf>,

    /// Font for the title line; falls back to `font`.
    #[serde(default)]
    pub bold_font: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: default_display_backend(),
            png_path: default_png_path(),
            font: None,
            bold_font: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MixerConfig {
    /// ALSA simple mixer control.
    #[serde(default = "default_mixer_control")]
    pub control: String,

    /// ALSA card, passed as `amixer -c`.
    #[serde(default)]
    pub card: Option<String>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            control: default_mixer_control(),
            card: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            bind_address: default_bind_address(),
            port: default_web_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonsConfig {
    /// evdev node of the gpio-keys device.
    pub device: PathBuf,

    /// Presses of the same key closer together than this are dropped.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Event name → Linux key code.
    #[serde(default = "default_button_keys")]
    pub keys: HashMap<String, u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// lircd output socket.
    #[serde(default = "default_lirc_socket")]
    pub socket: PathBuf,

    /// lirc key name → event name.
    #[serde(default = "default_remote_keys")]
    pub keys: HashMap<String, String>,
}

/// Built-in station kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationKind {
    Kfjc,
    Kxlu,
    Wfmu,
    Wmbr,
    Nts,
    Aporee,
    Bluetooth,
    Custom,
}

/// A single station definition.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub kind: StationKind,

    /// Display name override.
    #[serde(default)]
    pub name: Option<String>,

    /// Path to a logo image (relative to config dir or absolute).
    #[serde(default)]
    pub logo: Option<PathBuf>,

    /// Stream URL override for stream stations.
    #[serde(default)]
    pub stream: Option<String>,

    /// NTS channel, 1 or 2.
    #[serde(default)]
    pub channel: Option<u8>,

    /// Full launch command for `custom` stations.
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Shell snippet for `custom` stations; stdout lines become
    /// show, artist, track, album.
    #[serde(default)]
    pub status_command: Option<String>,
}

// --- Defaults ---

fn default_player() -> Vec<String> {
    vec!["mpv".to_string(), "--no-video".to_string()]
}

fn default_tick_interval() -> u64 {
    10
}

fn default_status_refresh() -> u64 {
    30
}

fn default_status_timeout() -> u64 {
    8
}

fn default_flash_ms() -> u64 {
    250
}

fn default_volume_step() -> u8 {
    5
}

fn default_event_buffer() -> usize {
    1
}

fn default_display_backend() -> DisplayBackend {
    DisplayBackend::Log
}

fn default_png_path() -> PathBuf {
    PathBuf::from("/run/radiod/screen.png")
}

fn default_mixer_control() -> String {
    "Master".to_string()
}

fn default_web_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_debounce_ms() -> u64 {
    30
}

fn default_button_keys() -> HashMap<String, u16> {
    // KEY_LEFT, KEY_RIGHT, KEY_UP, KEY_DOWN, KEY_ENTER
    HashMap::from([
        ("left".to_string(), 105),
        ("right".to_string(), 106),
        ("up".to_string(), 103),
        ("down".to_string(), 108),
        ("power".to_string(), 28),
    ])
}

fn default_lirc_socket() -> PathBuf {
    PathBuf::from("/var/run/lirc/lircd")
}

fn default_remote_keys() -> HashMap<String, String> {
    [
        ("KEY_UP", "up"),
        ("KEY_DOWN", "down"),
        ("KEY_LEFT", "left"),
        ("KEY_RIGHT", "right"),
        ("KEY_PLAY", "power"),
        ("KEY_PLAYPAUSE", "power"),
        ("KEY_MENU", "menu"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
