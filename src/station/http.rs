use crate::error::{RadioError, Result};
use crate::station::Status;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const KFJC_URL: &str = "https://kfjc.org/api/playlists/current.php";
const WFMU_URL: &str = "https://wfmu.org/wp-content/themes/wfmu-theme/status/main.json";
const NTS_URL: &str = "https://www.nts.live/api/v2/live";
const APOREE_URL: &str = "https://radio.aporee.org/spool/meta.js";

/// GET `url` and return the body, failing on non-2xx responses.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(RadioError::Status(format!("HTTP {status}")));
    }
    debug!("GET {url} → {status}");
    Ok(resp.text().await?)
}

pub async fn kfjc(client: &reqwest::Client) -> Result<Status> {
    parse_kfjc(&get_text(client, KFJC_URL).await?)
}

pub async fn wfmu(client: &reqwest::Client) -> Result<Status> {
    parse_wfmu(&get_text(client, WFMU_URL).await?)
}

pub async fn nts(client: &reqwest::Client, channel: usize) -> Result<Status> {
    parse_nts(&get_text(client, NTS_URL).await?, channel)
}

pub async fn aporee(client: &reqwest::Client) -> Result<Status> {
    parse_aporee(&get_text(client, APOREE_URL).await?)
}

#[derive(Debug, Deserialize)]
struct KfjcPlaylist {
    #[serde(default)]
    air_name: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    track_title: String,
}

pub fn parse_kfjc(body: &str) -> Result<Status> {
    let p: KfjcPlaylist = serde_json::from_str(body)?;
    Ok(Status {
        show: p.air_name,
        artist: p.artist,
        track: p.track_title,
        album: p.album,
    })
}

/// WFMU's feed is loosely typed; every field is optional and non-string
/// values are ignored.
pub fn parse_wfmu(body: &str) -> Result<Status> {
    let value: Value = serde_json::from_str(body)?;
    let Some(obj) = value.as_object() else {
        return Ok(Status::default());
    };
    let field = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Ok(Status {
        show: field("show"),
        artist: field("artist"),
        track: field("title"),
        album: field("album"),
    })
}

#[derive(Debug, Deserialize)]
struct AporeeMeta {
    #[serde(default)]
    aporee_title: String,
    #[serde(default)]
    aporee_lat: String,
    #[serde(default)]
    aporee_lng: String,
}

/// Aporee streams field recordings; the coordinates go where the track
/// and album normally sit.
pub fn parse_aporee(body: &str) -> Result<Status> {
    let m: AporeeMeta = serde_json::from_str(body)?;
    Ok(Status {
        show: m.aporee_title,
        artist: String::new(),
        track: m.aporee_lat,
        album: m.aporee_lng,
    })
}

#[derive(Debug, Default, Deserialize)]
struct NtsLive {
    #[serde(default)]
    results: Vec<NtsChannel>,
}

#[derive(Debug, Default, Deserialize)]
struct NtsChannel {
    #[serde(default)]
    now: NtsBroadcast,
}

#[derive(Debug, Default, Deserialize)]
struct NtsBroadcast {
    #[serde(default)]
    embeds: NtsEmbeds,
}

#[derive(Debug, Default, Deserialize)]
struct NtsEmbeds {
    #[serde(default)]
    details: NtsDetails,
}

#[derive(Debug, Default, Deserialize)]
struct NtsDetails {
    #[serde(default)]
    name: String,
    #[serde(default)]
    location_long: Option<String>,
    #[serde(default)]
    genres: Vec<NtsGenre>,
}

#[derive(Debug, Deserialize)]
struct NtsGenre {
    value: String,
}

pub fn parse_nts(body: &str, channel: usize) -> Result<Status> {
    let live: NtsLive = serde_json::from_str(body)?;
    if live.results.len() < 2 {
        return Ok(Status::diagnostic("Not enough results"));
    }
    let Some(ch) = channel.checked_sub(1).and_then(|i| live.results.get(i)) else {
        return Err(RadioError::Status(format!("no NTS channel {channel}")));
    };
    let details = &ch.now.embeds.details;
    Ok(Status {
        show: details.name.clone(),
        artist: String::new(),
        track: details.location_long.clone().unwrap_or_default(),
        album: details
            .genres
            .first()
            .map(|g| g.value.clone())
            .unwrap_or_default(),
    })
}
