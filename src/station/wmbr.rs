use crate::error::{RadioError, Result};
use crate::station::http::get_text;
use crate::station::Status;
use regex::Regex;
use std::sync::OnceLock;

const WMBR_URL: &str = "https://wmbr.org/cgi-bin/xmlinfo";

pub async fn fetch(client: &reqwest::Client) -> Result<Status> {
    parse(&get_text(client, WMBR_URL).await?)
}

/// Parse the `<wmbrinfo>` document. Only a handful of flat leaf elements are
/// read, so tags are matched directly.
pub fn parse(body: &str) -> Result<Status> {
    if !body.contains("<wmbrinfo") {
        return Err(RadioError::Status("malformed wmbrinfo".into()));
    }

    let p = patterns();
    let temp = element(body, &p.temp);
    Ok(Status {
        show: element(body, &p.show),
        artist: element(body, &p.hosts),
        track: p.non_ascii.replace_all(&temp, "").into_owned(),
        album: element(body, &p.wx),
    })
}

struct Patterns {
    show: Regex,
    hosts: Regex,
    temp: Regex,
    wx: Regex,
    non_ascii: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let leaf = |tag: &str| {
            Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>(.*?)</{tag}>")).expect("valid regex")
        };
        Patterns {
            show: leaf("showname_ascii"),
            hosts: leaf("showhosts_ascii"),
            temp: leaf("temp"),
            wx: leaf("wx"),
            non_ascii: Regex::new(r"[^\x00-\x7F]").expect("valid regex"),
        }
    })
}

fn element(body: &str, re: &Regex) -> String {
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| unescape(strip_cdata(m.as_str().trim())))
        .unwrap_or_default()
}

fn strip_cdata(text: &str) -> &str {
    text.strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text)
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
