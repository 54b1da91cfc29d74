use crate::config::schema::AppConfig;
use crate::error::{RadioError, Result};
use crate::station::Station;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// The fixed, ordered station dial plus the cursor into it.
///
/// The station list never changes after construction; only the selected
/// index moves, and it always stays in range.
pub struct Registry {
    stations: Vec<Station>,
    index: usize,
    client: reqwest::Client,
}

impl Registry {
    /// # Errors
    /// Returns `RadioError::Config` if `stations` is empty.
    pub fn new(stations: Vec<Station>, client: reqwest::Client) -> Result<Self> {
        if stations.is_empty() {
            return Err(RadioError::Config("station list is empty".into()));
        }
        Ok(Self {
            stations,
            index: 0,
            client,
        })
    }

    /// Build every configured station and the shared HTTP client used for
    /// status queries.
    ///
    /// # Errors
    /// Returns `RadioError` if a station entry is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &AppConfig, config_dir: &Path) -> Result<Self> {
        let stations = config
            .stations
            .iter()
            .map(|s| Station::from_config(s, &config.radio, config_dir))
            .collect::<Result<Vec<_>>>()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.radio.status_timeout_secs))
            .user_agent(concat!("radiod/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(
            "registry: {} stations ({})",
            stations.len(),
            stations.iter().map(Station::name).collect::<Vec<_>>().join(", ")
        );

        Self::new(stations, client)
    }

    pub fn current(&self) -> &Station {
        &self.stations[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Move the dial by `step` stations, wrapping at both ends.
    pub fn advance(&mut self, step: isize) -> &Station {
        let len = self.stations.len() as isize;
        self.index = (self.index as isize + step).rem_euclid(len) as usize;
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::LaunchSpec;
    use crate::station::StatusSource;

    fn registry(n: usize) -> Registry {
        let stations = (0..n)
            .map(|i| {
                Station::new(
                    format!("S{i}"),
                    LaunchSpec::new("true", Vec::<String>::new()),
                    StatusSource::None,
                )
            })
            .collect();
        Registry::new(stations, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn empty_registry_rejected() {
        assert!(Registry::new(Vec::new(), reqwest::Client::new()).is_err());
    }

    #[test]
    fn advance_wraps_both_ends() {
        let mut reg = registry(4);
        assert_eq!(reg.index(), 0);
        assert_eq!(reg.advance(-1).name(), "S3");
        assert_eq!(reg.index(), 3);
        assert_eq!(reg.advance(1).name(), "S0");
        assert_eq!(reg.advance(5).name(), "S1");
        assert_eq!(reg.advance(-6).name(), "S3");
    }

    #[test]
    fn advance_round_trips_from_every_index() {
        for n in 1..=5 {
            let mut reg = registry(n);
            for start in 0..n {
                while reg.index() != start {
                    reg.advance(1);
                }
                reg.advance(1);
                reg.advance(-1);
                assert_eq!(reg.index(), start, "n={n} +1/-1");
                reg.advance(-1);
                reg.advance(1);
                assert_eq!(reg.index(), start, "n={n} -1/+1");
            }
        }
    }

    #[test]
    fn single_station_stays_put() {
        let mut reg = registry(1);
        reg.advance(1);
        assert_eq!(reg.index(), 0);
        reg.advance(-1);
        assert_eq!(reg.index(), 0);
    }

    #[test]
    fn build_from_config() {
        let config = crate::config::parse(
            r#"
[[stations]]
kind = "kfjc"

[[stations]]
kind = "nts"
channel = 2

[[stations]]
kind = "bluetooth"
"#,
        )
        .unwrap();
        let reg = Registry::from_config(&config, Path::new("/etc/radiod")).unwrap();
        let names: Vec<_> = reg.stations().iter().map(Station::name).collect();
        assert_eq!(names, ["KFJC", "NTS 2", "Bluetooth"]);
    }
}
