use crate::config::schema::RadioConfig;
use crate::display::{Surface, LINES};
use crate::error::Result;
use crate::event::{Event, Input, RadioStatus};
use crate::mixer::Mixer;
use crate::process::Supervisor;
use crate::station::{Registry, Status};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Width of the title line in characters; the station name is centered in it.
const TITLE_COLUMNS: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    Off,
    On,
}

/// Timings and step sizes.
#[derive(Debug, Clone)]
pub struct Settings {
    pub flash: Duration,
    pub volume_step: i16,
    pub tick: Duration,
    pub status_refresh: Duration,
    pub status_timeout: Duration,
}

impl From<&RadioConfig> for Settings {
    fn from(cfg: &RadioConfig) -> Self {
        Self {
            flash: Duration::from_millis(cfg.flash_ms),
            volume_step: i16::from(cfg.volume_step),
            tick: Duration::from_secs(cfg.tick_interval_secs),
            status_refresh: Duration::from_secs(cfg.status_refresh_secs),
            status_timeout: Duration::from_secs(cfg.status_timeout_secs),
        }
    }
}

/// The radio's state machine.
///
/// A single task owns the controller and feeds it one `Input` at a time, so
/// power state, the station cursor, the player process and the display are
/// never touched concurrently.
pub struct Controller {
    registry: Registry,
    supervisor: Supervisor,
    display: Surface,
    mixer: Box<dyn Mixer>,
    published: Arc<ArcSwap<RadioStatus>>,
    settings: Settings,
    power: Power,
    status: Status,
    status_at: Option<Instant>,
}

impl Controller {
    pub fn new(
        registry: Registry,
        display: Surface,
        mixer: Box<dyn Mixer>,
        published: Arc<ArcSwap<RadioStatus>>,
        settings: Settings,
    ) -> Self {
        Self {
            registry,
            supervisor: Supervisor::new(),
            display,
            mixer,
            published,
            settings,
            power: Power::Off,
            status: Status::default(),
            status_at: None,
        }
    }

    pub fn power(&self) -> Power {
        self.power
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Consume inputs until cancelled, the mailbox closes, or a station
    /// fails to launch. The player is stopped and the screen cleared on
    /// every exit path.
    ///
    /// # Errors
    /// Returns `RadioError::Launch` if a playback command could not start.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>, cancel: CancellationToken) -> Result<()> {
        self.update_display();
        self.publish();

        let mut ticker = tokio::time::interval(self.settings.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!("controller running, {} stations", self.registry.len());

        let outcome = loop {
            let deadline = self.display.next_deadline();
            tokio::select! {
                () = cancel.cancelled() => break Ok(()),
                input = inputs.recv() => {
                    let Some(input) = input else {
                        info!("input channel closed");
                        break Ok(());
                    };
                    if let Err(e) = self.dispatch(input).await {
                        break Err(e);
                    }
                }
                _ = ticker.tick() => self.tick().await,
                () = wait_until(deadline) => self.flush_display(),
            }
        };

        self.shutdown().await;
        outcome
    }

    /// Handle one input and answer its reply slot, if any. The reply is sent
    /// on every path, including failures, so a waiting web request never
    /// hangs.
    ///
    /// # Errors
    /// Propagates the error from `handle_event`.
    pub async fn dispatch(&mut self, input: Input) -> Result<()> {
        let Input { event, reply } = input;
        let result = self.handle_event(event).await;

        if let Some(reply) = reply {
            let snapshot = match &result {
                Ok(snapshot) => snapshot.clone(),
                Err(_) => self.snapshot(),
            };
            if reply.send(snapshot).is_err() {
                debug!("web client went away before reply to {event}");
            }
        }

        result.map(|_| ())
    }

    /// Apply one event and return the resulting status.
    ///
    /// # Errors
    /// Returns `RadioError::Launch` if a station could not be started; the
    /// radio is left off with no player running.
    pub async fn handle_event(&mut self, event: Event) -> Result<RadioStatus> {
        debug!("event {event} while {:?}", self.power);

        // Power first: it must work while off.
        match (self.power, event) {
            (_, Event::Power) => self.toggle_power().await?,
            (Power::Off, _) => debug!("ignoring {event} while off"),
            (Power::On, Event::Left) => self.turn_dial(-1).await?,
            (Power::On, Event::Right) => self.turn_dial(1).await?,
            (Power::On, Event::Up) => self.turn_volume(self.settings.volume_step).await,
            (Power::On, Event::Down) => self.turn_volume(-self.settings.volume_step).await,
            (Power::On, Event::Menu) => {}
        }

        self.update_display();
        Ok(self.publish())
    }

    /// Periodic refresh: re-query a stale status, redraw, republish.
    pub async fn tick(&mut self) {
        if self.power == Power::On && self.supervisor.has_exited() {
            // Stays on; the next station change or power cycle relaunches.
            self.status = Status::diagnostic("player exited");
            self.status_at = Some(Instant::now());
        } else if self.power == Power::On && self.status_is_stale() {
            self.refresh_status().await;
        }
        self.update_display();
        self.publish();
    }

    /// Push frames whose freeze has lapsed.
    pub fn flush_display(&mut self) {
        if let Err(e) = self.display.flush_due() {
            warn!("display: {e}");
        }
    }

    /// Stop the player and blank the screen.
    pub async fn shutdown(&mut self) {
        info!("controller shutting down");
        self.supervisor.stop().await;
        self.power = Power::Off;
        if let Err(e) = self.display.clear() {
            warn!("display: {e}");
        }
        self.publish();
    }

    /// Status as seen by web clients.
    pub fn snapshot(&self) -> RadioStatus {
        match self.power {
            Power::Off => RadioStatus::off(),
            Power::On => RadioStatus {
                power: true,
                station: self.registry.current().name().to_string(),
                status: self.status.clone(),
            },
        }
    }

    async fn toggle_power(&mut self) -> Result<()> {
        match self.power {
            Power::On => {
                info!("power off");
                self.supervisor.stop().await;
                self.power = Power::Off;
            }
            Power::Off => {
                info!("power on");
                self.play().await?;
                self.power = Power::On;
                self.refresh_status().await;
            }
        }
        Ok(())
    }

    async fn turn_dial(&mut self, step: isize) -> Result<()> {
        let name = self.registry.advance(step).name().to_string();
        info!("tuned to {name} ({}/{})", self.registry.index() + 1, self.registry.len());

        if let Err(e) = self.play().await {
            // The old player is already gone.
            self.power = Power::Off;
            return Err(e);
        }
        self.refresh_status().await;
        Ok(())
    }

    async fn turn_volume(&mut self, delta: i16) {
        let readout = match self.mixer.adjust(delta).await {
            Ok(level) => {
                info!("volume {level}");
                format!("Volume: {level}")
            }
            Err(e) => {
                warn!("volume change failed: {e}");
                "Volume: ?".to_string()
            }
        };

        self.display.clear_text();
        if let Err(e) = self.display.set_line(2, readout) {
            warn!("display: {e}");
        }
        self.render();
        self.display.freeze(self.settings.flash);
    }

    /// Start the current station and flash its logo.
    async fn play(&mut self) -> Result<()> {
        let station = self.registry.current();
        self.supervisor.play(station.launch()).await?;

        match station.logo() {
            Some(logo) => self.display.draw_bitmap(Arc::clone(logo)),
            None => {
                let mut lines: [String; LINES] = Default::default();
                lines[2] = centered(station.name());
                self.display.set_all(lines);
            }
        }
        self.render();
        self.display.freeze(self.settings.flash);
        Ok(())
    }

    async fn refresh_status(&mut self) {
        let station = self.registry.current();
        let client = self.registry.client();
        debug!("refreshing status for {}", station.name());

        self.status = match tokio::time::timeout(self.settings.status_timeout, station.status(client)).await {
            Ok(status) => status,
            Err(_) => {
                warn!("{} status timed out", station.name());
                Status::diagnostic("status timed out")
            }
        };
        self.status_at = Some(Instant::now());
    }

    fn status_is_stale(&self) -> bool {
        self.status_at
            .map_or(true, |at| at.elapsed() >= self.settings.status_refresh)
    }

    fn update_display(&mut self) {
        match self.power {
            Power::Off => self.show_clock(),
            Power::On => self.show_status(),
        }
    }

    fn show_status(&mut self) {
        let name = self.registry.current().name();
        self.display.set_all([
            centered(name),
            String::new(),
            self.status.show.clone(),
            self.status.artist.clone(),
            self.status.track.clone(),
            self.status.album.clone(),
        ]);
        self.render();
    }

    fn show_clock(&mut self) {
        let mut lines: [String; LINES] = Default::default();
        lines[1] = format!("  {}", chrono::Local::now().format("%b %-d %H:%M"));
        if let Some(ip) = outbound_ip() {
            lines[4] = format!("  {ip}");
        }
        self.display.set_all(lines);
        self.render();
    }

    fn render(&mut self) {
        if let Err(e) = self.display.render() {
            warn!("display: {e}");
        }
    }

    fn publish(&self) -> RadioStatus {
        let snapshot = self.snapshot();
        self.published.store(Arc::new(snapshot.clone()));
        snapshot
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn centered(name: &str) -> String {
    let pad = TITLE_COLUMNS.saturating_sub(name.chars().count()) / 2;
    format!("{}{name}", " ".repeat(pad))
}

/// Address of the interface that routes to the internet. No packets are
/// sent; connecting a UDP socket only selects a route.
fn outbound_ip() -> Option<std::net::IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
