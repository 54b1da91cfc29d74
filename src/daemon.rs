use crate::config::resolve;
use crate::config::schema::{AppConfig, DisplayBackend, DisplayConfig};
use crate::controller::{Controller, Settings};
use crate::display::{DisplayDevice, LogDevice, NullDevice, PngDevice, Surface};
use crate::error::Result;
use crate::event::{Input, RadioStatus};
use crate::input::buttons::ButtonSource;
use crate::input::remote::RemoteSource;
use crate::mixer::Amixer;
use crate::render::Fonts;
use crate::station::Registry;
use crate::web::{self, WebState};
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the radio until a signal arrives or the controller stops.
///
/// Every adapter is opened before anything is spawned, so a missing device,
/// socket or port fails startup.
///
/// # Errors
/// Returns `RadioError` if an adapter cannot be opened or a station fails to
/// launch.
pub async fn run(config: AppConfig, config_path: &Path) -> Result<()> {
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let registry = Registry::from_config(&config, config_dir)?;
    let display = Surface::new(open_display(&config.display, config_dir)?);
    let mixer = Box::new(Amixer::new(&config.mixer));

    let buttons = match config.buttons {
        Some(ref cfg) => Some(ButtonSource::open(cfg).await?),
        None => None,
    };
    let remote = match config.remote {
        Some(ref cfg) => Some(RemoteSource::open(cfg).await?),
        None => None,
    };
    let listener = if config.web.enabled {
        Some(web::bind(&config.web).await?)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<Input>(config.radio.event_buffer);
    let published = Arc::new(ArcSwap::from_pointee(RadioStatus::off()));

    let mut handles = vec![spawn_signal_handler(&cancel)];
    if let Some(source) = buttons {
        handles.push(spawn_adapter("buttons", &cancel, source.run(tx.clone(), cancel.clone())));
    }
    if let Some(source) = remote {
        handles.push(spawn_adapter("remote", &cancel, source.run(tx.clone(), cancel.clone())));
    }
    if let Some(listener) = listener {
        let state = WebState::new(tx.clone(), Arc::clone(&published));
        handles.push(spawn_adapter("web", &cancel, web::serve(listener, state, cancel.clone())));
    }
    drop(tx);

    let controller = Controller::new(
        registry,
        display,
        mixer,
        published,
        Settings::from(&config.radio),
    );

    info!("radiod running");
    let outcome = controller.run(rx, cancel.clone()).await;

    info!("daemon shutting down...");
    cancel.cancel();

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles)).await;

    info!("daemon stopped");
    outcome
}

fn open_display(config: &DisplayConfig, config_dir: &Path) -> Result<Box<dyn DisplayDevice>> {
    let device: Box<dyn DisplayDevice> = match config.backend {
        DisplayBackend::Log => Box::new(LogDevice),
        DisplayBackend::None => Box::new(NullDevice),
        DisplayBackend::Png => {
            let regular = config.font.as_deref().map(|p| resolve(config_dir, p));
            let bold = config.bold_font.as_deref().map(|p| resolve(config_dir, p));
            let fonts = Fonts::load(regular.as_deref(), bold.as_deref())?;
            Box::new(PngDevice::new(config.png_path.clone(), fonts))
        }
    };
    info!("display backend: {:?}", config.backend);
    Ok(device)
}

/// Run an input adapter. Its failure is logged and ends the daemon.
fn spawn_adapter<F>(name: &'static str, cancel: &CancellationToken, task: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = task.await {
            error!("{name} error: {e}");
            cancel.cancel();
        }
    })
}

fn spawn_signal_handler(cancel: &CancellationToken) -> JoinHandle<()> {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    error!("cannot install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = cancel.cancelled() => {}
            _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
            () = terminate => info!("received SIGTERM, shutting down"),
        }
        cancel.cancel();
    })
}
