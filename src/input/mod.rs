pub mod buttons;
pub mod remote;

use crate::event::{Event, Input};
use tokio::sync::mpsc;
use tracing::debug;

/// Hand one event to the controller. Blocks while the controller is busy.
/// Returns `false` once the controller has gone away.
pub(crate) async fn forward(tx: &mpsc::Sender<Input>, event: Event, source: &'static str) -> bool {
    debug!("{source}: {event}");
    tx.send(Input::fire(event)).await.is_ok()
}
