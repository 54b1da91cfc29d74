use crate::config::schema::WebConfig;
use crate::error::{RadioError, Result};
use crate::event::{Event, Input, RadioStatus};
use arc_swap::ArcSwap;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Buttons on the remote-control page, in display order.
const ACTIONS: [(&str, Event, &str); 6] = [
    ("prev", Event::Left, "&#9664; Prev"),
    ("power", Event::Power, "Power"),
    ("next", Event::Right, "Next &#9654;"),
    ("vol_down", Event::Down, "Vol &minus;"),
    ("menu", Event::Menu, "Menu"),
    ("vol_up", Event::Up, "Vol +"),
];

#[derive(Clone)]
pub struct WebState {
    tx: mpsc::Sender<Input>,
    published: Arc<ArcSwap<RadioStatus>>,
}

impl WebState {
    pub fn new(tx: mpsc::Sender<Input>, published: Arc<ArcSwap<RadioStatus>>) -> Self {
        Self { tx, published }
    }

    /// Hand `event` to the controller and wait for the status it produces.
    /// Each call owns its reply channel.
    async fn rendezvous(&self, event: Event) -> std::result::Result<RadioStatus, StatusCode> {
        let (input, reply) = Input::request(event);
        if self.tx.send(input).await.is_err() {
            warn!("web: controller is gone, dropping {event}");
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        reply.await.map_err(|_| {
            warn!("web: controller dropped reply to {event}");
            StatusCode::SERVICE_UNAVAILABLE
        })
    }
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/api/status", get(status_json))
        .route("/api/event/:name", post(event_json))
        .route("/:action", get(action).post(action))
        .with_state(state)
}

/// Bind the listener. Done at startup so a taken port is fatal.
///
/// # Errors
/// Returns `RadioError::Config` if the address can't be bound.
pub async fn bind(config: &WebConfig) -> Result<TcpListener> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        RadioError::Config(format!("cannot bind web server on {addr}: {e}"))
    })?;
    info!("web: listening on http://{addr}");
    Ok(listener)
}

/// Serve until cancelled.
///
/// # Errors
/// Returns `RadioError::Io` if the server fails.
pub async fn serve(listener: TcpListener, state: WebState, cancel: CancellationToken) -> Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    info!("web: stopped");
    Ok(())
}

async fn page(State(state): State<WebState>) -> Html<String> {
    Html(render_page(&state.published.load()))
}

async fn action(State(state): State<WebState>, Path(name): Path<String>) -> Response {
    let Some(event) = web_action(&name) else {
        debug!("web: unknown action {name:?}");
        return StatusCode::NOT_FOUND.into_response();
    };
    match state.rendezvous(event).await {
        Ok(_) => Redirect::temporary("/").into_response(),
        Err(code) => code.into_response(),
    }
}

async fn status_json(State(state): State<WebState>) -> Json<RadioStatus> {
    Json(RadioStatus::clone(&state.published.load()))
}

async fn event_json(State(state): State<WebState>, Path(name): Path<String>) -> Response {
    let event = match name.parse::<Event>() {
        Ok(event) => event,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    };
    match state.rendezvous(event).await {
        Ok(status) => Json(status).into_response(),
        Err(code) => code.into_response(),
    }
}

fn web_action(name: &str) -> Option<Event> {
    ACTIONS
        .iter()
        .find(|(path, _, _)| *path == name)
        .map(|&(_, event, _)| event)
}

fn render_page(status: &RadioStatus) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <meta http-equiv=\"refresh\" content=\"30\">\
         <title>Radio</title>\
         <style>body{font-family:sans-serif;max-width:24em;margin:1em auto}\
         form{display:inline}button{width:7em;height:3em;margin:.2em}</style>\
         </head><body>\n",
    );

    if status.power {
        let _ = write!(html, "<h1>{}</h1>\n<ul>\n", escape(&status.station));
        let s = &status.status;
        for line in [&s.show, &s.artist, &s.track, &s.album] {
            if !line.is_empty() {
                let _ = writeln!(html, "<li>{}</li>", escape(line));
            }
        }
        html.push_str("</ul>\n");
    } else {
        html.push_str("<h1>Off</h1>\n");
    }

    html.push_str("<div>\n");
    for (i, (path, _, label)) in ACTIONS.iter().enumerate() {
        let _ = writeln!(
            html,
            "<form method=\"post\" action=\"/{path}\"><button>{label}</button></form>"
        );
        if i % 3 == 2 {
            html.push_str("<br>\n");
        }
    }
    html.push_str("</div>\n</body></html>\n");
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::Status;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    /// Stand-in controller: answers every request with the event name as
    /// the station, and records what it saw.
    fn fake_controller() -> (mpsc::Sender<Input>, tokio::task::JoinHandle<Vec<Event>>) {
        let (tx, mut rx) = mpsc::channel::<Input>(1);
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(input) = rx.recv().await {
                seen.push(input.event);
                if let Some(reply) = input.reply {
                    let _ = reply.send(RadioStatus {
                        power: true,
                        station: input.event.name().to_string(),
                        status: Status::default(),
                    });
                }
            }
            seen
        });
        (tx, handle)
    }

    fn published(status: RadioStatus) -> Arc<ArcSwap<RadioStatus>> {
        Arc::new(ArcSwap::from_pointee(status))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn page_reads_published_status_only() {
        let (tx, mut rx) = mpsc::channel(1);
        let status = RadioStatus {
            power: true,
            station: "WFMU".into(),
            status: Status {
                show: "Wake & Bake".into(),
                artist: "<Unknown>".into(),
                ..Status::default()
            },
        };
        let app = router(WebState::new(tx, published(status)));

        let response = app.oneshot(request("GET", "/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<h1>WFMU</h1>"));
        assert!(body.contains("Wake &amp; Bake"));
        assert!(body.contains("&lt;Unknown&gt;"));
        assert!(body.contains("action=\"/vol_up\""));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn page_when_off() {
        let (tx, _rx) = mpsc::channel(1);
        let app = router(WebState::new(tx, published(RadioStatus::off())));
        let body = body_text(app.oneshot(request("GET", "/")).await.unwrap()).await;
        assert!(body.contains("<h1>Off</h1>"));
    }

    #[tokio::test]
    async fn action_waits_for_reply_then_redirects() {
        let (tx, controller) = fake_controller();
        let app = router(WebState::new(tx, published(RadioStatus::off())));

        for (method, uri) in [("POST", "/next"), ("GET", "/vol_up"), ("POST", "/power")] {
            let response = app.clone().oneshot(request(method, uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.headers()[header::LOCATION], "/");
        }

        drop(app);
        let seen = controller.await.unwrap();
        assert_eq!(seen, vec![Event::Right, Event::Up, Event::Power]);
    }

    #[tokio::test]
    async fn unknown_action_is_404() {
        let (tx, mut rx) = mpsc::channel(1);
        let app = router(WebState::new(tx, published(RadioStatus::off())));
        let response = app.oneshot(request("POST", "/eject")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn controller_gone_is_503() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let app = router(WebState::new(tx, published(RadioStatus::off())));
        let response = app.oneshot(request("POST", "/next")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn dropped_reply_is_503() {
        let (tx, mut rx) = mpsc::channel::<Input>(1);
        tokio::spawn(async move {
            while let Some(input) = rx.recv().await {
                drop(input);
            }
        });
        let app = router(WebState::new(tx, published(RadioStatus::off())));
        let response = app.oneshot(request("POST", "/menu")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn api_status_is_json() {
        let (tx, _rx) = mpsc::channel(1);
        let status = RadioStatus {
            power: true,
            station: "KFJC".into(),
            status: Status::diagnostic("status timed out"),
        };
        let app = router(WebState::new(tx, published(status)));
        let body = body_text(app.oneshot(request("GET", "/api/status")).await.unwrap()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["power"], true);
        assert_eq!(json["station"], "KFJC");
        assert_eq!(json["status"]["show"], "status timed out");
    }

    #[tokio::test]
    async fn api_event_returns_reply() {
        let (tx, _controller) = fake_controller();
        let app = router(WebState::new(tx, published(RadioStatus::off())));

        let response = app.clone().oneshot(request("POST", "/api/event/left")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["station"], "left");

        let response = app.oneshot(request("POST", "/api/event/eject")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn concurrent_requests_get_their_own_replies() {
        let (tx, _controller) = fake_controller();
        let app = router(WebState::new(tx, published(RadioStatus::off())));

        let calls = ["up", "down", "left", "right", "menu"].map(|name| {
            let app = app.clone();
            tokio::spawn(async move {
                let uri = format!("/api/event/{name}");
                let response = app.oneshot(request("POST", &uri)).await.unwrap();
                let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
                (name, json["station"].as_str().unwrap_or_default().to_string())
            })
        });

        for call in calls {
            let (sent, got) = call.await.unwrap();
            assert_eq!(sent, got);
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
        assert_eq!(escape("Kraftwerk"), "Kraftwerk");
    }
}
