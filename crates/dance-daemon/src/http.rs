use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use dance_core::identifier::parse_playlist_id;
use dance_core::protocol::{Command, DisplaySnapshot};
use dance_core::NextSource;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Clone)]
struct HttpState {
    state_rx: watch::Receiver<DisplaySnapshot>,
    command_tx: mpsc::Sender<Command>,
}

#[derive(Deserialize)]
struct OverwriteBody {
    enabled: bool,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistBody {
    #[serde(default)]
    input: String,
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_rx: watch::Receiver<DisplaySnapshot>,
    command_tx: mpsc::Sender<Command>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(HttpState {
            state_rx,
            command_tx,
        });

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/blackout/:on", post(set_blackout))
        .route("/api/overwrite", post(set_overwrite))
        .route("/api/overwrite/style/:idx", post(select_style))
        .route("/api/show-info/:on", post(set_show_info))
        .route("/api/next-source/:source", post(set_next_source))
        .route("/api/playlist", post(set_playlist))
        .route("/api/reload", post(reload))
        .route("/api/redraw", post(redraw))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn forward(state: &HttpState, cmd: Command) -> StatusCode {
    info!("HTTP API: {:?}", cmd);
    if state.command_tx.send(cmd).await.is_err() {
        error!("Failed to forward command, poller stopped");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::ACCEPTED
}

async fn get_state(State(state): State<HttpState>) -> Json<DisplaySnapshot> {
    let snapshot = state.state_rx.borrow().clone();
    Json(snapshot)
}

async fn set_blackout(State(state): State<HttpState>, Path(on): Path<bool>) -> StatusCode {
    forward(&state, Command::SetBlackout { on }).await
}

async fn set_overwrite(
    State(state): State<HttpState>,
    Json(body): Json<OverwriteBody>,
) -> StatusCode {
    let cmd = Command::SetOverwrite {
        enabled: body.enabled,
        text: body.text,
    };
    forward(&state, cmd).await
}

async fn select_style(State(state): State<HttpState>, Path(index): Path<usize>) -> StatusCode {
    forward(&state, Command::SelectOverwriteStyle { index }).await
}

async fn set_show_info(State(state): State<HttpState>, Path(on): Path<bool>) -> StatusCode {
    forward(&state, Command::SetShowTitleArtist { on }).await
}

async fn set_next_source(
    State(state): State<HttpState>,
    Path(source): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let source: NextSource = source
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;
    Ok(forward(&state, Command::SetNextSource { source }).await)
}

/// Rejects malformed identifiers here so the caller sees the reason; the
/// poller validates again and keeps the previous playlist either way.
async fn set_playlist(
    State(state): State<HttpState>,
    Json(body): Json<PlaylistBody>,
) -> Result<StatusCode, (StatusCode, String)> {
    if !body.input.trim().is_empty() {
        parse_playlist_id(&body.input).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    }
    Ok(forward(&state, Command::SetFallbackPlaylist { input: body.input }).await)
}

async fn reload(State(state): State<HttpState>) -> StatusCode {
    forward(&state, Command::ReloadLookup).await
}

async fn redraw(State(state): State<HttpState>) -> StatusCode {
    forward(&state, Command::Redraw).await
}
