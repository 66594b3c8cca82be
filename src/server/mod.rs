//! HTTP front end
//!
//! `GET /` annotates the default example, `POST /` annotates the submitted
//! source (raw body or the `source` form field), `POST /api/annotate`
//! returns JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use typelens_core::page::{render_page, Template, DEFAULT_EXAMPLE};
use typelens_core::{Config, Typelens, TypelensError};

pub struct AppState {
    pub typelens: Typelens,
    pub template: Template,
    pub example: String,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self> {
        let template = Template::from_config(&config.server)?;
        let example = match &config.server.example {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read example {}", path.display()))?,
            None => DEFAULT_EXAMPLE.to_string(),
        };
        Ok(Self {
            typelens: Typelens::new(config),
            template,
            example,
        })
    }
}

pub async fn start_server(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config)?);

    let listener = TcpListener::bind(&addr).await.context("Failed to bind server")?;
    info!("[Server] typelens listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("[Server] Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("[Server] Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index).post(handle_submit))
        .route("/api/annotate", post(handle_api))
        .route("/health", get(handle_health))
        .with_state(state)
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Html<String> {
    render(&state, &state.example).await
}

async fn handle_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Html<String> {
    let source = extract_source(&headers, &body);
    render(&state, &source).await
}

async fn handle_api(State(state): State<Arc<AppState>>, body: String) -> (StatusCode, Json<Value>) {
    match state.typelens.collect_and_annotate(&body).await {
        Ok(annotation) => (StatusCode::OK, Json(json!(annotation))),
        Err(e) => {
            info!("[Server] Annotation failed: {}", e);
            (status_for(&e), Json(json!({ "error": e.user_message() })))
        }
    }
}

async fn render(state: &AppState, source: &str) -> Html<String> {
    let outcome = state.typelens.collect_and_annotate(source).await;
    if let Err(e) = &outcome {
        info!("[Server] Annotation failed: {}", e);
    }
    Html(render_page(&state.template, source, outcome.as_ref()))
}

/// Script faults are the caller's problem; everything else is ours
fn status_for(err: &TypelensError) -> StatusCode {
    if err.is_script_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::BAD_GATEWAY
    }
}

/// Source text from a raw body or a urlencoded `source` form field
pub fn extract_source(headers: &HeaderMap, body: &str) -> String {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        form_field(body, "source").unwrap_or_default()
    } else {
        body.to_string()
    }
}

fn form_field(body: &str, name: &str) -> Option<String> {
    body.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != name {
            return None;
        }
        let value = value.replace('+', " ");
        urlencoding::decode(&value).ok().map(|v| v.into_owned())
    })
}
