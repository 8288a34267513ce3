use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use dashboard_core::{Event, RenderOutcome};
use serde::Deserialize;
use shared::{
    domain::SessionId,
    error::{ApiError, ErrorCode},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod page;

use app_state::AppState;
use config::load_settings;

const SESSION_COOKIE: &str = "dashboard_session";
const MAX_FILENAME_BYTES: usize = 180;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SettingsForm {
    #[serde(default)]
    sheet_url: String,
    auto_refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FiltersForm {
    enabled: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    search: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let state = AppState::from_settings(&settings);
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, sheet_url = %settings.default_sheet_url, "dashboard listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(dashboard))
        .route("/chat", post(submit_chat))
        .route("/chat/clear", post(clear_chat))
        .route("/image", post(submit_image))
        .route("/image/clear", post(clear_image))
        .route("/settings", post(update_settings))
        .route("/filters", post(update_filters))
        .route("/refresh", post(refresh_data))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<PageQuery>,
) -> ApiResult<Response> {
    // An unparsable page number is treated as a plain view.
    let event = match q.page.as_deref().map(|page| page.trim().parse::<usize>()) {
        Some(Ok(page)) => Event::GoToPage(page),
        _ => Event::View,
    };
    render_pass(&state, &headers, event).await
}

async fn submit_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> ApiResult<Response> {
    render_pass(&state, &headers, Event::SubmitChat { text: form.message }).await
}

async fn clear_chat(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Response> {
    render_pass(&state, &headers, Event::ClearChatHistory).await
}

async fn submit_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut prompt = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().trim().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((filename, bytes.to_vec()));
            }
            Some("prompt") => prompt = field.text().await.map_err(multipart_error)?,
            _ => {}
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| validation_error("an image file is required"))?;
    // An empty upload is turned into a notice by the render pass.
    if !bytes.is_empty() {
        validate_filename(&filename)?;
    }

    render_pass(
        &state,
        &headers,
        Event::SubmitImage {
            bytes,
            filename,
            prompt,
        },
    )
    .await
}

async fn clear_image(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Response> {
    render_pass(&state, &headers, Event::ClearImageHistory).await
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SettingsForm>,
) -> ApiResult<Response> {
    let event = Event::UpdateSettings {
        sheet_url: form.sheet_url,
        auto_refresh: form.auto_refresh.is_some(),
    };
    render_pass(&state, &headers, event).await
}

async fn update_filters(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<FiltersForm>,
) -> ApiResult<Response> {
    let event = Event::UpdateFilters {
        enabled: form.enabled.is_some(),
        status: form.status,
        search: form.search,
    };
    render_pass(&state, &headers, event).await
}

async fn refresh_data(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Response> {
    render_pass(&state, &headers, Event::RefreshData).await
}

/// Runs one pass for the caller's session. A rerun is answered with a
/// redirect to `/`, so the browser immediately starts the next pass.
async fn render_pass(state: &Arc<AppState>, headers: &HeaderMap, event: Event) -> ApiResult<Response> {
    let (handle, created) = state
        .sessions
        .resolve(session_from_headers(headers), Instant::now())
        .await;

    let event = handle.admit(event);

    // Detached so a dropped connection cannot cancel a webhook call mid-flight.
    let pass = state.pass.clone();
    let session = handle.clone();
    let outcome = tokio::spawn(async move {
        let mut store = session.store.lock().await;
        pass.run(&mut store, event, Utc::now()).await
    })
    .await
    .map_err(|e| {
        error!(session_id = %handle.id, error = %e, "render pass task failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, "render pass failed")),
        )
    })?;

    let mut response = match outcome {
        RenderOutcome::Rerun => Redirect::to("/").into_response(),
        RenderOutcome::Page(view) => Html(page::render(&view)).into_response(),
    };
    if created {
        let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", handle.id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}

fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find_map(SessionId::parse)
}

fn validate_filename(filename: &str) -> ApiResult<()> {
    if filename.is_empty() {
        return Err(validation_error("filename is required"));
    }
    if filename.len() > MAX_FILENAME_BYTES {
        return Err(validation_error("filename is too long"));
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err(validation_error("filename must not contain path separators"));
    }
    Ok(())
}

fn validation_error(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(ErrorCode::Validation, message)),
    )
}

fn multipart_error(e: MultipartError) -> (StatusCode, Json<ApiError>) {
    let status = e.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::PayloadTooLarge
    } else {
        ErrorCode::Validation
    };
    (status, Json(ApiError::new(code, e.body_text())))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
