use std::sync::Arc;

use axum::{
    body::StreamBody,
    extract::{DefaultBodyLimit, Json, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tokio_util::io::ReaderStream;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::audio_processor::{build_http_client, process_trim_job, TrimOutput};
use crate::config::ServerConfig;
use crate::error::{Result, TrimError};
use crate::models::{InputSource, TimeRange, TrimJob, TrimRequest};

/// Read-only state shared by all requests
pub struct AppState {
    pub config: ServerConfig,
    pub client: Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let client = build_http_client(&config.download)?;
        Ok(Self { config, client })
    }
}

pub fn create_routes(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.upload.max_body_bytes);

    Router::new()
        .route("/health", get(health))
        .route("/trim", post(trim))
        .route("/trim_upload", post(trim_upload).layer(upload_limit))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

// Trim a remote file given by URL
async fn trim(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TrimRequest>,
) -> Result<Response> {
    let job = TrimJob::from_request(payload)?;
    let output = process_trim_job(job, &state.client, &state.config).await?;
    file_response(output).await
}

// Trim a file sent as multipart form data
async fn trim_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response> {
    let job = read_upload_form(multipart).await?;
    let output = process_trim_job(job, &state.client, &state.config).await?;
    file_response(output).await
}

async fn read_upload_form(mut multipart: Multipart) -> Result<TrimJob> {
    let mut file = None;
    let mut start = None;
    let mut end = None;
    let mut scene_index = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TrimError::InvalidForm(format!("error reading field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    TrimError::InvalidForm(format!("error reading file bytes: {e}"))
                })?;
                file = Some((file_name, data));
            }
            "start" | "end" | "scene_index" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| TrimError::InvalidForm(format!("error reading {name}: {e}")))?;
                let text = text.trim();
                match name.as_str() {
                    "start" => start = Some(parse_field::<f64>(&name, text)?),
                    "end" => end = Some(parse_field::<f64>(&name, text)?),
                    _ if text.is_empty() => scene_index = None,
                    _ => scene_index = Some(parse_field::<i64>(&name, text)?),
                }
            }
            _ => tracing::debug!("ignoring form field {:?}", name),
        }
    }

    let start = start.ok_or_else(|| missing_field("start"))?;
    let end = end.ok_or_else(|| missing_field("end"))?;
    let range = TimeRange::new(start, end)?;
    let (file_name, data) = file.ok_or_else(|| missing_field("file"))?;

    Ok(TrimJob {
        source: InputSource::Upload { file_name, data },
        range,
        scene_index,
    })
}

fn parse_field<T: std::str::FromStr>(name: &str, text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| TrimError::InvalidForm(format!("{name} is not a valid number: {text:?}")))
}

fn missing_field(name: &str) -> TrimError {
    TrimError::InvalidForm(format!("missing field: {name}"))
}

/// Streams the output file; the workspace is removed once the body is dropped.
async fn file_response(output: TrimOutput) -> Result<Response> {
    let TrimOutput { result, workspace } = output;
    let len = tokio::fs::metadata(&result.path).await?.len();
    let file = workspace.into_file(&result.path).await?;
    let body = StreamBody::new(ReaderStream::new(file));

    let headers = [
        (header::CONTENT_TYPE, result.media_type.to_string()),
        (header::CONTENT_LENGTH, len.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", result.file_name),
        ),
    ];
    Ok((headers, body).into_response())
}
