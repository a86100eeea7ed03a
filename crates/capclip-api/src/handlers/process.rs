//! `POST /process`: run the clip pipeline for one request.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use capclip_models::{ProcessRequest, ProcessResponse};
use capclip_pipeline::{CancelSignal, Pipeline, PipelineDeps, RunLogger};

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Run the pipeline synchronously and answer with the published clips.
///
/// If the handler future is dropped (client gone, request timeout) the run's
/// cancel signal flips, which kills in-flight ffmpeg children and lets the
/// scratch workspace drop.
pub async fn process(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> ApiResult<Json<ProcessResponse>> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
    let payload = unwrap_envelope(payload)?;

    let request: ProcessRequest = serde_json::from_value(payload)
        .map_err(|e| ApiError::bad_request(format!("Invalid request: {}", e)))?;
    let request = request.validate(state.pipeline.defaults)?;

    let logger = match request_id {
        Some(Extension(RequestId(id))) => RunLogger::with_request_id(&id, request.source.kind()),
        None => RunLogger::new(request.source.kind()),
    };
    info!(
        request_id = %logger.request_id(),
        segments = request.segments.len(),
        words = request.words.len(),
        "Processing request"
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    // Fires on every exit; only observed while the run is still in flight
    let _cancel_on_drop = scopeguard::guard(cancel_tx, |tx| {
        let _ = tx.send(true);
    });

    let deps = PipelineDeps {
        transcoder: Arc::new(state.transcoder.with_cancel(cancel_rx.clone())),
        stores: Arc::clone(&state.stores),
        downloader: Arc::clone(&state.downloader),
    };
    let pipeline = Pipeline::new(Arc::clone(&state.pipeline), deps);

    let report = pipeline
        .run(&request, &CancelSignal::new(cancel_rx), &logger)
        .await?;

    Ok(Json(report.into_response()))
}

/// Unwrap an optional single-level `{"body": ...}` envelope.
///
/// The inner body may be an object or a JSON-encoded string of one.
fn unwrap_envelope(payload: Value) -> ApiResult<Value> {
    match payload {
        Value::Object(mut map) if map.contains_key("body") => match map.remove("body") {
            Some(Value::String(raw)) => {
                debug!("Unwrapping string-encoded body envelope");
                serde_json::from_str(&raw)
                    .map_err(|e| ApiError::bad_request(format!("Invalid JSON in body: {}", e)))
            }
            Some(inner @ Value::Object(_)) => Ok(inner),
            _ => Err(ApiError::bad_request("body envelope must be an object")),
        },
        Value::Object(map) => Ok(Value::Object(map)),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}
