//! # Detection Endpoints
//!
//! Three intake variants feed the same pipeline:
//! - `POST /api/v1/detect` — multipart upload, file field named "file"
//! - `POST /api/v1/detect/base64` — JSON body carrying a base64 payload
//! - `POST /api/v1/detect/url` — JSON body naming a URL to fetch
//!
//! Whatever the intake, the bytes go through decode → resample → validate →
//! MFCC extraction → both classifiers, and the response carries the verdict
//! plus request metadata.

use crate::audio;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::Engine;
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// JSON body for the base64 variant.
#[derive(Debug, Deserialize)]
pub struct Base64Request {
    pub audio_base64: String,
    pub filename: Option<String>,
}

/// JSON body for the URL-fetch variant.
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

/// Multipart upload variant.
pub async fn detect_upload(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let max_bytes = state.get_config().limits.max_upload_bytes;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|name| name.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(format!("Upload stream error: {}", e)))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "Uploaded file exceeds the {} byte limit",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        file_bytes = Some(bytes);
    }

    let bytes = file_bytes.ok_or_else(|| AppError::ValidationError("No file uploaded".to_string()))?;

    run_detection(&state, bytes, filename, "multipart").await
}

/// Base64 JSON variant. Accepts raw base64 or a `data:` URL payload.
pub async fn detect_base64(
    state: web::Data<AppState>,
    body: web::Json<Base64Request>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();

    // Browsers send "data:audio/wav;base64,<payload>"; keep just the payload.
    let encoded = match request.audio_base64.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => request.audio_base64.as_str(),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 audio payload: {}", e)))?;

    run_detection(&state, bytes, request.filename, "base64").await
}

/// URL-fetch variant: the server downloads the clip itself.
pub async fn detect_url(
    state: web::Data<AppState>,
    body: web::Json<UrlRequest>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    let limits = state.get_config().limits;

    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return Err(AppError::ValidationError(
            "Audio URL must use http or https".to_string(),
        ));
    }

    tracing::info!(url = %request.url, "Fetching remote audio clip");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(limits.fetch_timeout_secs))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(&request.url)
        .send()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to fetch audio URL: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::BadRequest(format!(
            "Audio URL returned status {}",
            response.status()
        )));
    }

    if let Some(length) = response.content_length() {
        if length as usize > limits.max_upload_bytes {
            return Err(AppError::ValidationError(format!(
                "Remote file exceeds the {} byte limit",
                limits.max_upload_bytes
            )));
        }
    }

    // Stream the body so a response without Content-Length cannot buffer
    // an unbounded payload before the size check.
    let mut body_stream = response.bytes_stream();
    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = body_stream
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read audio URL body: {}", e)))?
    {
        if bytes.len() + chunk.len() > limits.max_upload_bytes {
            return Err(AppError::ValidationError(format!(
                "Remote file exceeds the {} byte limit",
                limits.max_upload_bytes
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    let filename = request
        .url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string());

    run_detection(&state, bytes, filename, "url").await
}

/// Shared pipeline behind all three intake variants.
async fn run_detection(
    state: &web::Data<AppState>,
    bytes: Vec<u8>,
    filename: Option<String>,
    source: &str,
) -> AppResult<HttpResponse> {
    if bytes.is_empty() {
        return Err(AppError::ValidationError("No file uploaded".to_string()));
    }

    if bytes.len() > state.get_config().limits.max_upload_bytes {
        return Err(AppError::ValidationError(format!(
            "Audio payload exceeds the {} byte limit",
            state.get_config().limits.max_upload_bytes
        )));
    }

    let request_id = Uuid::new_v4();
    let size_bytes = bytes.len();
    let started = Instant::now();

    tracing::info!(
        request_id = %request_id,
        source,
        size_bytes,
        filename = filename.as_deref().unwrap_or("unknown"),
        "Detection request received"
    );

    state.detection_started();

    // Decoding, resampling and inference are CPU-bound, so they run on the
    // blocking pool instead of stalling the async executor.
    let audio_config = state.get_config().audio;
    let extractor = state.extractor.clone();
    let engine = state.engine.clone();

    let outcome = web::block(move || -> Result<(crate::detection::DetectionVerdict, f64), AppError> {
        let samples = audio::prepare_clip(&bytes, &audio_config)?;
        let duration_secs = samples.len() as f64 / audio_config.sample_rate as f64;

        let features = extractor.extract(&samples);
        let verdict = engine
            .classify(&features)
            .map_err(|e| AppError::ModelError(e.to_string()))?;

        Ok((verdict, duration_secs))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Detection task failed: {}", e)))
    .and_then(|inner| inner);

    state.detection_finished(outcome.is_ok());

    let (verdict, duration_secs) = outcome?;
    let processing_time_ms = started.elapsed().as_millis() as u64;

    tracing::info!(
        request_id = %request_id,
        classification = %verdict.classification,
        confidence = verdict.confidence_score,
        language = %verdict.detected_language,
        processing_time_ms,
        "Detection complete"
    );

    Ok(HttpResponse::Ok().json(json!({
        "request_id": request_id.to_string(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "classification": verdict.classification,
        "confidence_score": verdict.confidence_score,
        "detected_language": verdict.detected_language,
        "explanation": verdict.explanation,
        "processing_time_ms": processing_time_ms,
        "file_info": {
            "filename": filename,
            "source": source,
            "size_bytes": size_bytes,
            "duration_secs": duration_secs
        }
    })))
}

/// Root endpoint describing the service.
pub async fn service_info() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "service": "voiceguard-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "detect": "POST /api/v1/detect (multipart, field 'file')",
            "detect_base64": "POST /api/v1/detect/base64 (JSON: audio_base64, filename?)",
            "detect_url": "POST /api/v1/detect/url (JSON: url)",
            "health": "GET /api/v1/health",
            "metrics": "GET /api/v1/metrics",
            "config": "GET/PUT /api/v1/config"
        },
        "note": "Send an audio clip to receive a human-vs-AI verdict and the detected language."
    }))
}
