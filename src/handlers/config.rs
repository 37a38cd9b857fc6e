use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "models": {
                "voice_model_path": config.models.voice_model_path,
                "language_model_path": config.models.language_model_path,
                "device": config.models.device
            },
            "audio": {
                "sample_rate": config.audio.sample_rate,
                "min_duration_secs": config.audio.min_duration_secs,
                "max_duration_secs": config.audio.max_duration_secs
            },
            "limits": {
                "max_upload_bytes": config.limits.max_upload_bytes,
                "fetch_timeout_secs": config.limits.fetch_timeout_secs
            }
        }
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": {
            "server": {
                "host": current_config.server.host,
                "port": current_config.server.port
            },
            "audio": {
                "sample_rate": current_config.audio.sample_rate,
                "min_duration_secs": current_config.audio.min_duration_secs,
                "max_duration_secs": current_config.audio.max_duration_secs
            },
            "limits": {
                "max_upload_bytes": current_config.limits.max_upload_bytes,
                "fetch_timeout_secs": current_config.limits.fetch_timeout_secs
            }
        }
    })))
}
