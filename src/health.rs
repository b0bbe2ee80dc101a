use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// `GET /health`: liveness report for load balancers and the PBX operator.
///
/// Reports the provider settings in use but never the API key.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let config = state.config();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "provider": {
            "name": "elevenlabs",
            "model_id": config.elevenlabs.model_id,
            "language_code": config.elevenlabs.language_code,
            "base_url": config.elevenlabs.base_url
        }
    }))
}
