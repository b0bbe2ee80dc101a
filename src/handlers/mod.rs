pub mod transcribe;

pub use transcribe::transcribe;

use crate::health;
use actix_web::web;

/// Register every route the service exposes.
///
/// The body size limit is attached to `/transcribe` only; oversized bodies are
/// rejected with 413 before the handler runs.
pub fn configure(cfg: &mut web::ServiceConfig, max_payload_bytes: usize) {
    cfg.service(
        web::resource("/transcribe")
            .app_data(web::PayloadConfig::new(max_payload_bytes))
            .route(web::post().to(transcribe)),
    )
    .route("/health", web::get().to(health::health_check));
}
