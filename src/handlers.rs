use actix_web::{web, Error, HttpResponse, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SpamhamError;
use crate::models::Label;
use crate::service::SpamhamService;

pub fn routes(cfg: &mut web::ServiceConfig, max_payload: usize) {
    let json = web::JsonConfig::default()
        .limit(max_payload)
        .error_handler(|err, _req| {
            warn!("Rejected request body: {}", err);
            SpamhamError::BadRequest(err.to_string()).into()
        });

    cfg.service(
        web::resource("/api/spamham")
            .app_data(json)
            .route(web::post().to(spamham)),
    );
}

pub async fn spamham(
    service: web::Data<SpamhamService>,
    payload: web::Json<Vec<String>>,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let texts = payload.into_inner();
    debug!(%request_id, ?texts, "Received batch");

    // classification is CPU-bound, keep it off the async workers
    let service = service.into_inner();
    let count = texts.len();
    let labels = web::block(move || service.classify(texts.as_slice())).await??;

    let spam = labels.iter().filter(|&&label| label == Label::Spam).count();
    info!(%request_id, count, spam, "Classified batch");

    Ok(HttpResponse::Ok().json(labels))
}
