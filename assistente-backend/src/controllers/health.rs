use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;

/// Service name from Cargo.toml, available at compile time
pub const SERVICE: &str = env!("CARGO_PKG_NAME");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)));
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "service": SERVICE,
        "ts": Utc::now().to_rfc3339()
    }))
}
