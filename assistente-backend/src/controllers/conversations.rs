use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::models::DomainMode;
use crate::AppState;

/// Shared placeholder identity all web conversations hang on.
const WEB_USERNAME: &str = "web_default";
const WEB_USER_NAME: &str = "Web User";
const WEB_USER_EMAIL: &str = "web_default@example.com";

const DEFAULT_TITLE: &str = "Web chat";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub domain_mode: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/conversations").route(web::post().to(create_conversation)));
}

async fn create_conversation(
    state: web::Data<AppState>,
    body: Option<web::Json<CreateConversationRequest>>,
) -> impl Responder {
    // A missing body is treated as an empty request
    let body = body.map(web::Json::into_inner).unwrap_or_default();

    let domain_mode = match &body.domain_mode {
        Some(raw) => match DomainMode::from_str(raw) {
            Some(mode) => mode,
            None => {
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "domainMode inválido"}))
            }
        },
        None => DomainMode::Generic,
    };

    let user = match state
        .db
        .upsert_user_by_username(WEB_USERNAME, WEB_USER_NAME, WEB_USER_EMAIL)
    {
        Ok(user) => user,
        Err(e) => {
            log::error!("Failed to upsert web user: {}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}));
        }
    };

    let title = body.title.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_TITLE);

    match state.db.create_conversation(&user.id, title, domain_mode) {
        Ok(conversation) => HttpResponse::Ok().json(serde_json::json!({
            "id": conversation.id,
            "domainMode": conversation.domain_mode
        })),
        Err(e) => {
            log::error!("Failed to create conversation: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}
