use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::ai::reply::{ReplyError, FALLBACK_REPLY};
use crate::models::{DomainMode, MessageRole};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub domain_mode: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/chat").route(web::post().to(chat)));
}

async fn chat(state: web::Data<AppState>, body: web::Json<ChatRequest>) -> impl Responder {
    // Validation and lookup happen before any persistence side effect
    let (conversation_id, text) = match (
        body.conversation_id.as_deref().filter(|s| !s.trim().is_empty()),
        body.text.as_deref().filter(|s| !s.trim().is_empty()),
    ) {
        (Some(conversation_id), Some(text)) => (conversation_id, text),
        _ => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "conversationId e text são obrigatórios"}))
        }
    };

    let requested_mode = match &body.domain_mode {
        Some(raw) => match DomainMode::from_str(raw) {
            Some(mode) => Some(mode),
            None => {
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "domainMode inválido"}))
            }
        },
        None => None,
    };

    let conversation = match state.db.get_conversation(conversation_id) {
        Ok(Some(conversation)) => conversation,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(serde_json::json!({"error": "Conversation não encontrada"}))
        }
        Err(e) => {
            log::error!("Failed to load conversation {}: {}", conversation_id, e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}));
        }
    };

    if let Some(mode) = requested_mode {
        if mode != conversation.domain_mode {
            if let Err(e) = state.db.set_conversation_mode(&conversation.id, mode) {
                log::error!("Failed to update mode for {}: {}", conversation.id, e);
                return HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "Internal server error"}));
            }
        }
    }

    if let Err(e) = state.db.create_message(&conversation.id, MessageRole::User, text) {
        log::error!("Failed to persist inbound message: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({"error": "Internal server error"}));
    }

    let answer = match state.generator.generate_reply(&conversation.id, text).await {
        Ok(answer) => answer,
        Err(ReplyError::Generation(e)) => {
            // The inbound message is already durable; degrade to an apology
            // instead of failing the turn
            log::error!("Reply generation failed for {}: {}", conversation.id, e);
            return HttpResponse::Ok().json(serde_json::json!({"answer": FALLBACK_REPLY}));
        }
        Err(ReplyError::Persistence(e)) => {
            log::error!("History read failed for {}: {}", conversation.id, e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}));
        }
    };

    if let Err(e) = state.db.create_message(&conversation.id, MessageRole::Assistant, &answer) {
        log::error!("Failed to persist outbound message: {}", e);
        return HttpResponse::InternalServerError()
            .json(serde_json::json!({"error": "Internal server error"}));
    }

    HttpResponse::Ok().json(serde_json::json!({"answer": answer}))
}
