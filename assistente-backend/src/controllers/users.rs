use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::get().to(list_users))
            .route(web::post().to(create_user)),
    );
}

async fn list_users(state: web::Data<AppState>) -> impl Responder {
    match state.db.list_users() {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => {
            log::error!("Failed to list users: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation)
}

async fn create_user(state: web::Data<AppState>, body: web::Json<CreateUserRequest>) -> impl Responder {
    let (name, username, email) = match (
        body.name.as_deref().filter(|s| !s.trim().is_empty()),
        body.username.as_deref().filter(|s| !s.trim().is_empty()),
        body.email.as_deref().filter(|s| !s.trim().is_empty()),
    ) {
        (Some(name), Some(username), Some(email)) => (name, username, email),
        _ => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "name, username e email são obrigatórios"}))
        }
    };

    match state.db.create_user(name, username, email) {
        Ok(user) => HttpResponse::Created().json(user),
        // The store's uniqueness verdict is surfaced, not swallowed
        Err(e) if is_constraint_violation(&e) => HttpResponse::Conflict()
            .json(serde_json::json!({"error": "username ou email já cadastrado"})),
        Err(e) => {
            log::error!("Failed to create user: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use std::sync::Arc;

    use crate::ai::{MockModelClient, ReplyGenerator};
    use crate::db::Database;
    use crate::AppState;

    fn test_state() -> web::Data<AppState> {
        let db = Arc::new(Database::new(":memory:").expect("in-memory db"));
        let generator = Arc::new(ReplyGenerator::new(
            db.clone(),
            Arc::new(MockModelClient::default()),
        ));
        web::Data::new(AppState { db, generator })
    }

    #[actix_web::test]
    async fn create_then_list_round_trips() {
        let state = test_state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(super::config)).await;

        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(serde_json::json!({
                "name": "Maria", "username": "maria", "email": "maria@example.com"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(created["username"], "maria");
        assert!(created["createdAt"].as_str().is_some());

        let req = test::TestRequest::get().uri("/users").to_request();
        let users: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(users.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn missing_fields_are_a_bad_request() {
        let state = test_state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(super::config)).await;

        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(serde_json::json!({"name": "Maria"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert!(state.db.list_users().expect("list").is_empty());
    }

    #[actix_web::test]
    async fn duplicate_username_is_a_conflict() {
        let state = test_state();
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(super::config)).await;

        let body = serde_json::json!({
            "name": "Maria", "username": "maria", "email": "maria@example.com"
        });
        let req = test::TestRequest::post().uri("/users").set_json(&body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/users").set_json(&body).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }
}
