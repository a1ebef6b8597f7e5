use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::utils::session_store::SessionStore;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
    #[schema(example = "admin")]
    pub username: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstructionStatus {
    #[schema(example = "schedule")]
    pub key: String,
    pub show: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_seen: Option<DateTime<Utc>>,
}

fn instruction_status_of(store: &SessionStore, key: String) -> InstructionStatus {
    InstructionStatus {
        show: store.should_show_instruction(&key, Utc::now()),
        last_seen: store.instruction_last_seen(&key),
        key,
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    pub signed_in: bool,
    #[schema(example = "admin")]
    pub username: Option<String>,
}

/// Who is signed in upstream
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Session state", body = SessionInfo)
    ),
    tag = "Session"
)]
pub async fn session_info(store: web::Data<SessionStore>) -> HttpResponse {
    let data = store.snapshot();
    HttpResponse::Ok().json(SessionInfo {
        signed_in: data.auth_token.is_some(),
        username: data.username,
    })
}

/// Store the upstream bearer token
#[utoipa::path(
    put,
    path = "/api/session/token",
    request_body = TokenRequest,
    responses(
        (status = 204, description = "Token stored"),
        (status = 400, description = "Empty token")
    ),
    tag = "Session"
)]
pub async fn set_token(
    store: web::Data<SessionStore>,
    body: web::Json<TokenRequest>,
) -> Result<HttpResponse, ApiError> {
    let TokenRequest { token, username } = body.into_inner();
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Token must not be empty".to_string()));
    }
    store.set_token(token, username)?;
    info!("Upstream token updated");
    Ok(HttpResponse::NoContent().finish())
}

/// Forget the upstream bearer token
#[utoipa::path(
    delete,
    path = "/api/session/token",
    responses(
        (status = 204, description = "Token cleared")
    ),
    tag = "Session"
)]
pub async fn clear_token(store: web::Data<SessionStore>) -> Result<HttpResponse, ApiError> {
    store.clear_token()?;
    Ok(HttpResponse::NoContent().finish())
}

/// Whether a first-visit instruction should be shown
#[utoipa::path(
    get,
    path = "/api/session/instructions/{key}",
    params(("key" = String, Path, description = "Instruction key")),
    responses(
        (status = 200, description = "Instruction status", body = InstructionStatus)
    ),
    tag = "Session"
)]
pub async fn instruction_status(
    store: web::Data<SessionStore>,
    path: web::Path<String>,
) -> HttpResponse {
    HttpResponse::Ok().json(instruction_status_of(&store, path.into_inner()))
}

/// Record that an instruction was shown now
#[utoipa::path(
    post,
    path = "/api/session/instructions/{key}/seen",
    params(("key" = String, Path, description = "Instruction key")),
    responses(
        (status = 200, description = "Instruction status", body = InstructionStatus)
    ),
    tag = "Session"
)]
pub async fn mark_instruction_seen(
    store: web::Data<SessionStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let key = path.into_inner();
    store.mark_instruction_seen(&key, Utc::now())?;
    Ok(HttpResponse::Ok().json(instruction_status_of(&store, key)))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    use crate::test_support::{TestState, TestUpstream, peer};

    #[actix_web::test]
    async fn token_round_trip() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::put().uri("/api/session/token"))
            .set_json(json!({"token": " abc ", "username": "admin"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.store.token().as_deref(), Some("abc"));

        let req = peer(test::TestRequest::get().uri("/api/session")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"signed_in": true, "username": "admin"}));

        let req = peer(test::TestRequest::put().uri("/api/session/token"))
            .set_json(json!({"token": "  "}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = peer(test::TestRequest::delete().uri("/api/session/token")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.store.token(), None);
    }

    #[actix_web::test]
    async fn instruction_is_hidden_once_seen() {
        let upstream = TestUpstream::start();
        let state = TestState::new(&upstream);
        let app = test::init_service(App::new().configure(|cfg| state.register(cfg))).await;

        let req = peer(test::TestRequest::get().uri("/api/session/instructions/schedule")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["show"], true);
        assert_eq!(body["last_seen"], Value::Null);

        let req =
            peer(test::TestRequest::post().uri("/api/session/instructions/schedule/seen")).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["show"], false);
        assert!(body["last_seen"].is_string());
    }
}
