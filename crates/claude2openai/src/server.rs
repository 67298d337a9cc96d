//! Actix Web HTTP server.
//!
//! Exposes OpenAI-compatible endpoints:
//! - `GET /`
//! - `GET /health`
//! - `GET /v1/models`
//! - `POST /v1/chat/completions`

use crate::{
    client::ClaudeClient,
    config::ProxyConfig,
    error::ProxyError,
    models::ModelCatalog,
    streaming::{self, ChunkTranslator},
    translation,
    types::ChatCompletionRequest,
};
use actix_cors::Cors;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

pub const WELCOME_MESSAGE: &str =
    "Welcome to Claude2OpenAI. https://github.com/missuo/claude2openai";

/// Request bodies may carry inline base64 images.
const JSON_BODY_LIMIT: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub catalog: ModelCatalog,
    pub client: ClaudeClient,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let client = ClaudeClient::new(
            &config.upstream_base_url,
            config.anthropic_version.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
        .context("failed to build reqwest client")?;

        Ok(Self {
            catalog: config.catalog(),
            config,
            client,
        })
    }
}

pub async fn serve(config: ProxyConfig) -> Result<()> {
    let addr = config.bind_addr();
    let state = web::Data::new(AppState::new(config)?);
    info!(
        addr = %addr,
        upstream = %state.client.messages_url(),
        default_model = %state.catalog.default_model(),
        "claude2openai listening"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(routes)
            .default_service(web::to(not_found))
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {}", addr))?
    .run()
    .await
    .context("server error")?;

    Ok(())
}

/// Route table, shared by [`serve`] and the service tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .content_type_required(false)
        .error_handler(|err, _req| ProxyError::InvalidRequest(err.to_string()).into());

    cfg.app_data(json_config)
        .route("/", web::get().to(welcome))
        .route("/health", web::get().to(health_check))
        .route("/v1/models", web::get().to(list_models))
        .route("/v1/chat/completions", web::post().to(chat_completions));
}

async fn welcome() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": WELCOME_MESSAGE }))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_models(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.catalog.to_model_list())
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "code": 404,
        "message": "Path not found",
    }))
}

fn parse_bearer_token(req: &HttpRequest) -> Result<&str, ProxyError> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(ProxyError::InvalidAuthorization)
}

async fn chat_completions(
    state: web::Data<AppState>,
    req_http: HttpRequest,
    body: web::Json<ChatCompletionRequest>,
) -> Result<HttpResponse, ProxyError> {
    let mut req = body.into_inner();
    let requested_model = std::mem::take(&mut req.model);
    req.model = state.catalog.resolve(&requested_model).to_string();

    info!(
        requested_model = %requested_model,
        model = %req.model,
        stream = req.stream,
        messages = req.messages.len(),
        "chat completion"
    );

    let claude_req = translation::to_claude_request(&req, state.config.default_max_tokens)?;
    let api_key = parse_bearer_token(&req_http)?;
    let created = chrono::Utc::now().timestamp();

    if req.stream {
        let upstream = state.client.send(&claude_req, api_key).await?;
        let translator = ChunkTranslator::new(req.model, created);
        let stream = streaming::handle_streaming(upstream, translator).map(|r| {
            r.map(web::Bytes::from).map_err(|e| {
                error!(error = %e, "stream translation error");
                actix_web::error::ErrorInternalServerError(e.to_string())
            })
        });

        return Ok(HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .streaming(stream));
    }

    let resp = state.client.create_message(&claude_req, api_key).await?;
    Ok(HttpResponse::Ok().json(translation::from_claude_response(resp, created)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_token_is_extracted() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer sk-ant-123"))
            .to_http_request();
        assert_eq!(parse_bearer_token(&req).unwrap(), "sk-ant-123");
    }

    #[test]
    fn missing_or_malformed_authorization_is_rejected() {
        let missing = TestRequest::default().to_http_request();
        assert!(matches!(
            parse_bearer_token(&missing),
            Err(ProxyError::InvalidAuthorization)
        ));

        let basic = TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert!(parse_bearer_token(&basic).is_err());

        let empty = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();
        assert!(parse_bearer_token(&empty).is_err());
    }
}
