//! Backend HTTP server
//!
//! Serves the daemon catalog and the LLM-backed completion endpoints that
//! [`crate::services::HttpCollaborator`] talks to.

use super::wire::{
    AnswerRequest, AnswerResponse, DaemonChange, DaemonList, ErrorBody, HealthResponse,
    MessageResponse, RewriteResponse, SuggestionResponse, SuggestionsResponse, TextInput,
};
use crate::catalog::{DaemonCatalog, InMemoryCatalog};
use crate::config::AppConfig;
use crate::error::{CollaboratorError, Result};
use crate::services::completion::{CompletionService, LlmCompletionService, RewriteRequest};
use crate::services::llm::LlmService;
use crate::types::{NewDaemon, SuggestionPayload};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    catalog: InMemoryCatalog,
    completion: Arc<dyn CompletionService>,
    api_key_configured: bool,
}

impl AppState {
    pub fn new(
        catalog: InMemoryCatalog,
        completion: Arc<dyn CompletionService>,
        api_key_configured: bool,
    ) -> Self {
        Self {
            catalog,
            completion,
            api_key_configured,
        }
    }

    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }
}

/// Collaborator failure rendered as an HTTP error
#[derive(Debug)]
pub struct ApiError(CollaboratorError);

impl From<CollaboratorError> for ApiError {
    fn from(err: CollaboratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, field) = match &self.0 {
            CollaboratorError::Validation { field, .. } => (StatusCode::BAD_REQUEST, Some(field.clone())),
            CollaboratorError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            CollaboratorError::Protected(_) => (StatusCode::BAD_REQUEST, None),
            CollaboratorError::Request(_) => (StatusCode::BAD_GATEWAY, None),
        };
        let error = match &self.0 {
            CollaboratorError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error, field })).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Build the router over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        // Daemon catalog
        .route("/daemons", get(list_daemons_handler).post(create_daemon_handler))
        .route("/daemons/:daemon_id", delete(delete_daemon_handler))
        // Completions
        .route("/suggestion/:daemon_id", post(suggestion_handler))
        .route("/suggestions", post(suggestions_handler))
        .route("/apply-suggestion", post(apply_handler))
        .route("/answer", post(answer_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Backend server
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    /// Server with the built-in daemons and the LLM completion service
    pub fn new(config: AppConfig) -> Result<Self> {
        let catalog = InMemoryCatalog::with_builtins();
        let llm = LlmService::new(&config)?;
        let completion = LlmCompletionService::new(llm, Arc::new(catalog.clone()));
        let state = AppState::new(catalog, Arc::new(completion), config.has_api_key());
        Ok(Self { config, state })
    }

    /// Server over caller-supplied state
    pub fn with_state(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr()?;
        if !self.state.api_key_configured {
            warn!("OPENAI_API_KEY is not set; daemons will answer with fallbacks");
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Daemon backend listening on http://{}", addr);
        axum::serve(listener, router(self.state)).await?;
        Ok(())
    }
}

async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Daemon AI backend".to_string(),
    })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        daemons_count: state.catalog.len().await,
        api_key_configured: state.api_key_configured,
    })
}

async fn list_daemons_handler(State(state): State<AppState>) -> ApiResult<DaemonList> {
    let daemons = state.catalog.list().await?;
    Ok(Json(DaemonList { daemons }))
}

async fn create_daemon_handler(
    State(state): State<AppState>,
    Json(new): Json<NewDaemon>,
) -> ApiResult<DaemonChange> {
    let daemon = state.catalog.create(new).await?;
    Ok(Json(DaemonChange {
        id: daemon.id.clone(),
        status: "added".to_string(),
        daemon,
    }))
}

async fn delete_daemon_handler(
    State(state): State<AppState>,
    Path(daemon_id): Path<String>,
) -> ApiResult<DaemonChange> {
    let daemon = state.catalog.delete(&daemon_id).await?;
    Ok(Json(DaemonChange {
        id: daemon.id.clone(),
        status: "deleted".to_string(),
        daemon,
    }))
}

async fn suggestion_handler(
    State(state): State<AppState>,
    Path(daemon_id): Path<String>,
    Json(input): Json<TextInput>,
) -> ApiResult<SuggestionResponse> {
    let daemon = state
        .catalog
        .get(&daemon_id)
        .await
        .ok_or_else(|| CollaboratorError::NotFound(daemon_id.clone()))?;

    let draft = state
        .completion
        .request_suggestion(&daemon, &input.text)
        .await?;
    Ok(Json(SuggestionResponse {
        suggestion: SuggestionPayload::from_draft(&daemon, draft),
    }))
}

async fn suggestions_handler(
    State(state): State<AppState>,
    Json(input): Json<TextInput>,
) -> ApiResult<SuggestionsResponse> {
    let daemons = state.catalog.list().await?;
    let mut suggestions = Vec::with_capacity(daemons.len());

    for daemon in &daemons {
        match state.completion.request_suggestion(daemon, &input.text).await {
            Ok(draft) => suggestions.push(SuggestionPayload::from_draft(daemon, draft)),
            Err(e) => warn!("Skipping {}: {}", daemon.id, e),
        }
    }

    debug!(
        "Generated {} of {} suggestions",
        suggestions.len(),
        daemons.len()
    );
    Ok(Json(SuggestionsResponse { suggestions }))
}

async fn apply_handler(
    State(state): State<AppState>,
    Json(request): Json<RewriteRequest>,
) -> ApiResult<RewriteResponse> {
    let improved_text = state.completion.apply_rewrite(&request).await?;
    Ok(Json(RewriteResponse { improved_text }))
}

async fn answer_handler(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<AnswerResponse> {
    let answer = state
        .completion
        .request_answer(&request.daemon_id, &request.question, &request.span_text)
        .await?;
    Ok(Json(AnswerResponse {
        daemon_id: request.daemon_id,
        question: request.question,
        answer,
    }))
}
