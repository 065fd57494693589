//! HTTP collaborator
//!
//! Implements both [`DaemonCatalog`] and [`CompletionService`] against the
//! backend API. The base URL comes from [`AppConfig`] and is fixed for the
//! lifetime of the client.

use crate::api::wire::{
    AnswerRequest, AnswerResponse, DaemonChange, DaemonList, ErrorBody, RewriteResponse,
    SuggestionResponse, TextInput,
};
use crate::catalog::DaemonCatalog;
use crate::config::AppConfig;
use crate::error::{CollaboratorError, Result};
use crate::services::completion::{CompletionService, RewriteRequest};
use crate::types::{Daemon, NewDaemon, SuggestionDraft};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Client for the daemon backend
#[derive(Clone)]
pub struct HttpCollaborator {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCollaborator {
    /// Create a client for the configured backend
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            base_url: config.api_base.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// What a failure status means for the call that produced it
enum Context<'a> {
    /// Call addressed to one daemon
    Daemon(&'a str),
    /// Deleting a daemon; only here does a 400/403 mean protected
    Delete(&'a str),
    Create,
    Other,
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    context: Context<'_>,
) -> std::result::Result<T, CollaboratorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.json::<ErrorBody>().await.ok();
    let message = body
        .as_ref()
        .map(|b| b.error.clone())
        .unwrap_or_else(|| status.to_string());
    debug!("Backend returned {}: {}", status, message);

    Err(match (status, context) {
        (StatusCode::NOT_FOUND, Context::Daemon(id) | Context::Delete(id)) => {
            CollaboratorError::NotFound(id.to_string())
        }
        (StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST, Context::Delete(id)) => {
            CollaboratorError::Protected(id.to_string())
        }
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, Context::Create) => {
            CollaboratorError::Validation {
                field: body.and_then(|b| b.field).unwrap_or_else(|| "daemon".to_string()),
                message,
            }
        }
        _ => CollaboratorError::Request(format!("{}: {}", status, message)),
    })
}

#[async_trait]
impl DaemonCatalog for HttpCollaborator {
    async fn list(&self) -> std::result::Result<Vec<Daemon>, CollaboratorError> {
        let response = self.client.get(self.url("/daemons")).send().await?;
        let list: DaemonList = decode(response, Context::Other).await?;
        Ok(list.daemons)
    }

    async fn create(&self, new: NewDaemon) -> std::result::Result<Daemon, CollaboratorError> {
        new.validate()?;
        let response = self
            .client
            .post(self.url("/daemons"))
            .json(&new)
            .send()
            .await?;
        let change: DaemonChange = decode(response, Context::Create).await?;
        Ok(change.daemon)
    }

    async fn delete(&self, id: &str) -> std::result::Result<Daemon, CollaboratorError> {
        let response = self
            .client
            .delete(self.url(&format!("/daemons/{}", id)))
            .send()
            .await?;
        let change: DaemonChange = decode(response, Context::Delete(id)).await?;
        Ok(change.daemon)
    }
}

#[async_trait]
impl CompletionService for HttpCollaborator {
    async fn request_suggestion(
        &self,
        daemon: &Daemon,
        text: &str,
    ) -> std::result::Result<SuggestionDraft, CollaboratorError> {
        let response = self
            .client
            .post(self.url(&format!("/suggestion/{}", daemon.id)))
            .json(&TextInput {
                text: text.to_string(),
            })
            .send()
            .await?;
        let body: SuggestionResponse = decode(response, Context::Daemon(&daemon.id)).await?;
        // The backend computed the indices against exactly the text we sent
        Ok(body.suggestion.into_draft(text.to_string()))
    }

    async fn apply_rewrite(
        &self,
        request: &RewriteRequest,
    ) -> std::result::Result<String, CollaboratorError> {
        let response = self
            .client
            .post(self.url("/apply-suggestion"))
            .json(request)
            .send()
            .await?;
        let body: RewriteResponse = decode(response, Context::Other).await?;
        Ok(body.improved_text)
    }

    async fn request_answer(
        &self,
        daemon_id: &str,
        question: &str,
        span_text: &str,
    ) -> std::result::Result<String, CollaboratorError> {
        let response = self
            .client
            .post(self.url("/answer"))
            .json(&AnswerRequest {
                daemon_id: daemon_id.to_string(),
                question: question.to_string(),
                span_text: span_text.to_string(),
            })
            .send()
            .await?;
        let body: AnswerResponse = decode(response, Context::Daemon(daemon_id)).await?;
        Ok(body.answer)
    }
}
