//! HTTP service layer.
//!
//! The single trusted boundary in front of the orchestrator: every route
//! resolves the caller through the identity provider before touching the
//! ledger or history, so balance checks and debits cannot be bypassed by
//! invoking storage directly.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::content::ContentKind;
use crate::history::HistoryEntry;
use crate::identity::DynIdentityProvider;
use crate::orchestrator::{GenerationError, GenerationRequest, Orchestrator};
use crate::provider::Attachment;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    /// The generation core.
    pub orchestrator: Arc<Orchestrator>,
    /// Authorization gate for every route.
    pub identity: DynIdentityProvider,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/balance", get(balance))
        .route("/api/history", get(history))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    kind: ContentKind,
    prompt: String,
    attachment: Option<AttachmentBody>,
}

/// Attachment wire shape: base64 payload plus its media type.
#[derive(Debug, Deserialize)]
struct AttachmentBody {
    data: String,
    media_type: String,
}

#[derive(Debug, Serialize)]
struct GenerateReply {
    units: Vec<String>,
    content: String,
    balance: u64,
    entry: HistoryEntry,
}

#[derive(Debug, Serialize)]
struct BalanceReply {
    user_id: String,
    balance: u64,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorReply {
    error: &'static str,
    message: String,
}

type ApiError = (StatusCode, Json<ErrorReply>);

fn error_reply(status: StatusCode, error: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorReply {
            error,
            message: message.into(),
        }),
    )
}

/// Extract the bearer token from an `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Map a failed transaction onto an HTTP status.
fn status_for(error: &GenerationError) -> StatusCode {
    match error {
        GenerationError::EmptyPrompt => StatusCode::BAD_REQUEST,
        GenerationError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
        GenerationError::Provider(_) | GenerationError::Format(_) => StatusCode::BAD_GATEWAY,
        GenerationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Err(error_reply(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing bearer token",
        ));
    };
    state.identity.resolve(token).await.map_err(|err| {
        warn!(error = %err, "identity resolution failed");
        error_reply(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
    })
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateReply>, ApiError> {
    let user_id = authorize(&state, &headers).await?;

    let attachment = match body.attachment {
        Some(raw) => {
            let data = BASE64.decode(raw.data.as_bytes()).map_err(|err| {
                error_reply(
                    StatusCode::BAD_REQUEST,
                    "invalid_request",
                    format!("attachment is not valid base64: {err}"),
                )
            })?;
            Some(Attachment::new(data, raw.media_type))
        }
        None => None,
    };

    let request = GenerationRequest {
        user_id,
        kind: body.kind,
        prompt: body.prompt,
        attachment,
    };

    match state.orchestrator.submit(request).await {
        Ok(outcome) => Ok(Json(GenerateReply {
            content: outcome.result.joined(),
            units: outcome.result.units,
            balance: outcome.balance,
            entry: outcome.entry,
        })),
        Err(err) => Err(error_reply(
            status_for(&err),
            err.kind_label(),
            err.to_string(),
        )),
    }
}

async fn balance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BalanceReply>, ApiError> {
    let user_id = authorize(&state, &headers).await?;
    let balance = state
        .orchestrator
        .current_balance(&user_id)
        .await
        .map_err(|err| {
            error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                err.to_string(),
            )
        })?;
    Ok(Json(BalanceReply { user_id, balance }))
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let user_id = authorize(&state, &headers).await?;
    let entries = state
        .orchestrator
        .history(&user_id, params.limit)
        .await
        .map_err(|err| {
            error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                err.to_string(),
            )
        })?;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FormatError;
    use crate::provider::ProviderError;
    use crate::storage::StorageError;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert_eq!(bearer_token(&headers), Some("secret"));
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&GenerationError::EmptyPrompt),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GenerationError::InsufficientCredits {
                balance: 3,
                cost: 5
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_for(&GenerationError::Provider(ProviderError::Status(503))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&GenerationError::Format(FormatError::NoUsableSegments)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&GenerationError::Storage(StorageError::Backend(
                "down".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
