//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    AccountSummary, CreateAccountRequest, CreateAccountResponse, DecryptRequest, DecryptResponse,
    ErrorResponse, HealthResponse,
};
use common::ServiceError;
use tracing::{error, warn};

use super::state::AppState;
use crate::provision::Provisioned;
use crate::retrieval::decrypt::decrypt_fields;

const CREATED_MESSAGE: &str = "Account created successfully. Your virtual card is ready.";

/// `POST /api/createBankAccount`: provision an account and its virtual card.
///
/// The plaintext card details are returned in this response only; afterwards
/// they exist solely in encrypted form.
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Response {
    match state.workflow.create(&req).await {
        Ok(Provisioned { account, card }) => {
            let body = CreateAccountResponse {
                message: CREATED_MESSAGE.into(),
                account: account.summary(),
                virtual_card: card,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => error_response(e.into()),
    }
}

/// `GET /api/accounts`: decrypted view of every stored account.
pub async fn list_accounts(State(state): State<AppState>) -> Response {
    match state.projection.list_decrypted().await {
        Ok(views) => (StatusCode::OK, Json(views.collect_all().await)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to list accounts");
            error_response(ServiceError::Internal("failed to list accounts".into()))
        }
    }
}

/// `GET /api/accounts/orphans`: accounts whose card write never landed.
pub async fn orphaned_accounts(State(state): State<AppState>) -> Response {
    match state.workflow.orphaned_accounts().await {
        Ok(accounts) => {
            let body: Vec<AccountSummary> = accounts.iter().map(|a| a.summary()).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to list orphaned accounts");
            error_response(ServiceError::Internal("failed to list orphaned accounts".into()))
        }
    }
}

/// `POST /api/decrypt`: decrypt caller-supplied encrypted pairs.
pub async fn decrypt(
    State(state): State<AppState>,
    Json(req): Json<DecryptRequest>,
) -> Response {
    match decrypt_fields(&state.cipher, &req) {
        Ok(decrypted) => (
            StatusCode::OK,
            Json(DecryptResponse {
                success: true,
                decrypted,
            }),
        )
            .into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// `GET /health`: liveness and readiness check.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let (status_code, body) = match state.store.list_accounts().await {
        Ok(accounts) => (
            StatusCode::OK,
            HealthResponse {
                status: "ok".into(),
                accounts_stored: accounts.len(),
            },
        ),
        Err(e) => {
            warn!(error = %e, "health check: store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                HealthResponse {
                    status: "degraded".into(),
                    accounts_stored: 0,
                },
            )
        }
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}
