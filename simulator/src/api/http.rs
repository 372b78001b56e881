use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State as AxumState,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use roulette_types::api::{
    ErrorResponse, HistoryQuery, HistoryResponse, LoginRequest, MessageResponse,
    RegisterRequest, SpinRequest, UpdateAccountRequest,
};
use serde::Serialize;
use std::sync::Arc;

use crate::accounts::AccountError;
use crate::table::SimulatorError;
use crate::Simulator;

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

/// Errors returned by handlers, rendered as `{ "error": ... }`.
#[derive(Debug)]
pub(super) enum ApiError {
    MissingToken,
    BadRequest(String),
    Simulator(SimulatorError),
}

impl From<SimulatorError> for ApiError {
    fn from(err: SimulatorError) -> Self {
        ApiError::Simulator(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Simulator(err) => match err {
                SimulatorError::InvalidSession
                | SimulatorError::Account(AccountError::InvalidCredentials) => {
                    StatusCode::UNAUTHORIZED
                }
                SimulatorError::Account(AccountError::EmailTaken)
                | SimulatorError::Account(AccountError::UsernameTaken) => StatusCode::CONFLICT,
                SimulatorError::Account(AccountError::UnknownAccount) => StatusCode::NOT_FOUND,
                SimulatorError::Account(AccountError::Hashing(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::MissingToken => "authentication required".to_string(),
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Simulator(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::MissingToken)
}

/// Username behind the request's bearer token.
async fn authenticate(simulator: &Simulator, headers: &HeaderMap) -> ApiResult<String> {
    let token = bearer_token(headers)?;
    Ok(simulator.authenticate(token).await?)
}

pub(super) async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

pub(super) async fn config(AxumState(simulator): AxumState<Arc<Simulator>>) -> Response {
    Json(simulator.config.clone()).into_response()
}

pub(super) async fn register(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let session = simulator.register(request).await?;
    Ok((StatusCode::CREATED, Json(session)).into_response())
}

pub(super) async fn login(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let session = simulator.login(request).await?;
    Ok(Json(session).into_response())
}

pub(super) async fn logout(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let token = bearer_token(&headers)?;
    if !simulator.logout(token).await {
        return Err(SimulatorError::InvalidSession.into());
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "logged out".to_string(),
    })
    .into_response())
}

pub(super) async fn spin(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    headers: HeaderMap,
    payload: Result<Json<SpinRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let username = authenticate(&simulator, &headers).await?;
    let Json(request) = payload?;
    let response = simulator.spin(&username, request).await?;
    Ok(Json(response).into_response())
}

pub(super) async fn balance(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let username = authenticate(&simulator, &headers).await?;
    let balance = simulator.balance(&username).await?;
    Ok(Json(balance).into_response())
}

pub(super) async fn update_account(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    headers: HeaderMap,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let username = authenticate(&simulator, &headers).await?;
    let Json(request) = payload?;
    let response = simulator.change_password(&username, request).await?;
    Ok(Json(response).into_response())
}

pub(super) async fn history(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    headers: HeaderMap,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let username = authenticate(&simulator, &headers).await?;
    let Query(query) = query?;
    let games = simulator.history(&username, query.limit).await?;
    Ok(Json(HistoryResponse { games }).into_response())
}

pub(super) async fn stats(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let username = authenticate(&simulator, &headers).await?;
    let stats = simulator.stats(&username).await?;
    Ok(Json(stats).into_response())
}
