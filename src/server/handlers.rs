//! Route handlers.
//!
//! Handlers only decode the wire format and encode the result; every
//! decision about keys, timestamps and expiry is made by [`DomainManager`].
//!
//! [`DomainManager`]: crate::DomainManager

use super::error::ApiResult;
use super::AppState;
use crate::config::MAX_TOKEN_VALUE_BYTES;
use crate::protocol::models::{
    decode_token_value, CreateDomainParams, DomainParams, QueryParams, SignedDomainParams,
    SignedTokenParams,
};
use crate::TokenServerError;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body of every successful deletion.
const REMOVED: &str = "removed";

/// Body of a successful `setToken`.
const STORED: &str = "stored";

fn query(query: Result<Query<QueryParams>, QueryRejection>) -> Result<QueryParams, TokenServerError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| TokenServerError::InvalidQuery(e.body_text()))
}

fn json<T: Serialize>(value: &T) -> ApiResult<Response> {
    let body = serde_json::to_vec(value)
        .map_err(|e| TokenServerError::EncodingError(format!("JSON encode failed: {}", e)))?;
    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

/// `GET /`
pub async fn health() -> &'static str {
    "ready"
}

/// Any route not listed in the router.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "notFound")
}

/// `PUT /domain`
pub async fn create_domain(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let params = CreateDomainParams::from_query(&query(params)?)?;
    let created = state.manager.create_domain(params.public_key)?;
    json(&created)
}

/// `GET /domain`
pub async fn get_domain(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let params = SignedDomainParams::from_query(&query(params)?)?;
    let tokens = state
        .manager
        .get_domain(params.domain, &params.credentials)?;
    json(&tokens)
}

/// `POST /domain`
pub async fn revalidate_domain(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let params = DomainParams::from_query(&query(params)?)?;
    let expires = state.manager.revalidate_domain(params.domain)?;
    json(&expires)
}

/// `DELETE /domain`
pub async fn delete_domain(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<&'static str> {
    let params = SignedDomainParams::from_query(&query(params)?)?;
    state
        .manager
        .delete_domain(params.domain, &params.credentials)?;
    Ok(REMOVED)
}

/// `GET /token`
pub async fn get_token(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Response> {
    let params = SignedTokenParams::from_query(&query(params)?)?;
    let value = state
        .manager
        .get_token(params.domain, &params.token_id, &params.credentials)?;
    json(&value)
}

/// `PUT /token`
///
/// The body is capped by the router's body limit; a rejection for size is
/// reported as `413`, any other body failure as `400`.
pub async fn set_token(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<&'static str> {
    let params = SignedTokenParams::from_query(&query(params)?)?;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            TokenServerError::PayloadTooLarge {
                max: MAX_TOKEN_VALUE_BYTES,
            }
        } else {
            TokenServerError::InvalidTokenValue
        }
    })?;
    let value = decode_token_value(&body)?;

    state
        .manager
        .set_token(params.domain, &params.token_id, &value, &params.credentials)?;
    Ok(STORED)
}

/// `DELETE /token`
pub async fn delete_token(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<&'static str> {
    let params = SignedTokenParams::from_query(&query(params)?)?;
    state
        .manager
        .delete_token(params.domain, &params.token_id, &params.credentials)?;
    Ok(REMOVED)
}
