// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing and verification endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use base64ct::{Base64, Encoding};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{SignAnswersRequest, SignAnswersResponse, VerifyRequest, VerifyResponse},
    state::AppState,
    storage::QuestionAnswer,
};

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(format!("unexpected request body: {rejection}")))
}

#[utoipa::path(
    post,
    path = "/api/v1/sign",
    request_body = SignAnswersRequest,
    tag = "Signatures",
    responses(
        (status = 201, description = "Signature issued", body = SignAnswersResponse),
        (status = 400, description = "Invalid body or request id already submitted"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn sign_answers(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<SignAnswersRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignAnswersResponse>), ApiError> {
    let request = parse_body(payload)?;
    if request.id.trim().is_empty() || request.test.is_empty() {
        return Err(ApiError::bad_request(
            "an empty key: required keys: 'id', 'test'",
        ));
    }

    let answers: Vec<QuestionAnswer> = request.test.into_iter().map(Into::into).collect();
    let token = state
        .service
        .create_signature(&request.id, &user.user_id, answers)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignAnswersResponse {
            signature: Base64::encode_string(&token),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/verify",
    request_body = VerifyRequest,
    tag = "Signatures",
    responses(
        (status = 200, description = "Signature is valid", body = VerifyResponse),
        (status = 400, description = "Invalid body or signature rejected"),
        (status = 500, description = "Internal error")
    )
)]
pub async fn verify_signature(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let request = parse_body(payload)?;
    if request.user_id.is_empty() || request.signature.is_empty() {
        return Err(ApiError::bad_request(
            "'user_id' and 'signature' are required fields",
        ));
    }

    let token = Base64::decode_vec(&request.signature).map_err(|e| {
        tracing::debug!(error = %e, "Signature is not valid base64");
        ApiError::bad_request("Unexpected signature")
    })?;

    let stored = state
        .service
        .verify_signature(&request.user_id, &token)
        .await?;

    Ok(Json(VerifyResponse {
        answers: stored.answers,
        timestamp: stored.timestamp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, JwtClaims};
    use crate::models::TestAnswer;

    const SIGNING_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn state() -> AppState {
        AppState::in_memory("secret", SIGNING_KEY).unwrap()
    }

    fn user(id: &str) -> Auth {
        Auth(AuthenticatedUser::from_claims(JwtClaims::new(id)))
    }

    fn sign_request(id: &str) -> SignAnswersRequest {
        SignAnswersRequest {
            id: id.into(),
            test: vec![
                TestAnswer {
                    question: "Q1".into(),
                    answer: "A1".into(),
                },
                TestAnswer {
                    question: "Q2".into(),
                    answer: "A2".into(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn sign_then_verify_success() {
        let state = state();

        let (status, Json(signed)) =
            sign_answers(user("alice"), State(state.clone()), Ok(Json(sign_request("req-1"))))
                .await
                .expect("signing succeeds");
        assert_eq!(status, StatusCode::CREATED);

        let Json(verified) = verify_signature(
            State(state),
            Ok(Json(VerifyRequest {
                user_id: "alice".into(),
                signature: signed.signature,
            })),
        )
        .await
        .expect("verification succeeds");
        assert_eq!(verified.answers, vec!["A1", "A2"]);
    }

    #[tokio::test]
    async fn sign_rejects_empty_request_id_and_answers() {
        let state = state();

        let err = sign_answers(user("alice"), State(state.clone()), Ok(Json(sign_request(" "))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let mut request = sign_request("req-1");
        request.test.clear();
        let err = sign_answers(user("alice"), State(state), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn repeated_request_id_is_bad_request() {
        let state = state();
        sign_answers(user("alice"), State(state.clone()), Ok(Json(sign_request("req-1"))))
            .await
            .unwrap();

        let err = sign_answers(user("alice"), State(state), Ok(Json(sign_request("req-1"))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("already been submitted"));
    }

    #[tokio::test]
    async fn verify_rejects_bad_base64_and_missing_fields() {
        let state = state();

        let err = verify_signature(
            State(state.clone()),
            Ok(Json(VerifyRequest {
                user_id: "alice".into(),
                signature: "%%%not-base64%%%".into(),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = verify_signature(
            State(state),
            Ok(Json(VerifyRequest {
                user_id: String::new(),
                signature: "AAAA".into(),
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_for_other_user_is_rejected() {
        let state = state();
        let (_, Json(signed)) =
            sign_answers(user("alice"), State(state.clone()), Ok(Json(sign_request("req-1"))))
                .await
                .unwrap();

        let err = verify_signature(
            State(state),
            Ok(Json(VerifyRequest {
                user_id: "bob".into(),
                signature: signed.signature,
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Unexpected signature");
    }
}
