// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{SignAnswersRequest, SignAnswersResponse, TestAnswer, VerifyRequest, VerifyResponse},
    state::AppState,
};

pub mod health;
pub mod signatures;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/sign", post(signatures::sign_answers))
        .route("/verify", post(signatures::verify_signature))
        .with_state(state);

    Router::new()
        .nest("/api/v1", v1_routes)
        .route("/health", get(health::liveness))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        signatures::sign_answers,
        signatures::verify_signature,
        health::liveness
    ),
    components(
        schemas(
            TestAnswer,
            SignAnswersRequest,
            SignAnswersResponse,
            VerifyRequest,
            VerifyResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Signatures", description = "Issue and verify test signatures"),
        (name = "Health", description = "Liveness probe")
    )
)]
struct ApiDoc;
