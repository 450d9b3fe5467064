use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{ApiResponse, ResendRequest, SignupRequest, VerifyEmailRequest},
        services,
        validation::{validate_resend, validate_signup, validate_verify},
    },
    error::ApiError,
    state::AppState,
    users::PublicUser,
};

const SIGNUP_OK: &str = "Account succesvol aangemaakt. Controleer je e-mail voor verificatie.";
const VERIFY_OK: &str = "E-mailadres succesvol geverifieerd! Welkom bij de Exam Training Platform.";
const RESEND_OK: &str = "Nieuwe verificatie-e-mail verzonden. Controleer je inbox.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup).fallback(method_not_allowed))
        .route(
            "/auth/verify-email",
            post(verify_email).fallback(method_not_allowed),
        )
        .route(
            "/auth/resend-verification",
            post(resend_verification).fallback(method_not_allowed),
        )
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    let Json(payload) = payload?;
    let signup = validate_signup(payload)?;
    let user = services::register(&state.users, &state.verification, signup).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(Some(PublicUser::from(&user)), SIGNUP_OK)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    payload: Result<Json<VerifyEmailRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(payload) = payload?;
    let token = validate_verify(payload)?;
    let event = state.verification.verify(&token).await?;
    state.welcome.dispatch(event.clone());
    Ok(Json(ApiResponse::ok(Some(event.user), VERIFY_OK)))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    payload: Result<Json<ResendRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(payload) = payload?;
    let email = validate_resend(payload)?;
    state.verification.resend(&email).await?;
    Ok(Json(ApiResponse::ok(None, RESEND_OK)))
}
