//! Account routes: sign-up, email verification, login, profile, password
//! reset, Google sign-in and admin user management.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::UserId;

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireUser, login_rate_limiter};
use crate::models::{User, UserProfile, UserStats};
use crate::services::MediaFolder;
use crate::services::auth::{GoogleSignIn, OAuthMode};
use crate::state::AppState;

use super::MessageResponse;
use super::json::JsonBody;
use super::multipart::Form;

/// Build the `/api/auth` router.
pub fn router() -> Router<AppState> {
    let login = Router::new()
        .route("/login", post(login))
        .route_layer(login_rate_limiter());

    Router::new()
        .route("/signup", post(signup))
        .route("/verify", post(verify))
        .route("/resend", post(resend))
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(update_profile))
        .route("/upload-profile", put(upload_profile_image))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/all-users", get(all_users))
        .route("/block/{id}", put(toggle_block))
        .route("/stats", get(stats))
        .route("/google", get(google_redirect))
        .route("/google/callback", get(google_callback))
        .merge(login)
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImageResponse {
    pub message: &'static str,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub message: &'static str,
    pub is_blocked: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct GoogleQuery {
    #[serde(default)]
    pub mode: OAuthMode,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Registration & Verification
// =============================================================================

/// Create an unverified account and email its verification code.
#[instrument(skip(state, req), fields(email = %req.email))]
async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse> {
    let (user, code) = state
        .auth()
        .signup(&req.username, &req.email, &req.password)
        .await?;

    send_code(&state, &user, &code.code, CodeMail::Verification).await;
    tracing::info!(user_id = %user.id, "Account created");

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("User registered. Verification code sent to email."),
    ))
}

#[instrument(skip(state, req), fields(email = %req.email))]
async fn verify(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyRequest>,
) -> Result<Json<MessageResponse>> {
    let user = state.auth().verify_email(&req.email, &req.code).await?;
    tracing::info!(user_id = %user.id, "Email verified");
    Ok(MessageResponse::new("Email verified successfully!"))
}

#[instrument(skip(state, req), fields(email = %req.email))]
async fn resend(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    let (user, code) = state.auth().resend_verification(&req.email).await?;
    send_code(&state, &user, &code.code, CodeMail::Verification).await;
    Ok(MessageResponse::new("New verification code sent to email."))
}

// =============================================================================
// Session
// =============================================================================

#[instrument(skip(state, req), fields(email = %req.email))]
async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state
        .auth()
        .login(&req.email, req.password.as_deref())
        .await?;
    let token = state.tokens().issue(user.id, user.is_admin)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user: UserProfile::from(&user),
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn logout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<MessageResponse>> {
    state.auth().logout(user.id).await?;
    Ok(MessageResponse::new("Logout successful"))
}

// =============================================================================
// Profile
// =============================================================================

async fn profile(RequireUser(user): RequireUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

#[instrument(skip(state, user, req), fields(user_id = %user.id))]
async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    let updated = state
        .auth()
        .update_profile(
            user.id,
            req.username.as_deref(),
            req.email.as_deref(),
            req.password.as_deref(),
        )
        .await?;
    Ok(Json(UserProfile::from(&updated)))
}

#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
async fn upload_profile_image(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    multipart: Multipart,
) -> Result<Json<ProfileImageResponse>> {
    let mut form = Form::collect(multipart).await?;
    let upload = form
        .take_file("profileImage")
        .ok_or_else(|| AppError::BadRequest("No image uploaded".to_string()))?;

    let url = state
        .media()
        .store(upload, MediaFolder::ProfileImages)
        .await?;
    let updated = UserRepository::new(state.pool())
        .set_profile_image(user.id, &url)
        .await?;

    Ok(Json(ProfileImageResponse {
        message: "Profile image uploaded successfully",
        image_url: updated.profile_image.unwrap_or(url),
    }))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Answers the same whether or not the account exists.
#[instrument(skip(state, req), fields(email = %req.email))]
async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    if let Some((user, code)) = state.auth().request_password_reset(&req.email).await? {
        send_code(&state, &user, &code.code, CodeMail::PasswordReset).await;
    }
    Ok(MessageResponse::new(
        "If an account exists for that email, a reset code has been sent.",
    ))
}

#[instrument(skip(state, req), fields(email = %req.email))]
async fn reset_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .auth()
        .reset_password(&req.email, &req.code, &req.password)
        .await?;
    Ok(MessageResponse::new("Password has been reset successfully."))
}

// =============================================================================
// Admin
// =============================================================================

async fn all_users(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<User>>> {
    Ok(Json(UserRepository::new(state.pool()).list().await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn toggle_block(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<BlockResponse>> {
    let user = UserRepository::new(state.pool())
        .toggle_blocked(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User not found".into()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, blocked = user.is_blocked, "Block flag toggled");
    Ok(Json(BlockResponse {
        message: if user.is_blocked {
            "User has been blocked and logged out"
        } else {
            "User has been unblocked"
        },
        is_blocked: user.is_blocked,
    }))
}

async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<UserStats>> {
    Ok(Json(UserRepository::new(state.pool()).stats().await?))
}

// =============================================================================
// Google Sign-In
// =============================================================================

async fn google_redirect(
    State(state): State<AppState>,
    Query(query): Query<GoogleQuery>,
) -> Result<Redirect> {
    let google = state
        .google()
        .ok_or_else(|| AppError::ServiceUnavailable("Google sign-in is not configured".into()))?;
    let oauth_state = state.tokens().issue_oauth_state(query.mode)?;
    let url = google.authorize_url(&oauth_state)?;
    Ok(Redirect::to(url.as_str()))
}

/// Finish Google sign-in. Every outcome is a redirect back to the storefront.
#[instrument(skip(state, query))]
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Redirect {
    let frontend = state.config().frontend_url.trim_end_matches('/');
    match complete_google_sign_in(&state, query).await {
        Ok(token) => Redirect::to(&format!("{frontend}/oauth-success?token={token}")),
        Err(reason) => Redirect::to(&format!("{frontend}/login?error={reason}")),
    }
}

/// Resolve the callback to a bearer token, or to the error code the
/// storefront shows.
async fn complete_google_sign_in(
    state: &AppState,
    query: GoogleCallbackQuery,
) -> std::result::Result<String, &'static str> {
    const FAILED: &str = "oauth_failed";

    if let Some(error) = query.error {
        tracing::info!(%error, "Google consent declined");
        return Err(FAILED);
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(FAILED);
    };
    let google = state.google().ok_or(FAILED)?;

    let mode = state
        .tokens()
        .verify_oauth_state(&oauth_state)
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected OAuth state");
            FAILED
        })?;
    let profile = google.fetch_profile(&code).await.map_err(|e| {
        tracing::error!(error = %e, "Google profile exchange failed");
        FAILED
    })?;

    let user = match state.auth().google_sign_in(&profile, mode).await {
        Ok(GoogleSignIn::User(user)) => user,
        Ok(GoogleSignIn::AccountNotFound) => return Err("account_not_found"),
        Err(e) => {
            tracing::error!(error = %e, "Google sign-in failed");
            return Err(FAILED);
        }
    };
    if user.is_blocked {
        return Err("blocked");
    }

    state.tokens().issue(user.id, user.is_admin).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue token");
        FAILED
    })
}

// =============================================================================
// Mail Helpers
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum CodeMail {
    Verification,
    PasswordReset,
}

/// Email a one-time code. Failures are logged; the account change stands.
async fn send_code(state: &AppState, user: &User, code: &str, kind: CodeMail) {
    let (Some(email), Some(to)) = (state.email(), user.email.as_ref()) else {
        tracing::warn!(user_id = %user.id, "Email unavailable, code not sent");
        return;
    };
    let sent = match kind {
        CodeMail::Verification => {
            email
                .send_verification_code(to.as_str(), &user.username, code)
                .await
        }
        CodeMail::PasswordReset => {
            email
                .send_password_reset(to.as_str(), &user.username, code)
                .await
        }
    };
    if let Err(e) = sent {
        tracing::warn!(error = %e, user_id = %user.id, ?kind, "Failed to send code email");
    }
}
