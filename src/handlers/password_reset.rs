use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::handlers::register::{validate_code, validate_email, validate_new_password};
use crate::state::AppState;

// === リセットコード発行 ===

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordResponse {
    pub message: &'static str,
}

/// POST /api/password/forgot
///
/// 登録済みでないメールアドレスは 404
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ForgotPasswordRequest>,
) -> Result<Json<PasswordResponse>, AppError> {
    validate_email(&request.email)?;

    state.auth.forgot_password(&request.email).await?;

    Ok(Json(PasswordResponse {
        message: "Password reset code sent to your email",
    }))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub reset_code: String,
    pub new_password: String,
}

/// POST /api/password/reset
///
/// # Security
/// - reset_code, new_password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> Result<Json<PasswordResponse>, AppError> {
    validate_reset_password_request(&request)?;

    state
        .auth
        .reset_password(&request.email, &request.reset_code, &request.new_password)
        .await?;

    Ok(Json(PasswordResponse {
        message: "Password has been reset. Please log in again.",
    }))
}

/// リセットパスワードリクエストのバリデーション
fn validate_reset_password_request(request: &ResetPasswordRequest) -> Result<(), AppError> {
    validate_email(&request.email)?;
    validate_code(&request.reset_code, "reset_code")?;
    validate_new_password(&request.new_password)
}
