use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::extractors::{AppJson, session_cookie};
use crate::handlers::register::validate_email;
use crate::models::UserProfile;
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// ユーザーのメールアドレス
    pub email: String,
    /// ユーザーのパスワード
    pub password: String,
}

/// ログインレスポンス
///
/// セッショントークン自体は HttpOnly Cookie でのみ返す
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: UserProfile,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// ログインハンドラー
///
/// POST /api/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. ユーザー認証（パスワード照合・確認済みチェック）
/// 3. セッショントークン発行（既存セッションは無効化）
/// 4. Set-Cookie でトークンを返却
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    // 1. リクエストバリデーション
    validate_login_request(&request)?;

    // 2-3. 認証とセッション発行
    let session = state.auth.login(&request.email, &request.password).await?;

    // 4. Cookie 付与
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(
            &session.token,
            state.auth.session_ttl().whole_seconds(),
            state.config.cookie_secure,
        )?,
    );

    Ok((
        headers,
        Json(LoginResponse {
            message: "Login successful",
            user: UserProfile::from(&session.user),
            expires_at: session.expires_at,
        }),
    ))
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    validate_email(&request.email)?;

    // password: 必須（長さは登録時のみ検査）
    if request.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }

    Ok(())
}
