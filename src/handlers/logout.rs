use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use serde::Serialize;

use crate::error::AppError;
use crate::extractors::{CurrentUser, clear_session_cookie};
use crate::state::AppState;

/// ログアウトレスポンス
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

/// ログアウトハンドラー
///
/// POST /api/logout
///
/// セッショントークンを消去し、Cookie を失効させる
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(HeaderMap, Json<LogoutResponse>), AppError> {
    state.auth.logout(user.id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        clear_session_cookie(state.config.cookie_secure)?,
    );

    Ok((
        headers,
        Json(LogoutResponse {
            message: "Logged out successfully",
        }),
    ))
}
