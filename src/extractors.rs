use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use http::{HeaderMap, HeaderValue, header, request::Parts};

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// セッショントークンを運ぶ Cookie 名
pub const SESSION_COOKIE: &str = "session_id";

/// セッション Cookie から解決したログイン中のユーザー
///
/// Cookie がなければ `SessionRequired`、期限切れなら `SessionExpired`
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::SessionRequired)?;
        let user = state.auth.resolve_session(&token).await?;
        Ok(Self(user))
    }
}

/// 管理者フラグ付きのログイン中ユーザー
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(user_id = %user.id, "管理者以外による管理APIへのアクセス");
            return Err(AppError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// JSON ボディ（パース失敗を `AppError::Validation` に変換）
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// パスパラメータ（不正な値は `AppError::Validation`）
pub struct AppPath<T>(pub T);

impl<S, T> FromRequestParts<S> for AppPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// クエリ文字列
pub struct AppQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Cookie ヘッダーから `session_id` の値を取り出す
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

/// ログイン時に付与する Set-Cookie
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, AppError> {
    build_cookie(token, max_age_secs, secure)
}

/// ログアウト時に Cookie を失効させる Set-Cookie
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    build_cookie("", 0, secure)
}

fn build_cookie(value: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid cookie value: {e}")))
}
