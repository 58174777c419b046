//! 管理者向けハンドラー（すべて `AdminUser` 必須）

use axum::{
    Json,
    extract::State,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{AdminUser, AppPath, AppQuery};
use crate::models::{Document, User, UserSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub last_name: String,
}

fn summaries(state: &AppState, users: &[User]) -> Vec<UserSummary> {
    let session_ttl = state.auth.session_ttl();
    users
        .iter()
        .map(|user| UserSummary::new(user, session_ttl))
        .collect()
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(summaries(&state, &users)))
}

/// GET /api/admin/users/search?last_name=
///
/// 大文字小文字を区別しない完全一致
pub async fn search_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let last_name = query.last_name.trim();
    if last_name.is_empty() {
        return Err(AppError::Validation("last_name is required".to_string()));
    }
    let users = state.users.find_by_last_name(last_name).await?;
    Ok(Json(summaries(&state, &users)))
}

/// GET /api/admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(user_id): AppPath<Uuid>,
) -> Result<Json<UserSummary>, AppError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    Ok(Json(UserSummary::new(&user, state.auth.session_ttl())))
}

/// GET /api/admin/users/{id}/letters
pub async fn list_user_letters(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(user_id): AppPath<Uuid>,
) -> Result<Json<Vec<Document>>, AppError> {
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound("User".to_string()));
    }
    Ok(Json(state.documents.list_for_user(user_id).await?))
}

/// GET /api/admin/letters
pub async fn list_all_letters(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(state.documents.list_all().await?))
}
