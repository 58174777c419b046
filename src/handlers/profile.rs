use axum::{Json, extract::State};

use crate::error::AppError;
use crate::extractors::{AppJson, CurrentUser};
use crate::models::{ProfileUpdate, UserProfile};
use crate::state::AppState;

/// GET /api/profile
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

/// プロフィール更新ハンドラー
///
/// PUT /api/profile
///
/// 指定されたフィールドのみ更新する。空文字は不可
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let update = normalize_update(update)?;
    let updated = state.auth.update_profile(user.id, update).await?;
    Ok(Json(UserProfile::from(&updated)))
}

/// 前後の空白を除去し、空になったフィールドを拒否
fn normalize_update(update: ProfileUpdate) -> Result<ProfileUpdate, AppError> {
    fn field(name: &str, value: Option<String>) -> Result<Option<String>, AppError> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if v.is_empty() => Err(AppError::Validation(format!("{name} must not be blank"))),
            other => Ok(other),
        }
    }

    Ok(ProfileUpdate {
        first_name: field("first_name", update.first_name)?,
        last_name: field("last_name", update.last_name)?,
        phone_number: field("phone_number", update.phone_number)?,
        gender: field("gender", update.gender)?,
    })
}
