use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// 登録済みの教員アカウント
///
/// パスワードハッシュ・各種コード・セッションダイジェストはシリアライズしない
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub gender: String,
    pub is_verified: bool,
    #[serde(skip)]
    pub verification_code: Option<String>,
    #[serde(skip)]
    pub reset_code: Option<String>,
    #[serde(skip)]
    pub reset_code_expires_at: Option<OffsetDateTime>,
    #[serde(skip)]
    pub session_token_hash: Option<String>,
    pub last_login: Option<OffsetDateTime>,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// セッショントークンがあり、最終ログインからセッション期間内か
    pub fn has_live_session(&self, session_ttl: Duration, now: OffsetDateTime) -> bool {
        self.session_token_hash.is_some()
            && self
                .last_login
                .is_some_and(|logged_in_at| now - logged_in_at <= session_ttl)
    }
}

/// 新規登録時の INSERT パラメータ
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub gender: String,
    pub verification_code: String,
    pub is_admin: bool,
}

/// プロフィールの部分更新（`None` のフィールドは変更しない）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
            && self.gender.is_none()
    }
}

/// 本人に返す公開プロフィール
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub gender: String,
    pub is_verified: bool,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            gender: user.gender.clone(),
            is_verified: user.is_verified,
            is_admin: user.is_admin,
            last_login: user.last_login,
        }
    }
}

/// 管理者向け一覧の1行
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub gender: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    pub is_logged_in: bool,
}

impl UserSummary {
    /// `is_logged_in` は期限内のセッションがある場合のみ真
    pub fn new(user: &User, session_ttl: Duration) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            gender: user.gender.clone(),
            last_login: user.last_login,
            is_logged_in: user.has_live_session(session_ttl, OffsetDateTime::now_utc()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in_at(last_login: Option<OffsetDateTime>) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: "ama@school.edu".to_string(),
            password_hash: String::new(),
            first_name: "Ama".to_string(),
            last_name: "Mensah".to_string(),
            phone_number: "0244000000".to_string(),
            gender: "F".to_string(),
            is_verified: true,
            verification_code: None,
            reset_code: None,
            reset_code_expires_at: None,
            session_token_hash: Some("digest".to_string()),
            last_login,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_live_session_within_ttl() {
        let now = OffsetDateTime::now_utc();
        let user = signed_in_at(Some(now - Duration::hours(1)));
        assert!(user.has_live_session(Duration::hours(3), now));
    }

    #[test]
    fn test_stale_session_is_not_live() {
        let now = OffsetDateTime::now_utc();
        let user = signed_in_at(Some(now - Duration::hours(5)));
        assert!(!user.has_live_session(Duration::hours(3), now));
        assert!(!UserSummary::new(&user, Duration::hours(3)).is_logged_in);
    }

    #[test]
    fn test_no_token_or_login_is_not_live() {
        let now = OffsetDateTime::now_utc();
        let mut user = signed_in_at(None);
        assert!(!user.has_live_session(Duration::hours(3), now));

        user.last_login = Some(now);
        user.session_token_hash = None;
        assert!(!user.has_live_session(Duration::hours(3), now));
    }
}
