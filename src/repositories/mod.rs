//! 永続化ゲートウェイ
//!
//! 各操作は単一ステートメントで完結し、操作間のアトミック性は保証しない。

pub mod document;
#[cfg(test)]
pub mod memory;
pub mod user;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Document, DocumentUpdate, NewDocument, NewUser, ProfileUpdate, User};

pub use document::DocumentRepository;
pub use user::UserRepository;

/// ユーザーレコードの読み書き
///
/// 更新系は対象ユーザーが存在しない場合 `AppError::NotFound` を返す
#[async_trait]
pub trait UserStore: Send + Sync {
    /// メールアドレス重複時は `AppError::EmailAlreadyExists`
    async fn create(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_session_token_hash(&self, token_hash: &str)
    -> Result<Option<User>, AppError>;
    async fn find_by_last_name(&self, last_name: &str) -> Result<Vec<User>, AppError>;
    async fn list(&self) -> Result<Vec<User>, AppError>;

    /// 確認済みにして確認コードを消去
    async fn mark_verified(&self, user_id: Uuid) -> Result<(), AppError>;
    /// セッションを差し替え、最終ログイン日時を記録
    async fn start_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        logged_in_at: OffsetDateTime,
    ) -> Result<(), AppError>;
    async fn clear_session(&self, user_id: Uuid) -> Result<(), AppError>;
    async fn set_reset_code(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError>;
    /// パスワードを更新し、リセットコードとセッションを消去
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError>;
    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate)
    -> Result<User, AppError>;
}

/// 書類レコードの読み書き
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, document: NewDocument) -> Result<Document, AppError>;
    async fn find_by_id(&self, document_id: Uuid) -> Result<Option<Document>, AppError>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Document>, AppError>;
    async fn list(&self) -> Result<Vec<Document>, AppError>;
    async fn update(
        &self,
        document_id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, AppError>;
    async fn delete(&self, document_id: Uuid) -> Result<(), AppError>;
}
