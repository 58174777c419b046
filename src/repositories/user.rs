use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::UserStore;
use crate::error::AppError;
use crate::models::{NewUser, ProfileUpdate, User};

/// PostgreSQL 版ユーザーリポジトリ
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// UPDATE の影響行数が0なら NotFound に変換
    fn ensure_updated(rows_affected: u64) -> Result<(), AppError> {
        if rows_affected == 0 {
            return Err(AppError::NotFound("User".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for UserRepository {
    /// 新しいユーザーを作成
    ///
    /// # Errors
    /// - UNIQUE制約違反時 (constraint = "users_email_key"): `AppError::EmailAlreadyExists`
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, password_hash, first_name, last_name, phone_number, gender,
                verification_code, is_admin
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, email, password_hash, first_name, last_name, phone_number, gender,
                      is_verified, verification_code, reset_code, reset_code_expires_at,
                      session_token_hash, last_login, is_admin, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(&user.gender)
        .bind(&user.verification_code)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("users_email_key")
            {
                return AppError::EmailAlreadyExists(user.email.clone());
            }
            AppError::Database(e)
        })
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone_number, gender,
                   is_verified, verification_code, reset_code, reset_code_expires_at,
                   session_token_hash, last_login, is_admin, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone_number, gender,
                   is_verified, verification_code, reset_code, reset_code_expires_at,
                   session_token_hash, last_login, is_admin, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// セッショントークンのSHA256ハッシュでユーザーを検索
    ///
    /// # Note
    /// 有効期限の検証は呼び出し側で行う
    async fn find_by_session_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone_number, gender,
                   is_verified, verification_code, reset_code, reset_code_expires_at,
                   session_token_hash, last_login, is_admin, created_at, updated_at
            FROM users
            WHERE session_token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_last_name(&self, last_name: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone_number, gender,
                   is_verified, verification_code, reset_code, reset_code_expires_at,
                   session_token_hash, last_login, is_admin, created_at, updated_at
            FROM users
            WHERE LOWER(last_name) = LOWER($1)
            ORDER BY first_name
            "#,
        )
        .bind(last_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone_number, gender,
                   is_verified, verification_code, reset_code, reset_code_expires_at,
                   session_token_hash, last_login, is_admin, created_at, updated_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn mark_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE, verification_code = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(result.rows_affected())
    }

    async fn start_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        logged_in_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET session_token_hash = $2, last_login = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(logged_in_at)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(result.rows_affected())
    }

    async fn clear_session(&self, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET session_token_hash = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(result.rows_affected())
    }

    async fn set_reset_code(
        &self,
        user_id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_code = $2, reset_code_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(result.rows_affected())
    }

    /// ユーザーのパスワードを更新
    ///
    /// # Note
    /// password_hash はログに出力しないこと
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_code = NULL,
                reset_code_expires_at = NULL,
                session_token_hash = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(result.rows_affected())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone_number = COALESCE($4, phone_number),
                gender = COALESCE($5, gender),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, first_name, last_name, phone_number, gender,
                      is_verified, verification_code, reset_code, reset_code_expires_at,
                      session_token_hash, last_login, is_admin, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.phone_number.as_deref())
        .bind(update.gender.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }
}
