use std::sync::{Arc, OnceLock};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{NewUser, ProfileUpdate, User};
use crate::repositories::UserStore;
use crate::services::Mailer;

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// パスワードを検証
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
        AppError::Internal(anyhow::anyhow!("password hash parse error"))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// タイミング攻撃対策用のダミー検証
///
/// ユーザー不在時も実ハッシュと同じコストの検証を走らせる
fn dummy_verify(password: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    if let Some(hash) = DUMMY_HASH.get_or_init(|| hash_password("dummy-password").ok()) {
        let _ = verify_password(password, hash);
    }
}

/// 6桁の数字コードを生成（確認コード・リセットコード共通）
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// 32バイトのランダムセッショントークンを生成
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// トークンをSHA256でハッシュ化
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// メールアドレスの正規化（前後空白除去・小文字化）
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 新規登録の入力
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub gender: String,
}

/// ログイン成功時に発行されるセッション
///
/// `token` は平文でクライアントに渡し、DBにはハッシュのみ保存する
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_at: OffsetDateTime,
}

/// 認証・セッション管理サービス
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    config: Arc<Config>,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>, config: Arc<Config>) -> Self {
        Self {
            users,
            mailer,
            config,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.config.session_ttl_secs)
    }

    /// ユーザー登録
    ///
    /// 未確認状態で作成し、確認コードをメール送信する
    ///
    /// # Security
    /// - パスワードはログに出力しない
    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        let email = normalize_email(&registration.email);

        if self.users.find_by_email(&email).await?.is_some() {
            tracing::warn!(email = %email, "登録失敗: メールアドレス重複");
            return Err(AppError::EmailAlreadyExists(email));
        }

        let password_hash = hash_password(&registration.password)?;
        let verification_code = generate_code();
        let is_admin = self.config.is_admin_email(&email);

        let user = self
            .users
            .create(NewUser {
                email: email.clone(),
                password_hash,
                first_name: registration.first_name.trim().to_string(),
                last_name: registration.last_name.trim().to_string(),
                phone_number: registration.phone_number.trim().to_string(),
                gender: registration.gender.trim().to_string(),
                verification_code: verification_code.clone(),
                is_admin,
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %email, is_admin, "ユーザー登録成功");

        self.mailer
            .send_verification_email(&user.email, &user.first_name, &verification_code)
            .await
            .inspect_err(|_| {
                tracing::warn!(user_id = %user.id, "確認メール送信失敗（ユーザーは作成済み）");
            })?;

        Ok(user)
    }

    /// メールアドレス確認
    ///
    /// 成功時に確認コードを消去するため、同じコードは再利用できない
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email '{email}'")))?;

        match user.verification_code.as_deref() {
            Some(expected) if expected == code.trim() => {}
            _ => {
                tracing::warn!(user_id = %user.id, "確認コード不一致");
                return Err(AppError::InvalidVerificationCode);
            }
        }

        self.users.mark_verified(user.id).await?;

        tracing::info!(user_id = %user.id, "メールアドレス確認完了");
        Ok(())
    }

    /// ログイン
    ///
    /// 新しいセッショントークンを発行し、既存のトークンを無効化する
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            dummy_verify(password);
            tracing::warn!(email = %email, "認証失敗: ユーザー不在");
            return Err(AppError::Authentication("invalid_credentials".to_string()));
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "認証失敗: パスワード不一致");
            return Err(AppError::Authentication("invalid_credentials".to_string()));
        }

        if !user.is_verified {
            tracing::warn!(user_id = %user.id, "認証失敗: メールアドレス未確認");
            return Err(AppError::EmailNotVerified(email));
        }

        let token = generate_session_token();
        let token_hash = hash_token(&token);
        let now = OffsetDateTime::now_utc();
        self.users.start_session(user.id, &token_hash, now).await?;

        tracing::info!(user_id = %user.id, "ログイン成功");

        Ok(Session {
            token,
            expires_at: now + self.session_ttl(),
            user: User {
                session_token_hash: Some(token_hash),
                last_login: Some(now),
                ..user
            },
        })
    }

    /// セッショントークンに一致するユーザーを取得
    ///
    /// # Note
    /// 有効期限は検証しない。HTTP 経由の認証は `resolve_session` を使うこと
    pub async fn get_user_by_session(&self, token: &str) -> Result<Option<User>, AppError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.users.find_by_session_token_hash(&hash_token(token)).await
    }

    /// セッショントークンを検証してユーザーを返す
    ///
    /// 最終ログインからセッション期間を過ぎていればトークンを消去して
    /// `SessionExpired` を返す
    pub async fn resolve_session(&self, token: &str) -> Result<User, AppError> {
        let user = self
            .get_user_by_session(token)
            .await?
            .ok_or(AppError::SessionRequired)?;

        if !user.has_live_session(self.session_ttl(), OffsetDateTime::now_utc()) {
            self.users.clear_session(user.id).await?;
            tracing::info!(user_id = %user.id, "セッション期限切れ");
            return Err(AppError::SessionExpired);
        }

        Ok(user)
    }

    /// ログアウト（セッショントークンを無条件に消去）
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users.clear_session(user_id).await?;
        tracing::info!(user_id = %user_id, "ログアウト完了");
        Ok(())
    }

    /// パスワードリセットコードを発行してメール送信
    ///
    /// # Security
    /// - コードはログに出力しない
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email '{email}'")))?;

        let reset_code = generate_code();
        let expires_at =
            OffsetDateTime::now_utc() + Duration::seconds(self.config.reset_code_ttl_secs);

        self.users
            .set_reset_code(user.id, &reset_code, expires_at)
            .await?;

        self.mailer
            .send_password_reset_email(&user.email, &user.first_name, &reset_code)
            .await?;

        tracing::info!(user_id = %user.id, "パスワードリセットコード送信完了");
        Ok(())
    }

    /// リセットコードでパスワードを再設定
    ///
    /// 成功時にリセットコードとセッションを消去する
    ///
    /// # Security
    /// - コード・新パスワードはログに出力しない
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with email '{email}'")))?;

        if user.reset_code.as_deref() != Some(code.trim()) {
            tracing::warn!(user_id = %user.id, "リセットコード不一致");
            return Err(AppError::InvalidResetCode);
        }

        if let Some(expires_at) = user.reset_code_expires_at
            && expires_at < OffsetDateTime::now_utc()
        {
            tracing::warn!(user_id = %user.id, "期限切れリセットコード");
            return Err(AppError::InvalidResetCode);
        }

        let password_hash = hash_password(new_password)?;
        self.users.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "パスワードリセット完了");
        Ok(())
    }

    /// プロフィール更新
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, AppError> {
        if update.is_empty() {
            return Err(AppError::Validation(
                "At least one of first_name, last_name, phone_number, gender is required"
                    .to_string(),
            ));
        }

        let user = self.users.update_profile(user_id, &update).await?;
        tracing::info!(user_id = %user_id, "プロフィール更新完了");
        Ok(user)
    }
}
