use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,

    // セッション・コード設定
    /// ログインからのセッション有効期間（秒）
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
    #[serde(default = "default_reset_code_ttl_secs")]
    pub reset_code_ttl_secs: i64,

    /// ダウンロードハンドルの有効期間（秒）
    #[serde(default = "default_download_ttl_secs")]
    pub download_ttl_secs: u64,

    // Cookie / CORS
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,

    /// 登録時に管理者フラグを立てるメールアドレス（カンマ区切り）
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SESSION_TTL_SECS: i64 = 3 * 60 * 60;
const DEFAULT_RESET_CODE_TTL_SECS: i64 = 3600;
const DEFAULT_DOWNLOAD_TTL_SECS: u64 = 600;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_session_ttl_secs() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_reset_code_ttl_secs() -> i64 {
    DEFAULT_RESET_CODE_TTL_SECS
}

fn default_download_ttl_secs() -> u64 {
    DEFAULT_DOWNLOAD_TTL_SECS
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// 大文字小文字を無視して管理者メールアドレスか判定
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.trim().eq_ignore_ascii_case(email.trim()))
    }
}
