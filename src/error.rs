use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("認証エラー: {0}")]
    Authentication(String),

    #[error("セッションがありません")]
    SessionRequired,

    #[error("セッションの有効期限切れ")]
    SessionExpired,

    #[error("メールアドレス未確認: {0}")]
    EmailNotVerified(String),

    #[error("確認コードが無効です")]
    InvalidVerificationCode,

    #[error("リセットコードが無効または期限切れです")]
    InvalidResetCode,

    #[error("権限がありません")]
    Forbidden,

    #[error("見つかりません: {0}")]
    NotFound(String),

    #[error("このメールアドレスは既に使用されています: {0}")]
    EmailAlreadyExists(String),

    #[error("メール送信エラー: {0}")]
    Email(String),

    #[error("書類レンダリングエラー: {0}")]
    Render(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::EmailAlreadyExists(_) | Self::InvalidResetCode => {
                StatusCode::BAD_REQUEST
            }
            Self::Authentication(_) | Self::SessionRequired | Self::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::EmailNotVerified(_) | Self::InvalidVerificationCode | Self::Forbidden => {
                StatusCode::FORBIDDEN
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Email(_) | Self::Render(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Validation(msg) => msg.clone(),
            Self::Authentication(_) => "Invalid email or password".to_string(),
            Self::SessionRequired => "Authentication required".to_string(),
            Self::SessionExpired => "Session expired, please log in again".to_string(),
            Self::EmailNotVerified(email) => format!(
                "Email '{email}' is not verified. Please check your email for verification."
            ),
            Self::InvalidVerificationCode => "Invalid verification code".to_string(),
            Self::InvalidResetCode => "Invalid or expired reset code".to_string(),
            Self::Forbidden => "You are not allowed to access this resource".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::EmailAlreadyExists(email) => format!("User {email} already exists"),
            Self::Email(e) => {
                tracing::error!(error = %e, "メール送信エラー");
                "Failed to send email".to_string()
            }
            Self::Render(e) => {
                tracing::error!(error = %e, "書類レンダリングエラー");
                "Failed to generate document".to_string()
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                "Internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
