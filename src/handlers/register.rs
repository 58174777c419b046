use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::AppJson;
use crate::services::auth::Registration;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub gender: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
    pub message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub verification_code: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// ユーザー登録ハンドラー
///
/// POST /api/register
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    // バリデーション
    validate_register_request(&request)?;

    let user = state
        .auth
        .register(Registration {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            phone_number: request.phone_number,
            gender: request.gender,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
            message: "User registered. Check your email for the verification code.",
            created_at: user.created_at,
        }),
    ))
}

/// メールアドレス確認ハンドラー
///
/// POST /api/verify_email
pub async fn verify_email(
    State(state): State<AppState>,
    AppJson(request): AppJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_verify_request(&request)?;

    state
        .auth
        .verify_email(&request.email, &request.verification_code)
        .await?;

    Ok(Json(MessageResponse {
        message: "Email verified successfully",
    }))
}

/// 登録リクエストのバリデーション
fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    validate_email(&request.email)?;
    validate_new_password(&request.password)?;

    let profile = [
        ("first_name", &request.first_name),
        ("last_name", &request.last_name),
        ("phone_number", &request.phone_number),
        ("gender", &request.gender),
    ];
    for (field, value) in profile {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} is required")));
        }
    }
    Ok(())
}

fn validate_verify_request(request: &VerifyEmailRequest) -> Result<(), AppError> {
    validate_email(&request.email)?;
    validate_code(&request.verification_code, "verification_code")
}

/// email: 必須、簡易形式チェック（@ が含まれているか）
pub(crate) fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation(
            "email must be a valid email address".to_string(),
        ));
    }
    Ok(())
}

/// password: 必須（長さ制限なし）
pub(crate) fn validate_new_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    Ok(())
}

/// 6桁の数字コード
pub(crate) fn validate_code(code: &str, field: &str) -> Result<(), AppError> {
    let code = code.trim();
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(format!("{field} must be 6 digits")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            first_name: "Ama".to_string(),
            last_name: "Mensah".to_string(),
            phone_number: "0244000000".to_string(),
            gender: "F".to_string(),
        }
    }

    #[test]
    fn test_validate_empty_email() {
        let request = RegisterRequest {
            email: "".to_string(),
            ..valid_request()
        };
        let result = validate_register_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let request = RegisterRequest {
            email: "invalid-email".to_string(),
            ..valid_request()
        };
        let result = validate_register_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = RegisterRequest {
            password: "".to_string(),
            ..valid_request()
        };
        let result = validate_register_request(&request);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_short_password_accepted() {
        let request = RegisterRequest {
            password: "pw".to_string(),
            ..valid_request()
        };
        let result = validate_register_request(&request);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_blank_profile_field_is_named() {
        let request = RegisterRequest {
            last_name: "  ".to_string(),
            ..valid_request()
        };
        match validate_register_request(&request) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("last_name")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_validate_valid_request() {
        let result = validate_register_request(&valid_request());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_verification_code_format() {
        let request = VerifyEmailRequest {
            email: "test@example.com".to_string(),
            verification_code: "12ab56".to_string(),
        };
        assert!(validate_verify_request(&request).is_err());

        let request = VerifyEmailRequest {
            email: "test@example.com".to_string(),
            verification_code: "123456".to_string(),
        };
        assert!(validate_verify_request(&request).is_ok());
    }
}
