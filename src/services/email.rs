use std::sync::Arc;

use async_trait::async_trait;
use minijinja::{Environment, context};

use crate::config::Config;
use crate::error::AppError;

const APP_NAME: &str = "Teachers Assistant";
const VERIFICATION_TEMPLATE: &str = "verification.html";
const PASSWORD_RESET_TEMPLATE: &str = "password_reset.html";

/// 認証コードメールの送信口
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(
        &self,
        to: &str,
        first_name: &str,
        verification_code: &str,
    ) -> Result<(), AppError>;

    async fn send_password_reset_email(
        &self,
        to: &str,
        first_name: &str,
        reset_code: &str,
    ) -> Result<(), AppError>;
}

/// メール送信サービス
///
/// `email` フィーチャー有効かつ SMTP 設定済みなら lettre で送信、
/// それ以外は本文をログ出力するだけ（開発モード）
#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
    templates: Arc<Environment<'static>>,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(config: Arc<Config>) -> Result<Self, AppError> {
        let mut env = Environment::new();
        let sources = [
            (
                VERIFICATION_TEMPLATE,
                include_str!("../../templates/email/verification.html"),
            ),
            (
                PASSWORD_RESET_TEMPLATE,
                include_str!("../../templates/email/password_reset.html"),
            ),
        ];
        for (name, source) in sources {
            env.add_template(name, source).map_err(|e| {
                tracing::error!(error = ?e, template = name, "メールテンプレートの読み込みに失敗");
                AppError::Internal(anyhow::anyhow!("invalid email template {name}: {e}"))
            })?;
        }

        Ok(Self {
            config,
            templates: Arc::new(env),
        })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, AppError> {
        self.templates
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|e| AppError::Email(format!("template {name}: {e}")))
    }

    fn smtp_configured(&self) -> bool {
        self.config.smtp_host.is_some()
            && self.config.smtp_username.is_some()
            && self.config.smtp_password.is_some()
            && self.config.smtp_from_address.is_some()
    }

    async fn deliver(&self, to: &str, subject: &str, body_html: String) -> Result<(), AppError> {
        if !self.smtp_configured() || !cfg!(feature = "email") {
            // 開発モード: メール送信せずログ出力のみ
            tracing::info!(to = %to, subject = %subject, "メール送信（開発モード）");
            tracing::debug!("{}", body_html);
            return Ok(());
        }

        #[cfg(feature = "email")]
        self.send_smtp(to, subject, body_html).await?;

        tracing::info!(to = %to, subject = %subject, "メール送信完了");
        Ok(())
    }

    #[cfg(feature = "email")]
    async fn send_smtp(&self, to: &str, subject: &str, body_html: String) -> Result<(), AppError> {
        use lettre::message::Mailbox;
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
        use secrecy::ExposeSecret;

        let (Some(host), Some(username), Some(password), Some(from)) = (
            &self.config.smtp_host,
            &self.config.smtp_username,
            &self.config.smtp_password,
            &self.config.smtp_from_address,
        ) else {
            return Err(AppError::Email("SMTP is not configured".to_string()));
        };

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| AppError::Email(format!("invalid from address: {e}")))?;
        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Email(format!("invalid recipient address: {e}")))?;

        let message = Message::builder()
            .from(from)
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body_html)
            .map_err(|e| AppError::Email(format!("message build error: {e}")))?;

        // 465 は SMTPS、それ以外は STARTTLS
        let builder = if self.config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| AppError::Email(format!("smtp relay error: {e}")))?;

        let mailer = builder
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                username.expose_secret().clone(),
                password.expose_secret().clone(),
            ))
            .build();

        mailer
            .send(message)
            .await
            .map_err(|e| AppError::Email(format!("smtp send error: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_verification_email(
        &self,
        to: &str,
        first_name: &str,
        verification_code: &str,
    ) -> Result<(), AppError> {
        let body = self.render(
            VERIFICATION_TEMPLATE,
            context! {
                app_name => APP_NAME,
                first_name => first_name,
                email => to,
                verification_code => verification_code,
            },
        )?;
        self.deliver(to, "Email Verification", body).await
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        first_name: &str,
        reset_code: &str,
    ) -> Result<(), AppError> {
        let body = self.render(
            PASSWORD_RESET_TEMPLATE,
            context! {
                app_name => APP_NAME,
                first_name => first_name,
                email => to,
                reset_code => reset_code,
                expires_in_minutes => self.config.reset_code_ttl_secs / 60,
            },
        )?;
        self.deliver(to, "Password Reset Request", body).await
    }
}

#[cfg(test)]
pub mod recording {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SentMail {
        Verification { to: String, code: String },
        PasswordReset { to: String, code: String },
    }

    /// 送信内容を記録するだけのテスト用 Mailer
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<SentMail>>,
        fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::default(),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }

        pub fn last_verification_code(&self, email: &str) -> Option<String> {
            self.sent().into_iter().rev().find_map(|m| match m {
                SentMail::Verification { to, code } if to == email => Some(code),
                _ => None,
            })
        }

        pub fn last_reset_code(&self, email: &str) -> Option<String> {
            self.sent().into_iter().rev().find_map(|m| match m {
                SentMail::PasswordReset { to, code } if to == email => Some(code),
                _ => None,
            })
        }

        fn record(&self, mail: SentMail) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::Email("smtp unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_verification_email(
            &self,
            to: &str,
            _first_name: &str,
            verification_code: &str,
        ) -> Result<(), AppError> {
            self.record(SentMail::Verification {
                to: to.to_string(),
                code: verification_code.to_string(),
            })
        }

        async fn send_password_reset_email(
            &self,
            to: &str,
            _first_name: &str,
            reset_code: &str,
        ) -> Result<(), AppError> {
            self.record(SentMail::PasswordReset {
                to: to.to_string(),
                code: reset_code.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Arc<Config> {
        Arc::new(
            envy::from_iter(vec![(
                "DATABASE_URL".to_string(),
                "postgres://localhost/test".to_string(),
            )])
            .unwrap(),
        )
    }

    #[test]
    fn test_verification_template_renders_code() {
        let service = EmailService::new(test_config()).unwrap();
        let body = service
            .render(
                VERIFICATION_TEMPLATE,
                context! {
                    app_name => APP_NAME,
                    first_name => "Ama",
                    email => "ama@school.edu",
                    verification_code => "123456",
                },
            )
            .unwrap();

        assert!(body.contains("Hi Ama,"));
        assert!(body.contains("123456"));
    }

    #[test]
    fn test_template_escapes_html() {
        let service = EmailService::new(test_config()).unwrap();
        let body = service
            .render(
                PASSWORD_RESET_TEMPLATE,
                context! {
                    app_name => APP_NAME,
                    first_name => "<script>",
                    email => "a@x.com",
                    reset_code => "654321",
                    expires_in_minutes => 60,
                },
            )
            .unwrap();

        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_unconfigured_smtp_logs_only() {
        let service = EmailService::new(test_config()).unwrap();
        let result = service
            .send_verification_email("a@x.com", "A", "123456")
            .await;
        assert!(result.is_ok());
    }
}
