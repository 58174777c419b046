use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{DocumentRepository, DocumentStore, UserRepository, UserStore};
use crate::services::{
    AuthService, DocumentRenderer, DocumentService, DownloadStore, EmailService, Mailer,
};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    /// 認証・セッション管理
    pub auth: AuthService,
    /// 書類の生成・管理
    pub documents: DocumentService,
    /// 一度きりのダウンロードハンドル（定期掃除のため main からも参照）
    pub downloads: Arc<DownloadStore>,
}

impl AppState {
    /// PostgreSQL と SMTP（または開発用ログ出力）で AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(db_pool.clone()));
        let documents: Arc<dyn DocumentStore> = Arc::new(DocumentRepository::new(db_pool));
        let mailer: Arc<dyn Mailer> = Arc::new(EmailService::new(config.clone())?);

        Self::from_parts(config, users, documents, mailer)
    }

    /// 任意のストア・メーラーから AppState を組み立てる
    pub fn from_parts(
        config: Arc<Config>,
        users: Arc<dyn UserStore>,
        documents: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AppError> {
        let renderer = Arc::new(DocumentRenderer::new()?);
        let downloads = Arc::new(DownloadStore::new(Duration::from_secs(
            config.download_ttl_secs,
        )));

        let auth = AuthService::new(users.clone(), mailer, config.clone());
        let documents =
            DocumentService::new(documents, users.clone(), renderer, downloads.clone());

        Ok(Self {
            config,
            users,
            auth,
            documents,
            downloads,
        })
    }
}
