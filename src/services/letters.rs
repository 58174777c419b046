use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Document, DocumentUpdate, NewDocument, User};
use crate::repositories::{DocumentStore, UserStore};
use crate::services::documents::{DocumentPayload, build_context};
use crate::services::downloads::DownloadStore;
use crate::services::render::{DocumentRenderer, RenderedDocument, document_filename};

/// 書類生成の結果（保存済みレコードとダウンロードハンドル）
#[derive(Debug)]
pub struct GeneratedDocument {
    pub document: Document,
    pub download_handle: Uuid,
}

/// 書類の生成・参照・更新・削除
///
/// 参照と変更は所有者または管理者のみ
#[derive(Clone)]
pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    users: Arc<dyn UserStore>,
    renderer: Arc<DocumentRenderer>,
    downloads: Arc<DownloadStore>,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        users: Arc<dyn UserStore>,
        renderer: Arc<DocumentRenderer>,
        downloads: Arc<DownloadStore>,
    ) -> Self {
        Self {
            documents,
            users,
            renderer,
            downloads,
        }
    }

    /// 書類を生成し、保存してダウンロードハンドルを発行
    ///
    /// レンダリングに失敗した場合はレコードを保存しない
    pub async fn generate(
        &self,
        author: &User,
        payload: DocumentPayload,
    ) -> Result<GeneratedDocument, AppError> {
        let kind = payload.kind();
        let now = OffsetDateTime::now_utc();
        let fields = build_context(&payload, author, now)?;
        let filename = document_filename(kind, &author.last_name, now);
        let rendered = self.renderer.render(kind, &fields, &filename)?;

        let document = self
            .documents
            .create(NewDocument {
                user_id: author.id,
                user_first_name: author.first_name.clone(),
                user_last_name: author.last_name.clone(),
                kind,
                fields,
                filename,
            })
            .await?;

        let download_handle = self.downloads.insert(author.id, rendered)?;

        tracing::info!(
            user_id = %author.id,
            document_id = %document.id,
            kind = %kind,
            "書類生成完了"
        );

        Ok(GeneratedDocument {
            document,
            download_handle,
        })
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Document>, AppError> {
        self.documents.list_by_user(user_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Document>, AppError> {
        self.documents.list().await
    }

    /// 書類を取得（所有者または管理者）
    pub async fn get(&self, actor: &User, document_id: Uuid) -> Result<Document, AppError> {
        let document = self
            .documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Letter".to_string()))?;
        authorize(actor, &document)?;
        Ok(document)
    }

    /// 書類フィールドを更新
    ///
    /// 入力は保存済みの種別で再検証し、コンテキストは所有者の現在の情報で再構築する。
    /// ファイル名は作成時のまま
    pub async fn update(
        &self,
        actor: &User,
        document_id: Uuid,
        input: serde_json::Value,
    ) -> Result<Document, AppError> {
        let document = self.get(actor, document_id).await?;
        let payload = DocumentPayload::from_json(document.kind, input)?;

        let owner = self
            .users
            .find_by_id(document.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let now = OffsetDateTime::now_utc();
        let fields = build_context(&payload, &owner, now)?;

        let updated = self
            .documents
            .update(document.id, DocumentUpdate { fields })
            .await?;

        tracing::info!(
            actor_id = %actor.id,
            document_id = %document.id,
            "書類更新完了"
        );
        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, document_id: Uuid) -> Result<(), AppError> {
        let document = self.get(actor, document_id).await?;
        self.documents.delete(document.id).await?;
        tracing::info!(actor_id = %actor.id, document_id = %document.id, "書類削除完了");
        Ok(())
    }

    /// 保存済みの書類を再レンダリングして新しいハンドルを発行
    pub async fn prepare_download(
        &self,
        actor: &User,
        document_id: Uuid,
    ) -> Result<(Document, Uuid), AppError> {
        let document = self.get(actor, document_id).await?;
        let rendered = self
            .renderer
            .render(document.kind, &document.fields.0, &document.filename)?;
        let handle = self.downloads.insert(actor.id, rendered)?;
        Ok((document, handle))
    }

    /// ダウンロードハンドルからファイルを取り出す（一度きり）
    pub fn take_download(&self, actor: &User, handle: Uuid) -> Result<RenderedDocument, AppError> {
        self.downloads
            .take(handle, actor.id, actor.is_admin)?
            .ok_or_else(|| AppError::NotFound("Download".to_string()))
    }

    pub fn download_ttl_secs(&self) -> u64 {
        self.downloads.ttl().as_secs()
    }
}

fn authorize(actor: &User, document: &Document) -> Result<(), AppError> {
    if document.user_id == actor.id || actor.is_admin {
        return Ok(());
    }
    tracing::warn!(
        actor_id = %actor.id,
        document_id = %document.id,
        "他ユーザーの書類へのアクセスを拒否"
    );
    Err(AppError::Forbidden)
}
