use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::DocumentStore;
use crate::error::AppError;
use crate::models::{Document, DocumentUpdate, NewDocument};

/// PostgreSQL 版書類リポジトリ
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn create(&self, document: NewDocument) -> Result<Document, AppError> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (id, user_id, user_first_name, user_last_name, kind, fields, filename)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, user_first_name, user_last_name, kind, fields, filename,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(document.user_id)
        .bind(&document.user_first_name)
        .bind(&document.user_last_name)
        .bind(document.kind)
        .bind(Json(&document.fields))
        .bind(&document.filename)
        .fetch_one(&self.pool)
        .await?;

        Ok(document)
    }

    async fn find_by_id(&self, document_id: Uuid) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, user_first_name, user_last_name, kind, fields, filename,
                   created_at, updated_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, user_first_name, user_last_name, kind, fields, filename,
                   created_at, updated_at
            FROM documents
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    async fn list(&self) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, user_first_name, user_last_name, kind, fields, filename,
                   created_at, updated_at
            FROM documents
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    async fn update(
        &self,
        document_id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Document, AppError> {
        sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET fields = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, user_first_name, user_last_name, kind, fields, filename,
                      created_at, updated_at
            "#,
        )
        .bind(document_id)
        .bind(Json(&update.fields))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Letter".to_string()))
    }

    async fn delete(&self, document_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Letter".to_string()));
        }
        Ok(())
    }
}
