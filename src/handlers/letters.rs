use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{AppJson, AppPath, CurrentUser};
use crate::models::{Document, DocumentKind, User};
use crate::services::documents::{DocumentPayload, ExamPaper, LeaveLetter, TransferLetter};
use crate::services::letters::GeneratedDocument;
use crate::state::AppState;

/// 書類生成レスポンス
#[derive(Debug, Serialize)]
pub struct GeneratedResponse {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub filename: String,
    /// 一度だけ有効なダウンロードURL
    pub download_url: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct DownloadHandleResponse {
    pub filename: String,
    pub download_url: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

fn download_url(handle: Uuid) -> String {
    format!("/api/downloads/{handle}")
}

async fn generate(
    state: &AppState,
    user: &User,
    payload: DocumentPayload,
) -> Result<(StatusCode, Json<GeneratedResponse>), AppError> {
    let GeneratedDocument {
        document,
        download_handle,
    } = state.documents.generate(user, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(GeneratedResponse {
            id: document.id,
            kind: document.kind,
            filename: document.filename,
            download_url: download_url(download_handle),
            expires_in_secs: state.documents.download_ttl_secs(),
        }),
    ))
}

/// POST /api/letters/leave
pub async fn generate_leave_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(letter): AppJson<LeaveLetter>,
) -> Result<(StatusCode, Json<GeneratedResponse>), AppError> {
    generate(&state, &user, DocumentPayload::Leave(letter)).await
}

/// POST /api/letters/transfer
pub async fn generate_transfer_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(letter): AppJson<TransferLetter>,
) -> Result<(StatusCode, Json<GeneratedResponse>), AppError> {
    generate(&state, &user, DocumentPayload::Transfer(letter)).await
}

/// POST /api/letters/exam-paper
pub async fn generate_exam_paper(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(paper): AppJson<ExamPaper>,
) -> Result<(StatusCode, Json<GeneratedResponse>), AppError> {
    generate(&state, &user, DocumentPayload::Exam(paper)).await
}

/// GET /api/letters
///
/// ログイン中ユーザー自身の書類（新しい順）
pub async fn list_letters(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(state.documents.list_for_user(user.id).await?))
}

/// GET /api/letters/{id}
pub async fn get_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(state.documents.get(&user, id).await?))
}

/// 書類フィールド更新ハンドラー
///
/// PUT /api/letters/{id}
///
/// ボディは生成時と同じ形式。保存済みの種別で再検証する
pub async fn update_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<serde_json::Value>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(state.documents.update(&user, id, input).await?))
}

/// DELETE /api/letters/{id}
pub async fn delete_letter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    state.documents.delete(&user, id).await?;
    Ok(Json(DeletedResponse {
        message: "Letter deleted",
    }))
}

/// POST /api/letters/{id}/download
///
/// 保存済みの書類を再レンダリングし、新しいダウンロードURLを発行
pub async fn prepare_download(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DownloadHandleResponse>, AppError> {
    let (document, handle) = state.documents.prepare_download(&user, id).await?;

    Ok(Json(DownloadHandleResponse {
        filename: document.filename,
        download_url: download_url(handle),
        expires_in_secs: state.documents.download_ttl_secs(),
    }))
}

/// ダウンロードハンドラー
///
/// GET /api/downloads/{handle}
///
/// ハンドルは一度きり。取り出し済み・期限切れ・他ユーザーのハンドルは 404
pub async fn download(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(handle): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let file = state.documents.take_download(&user, handle)?;

    tracing::info!(user_id = %user.id, filename = %file.filename, "書類ダウンロード");

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    ))
}
