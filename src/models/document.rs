use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

/// テンプレート変数のマッピング（JSONB として保存）
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// 生成できる書類の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    LeaveLetter,
    TransferLetter,
    ExamPaper,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeaveLetter => "leave_letter",
            Self::TransferLetter => "transfer_letter",
            Self::ExamPaper => "exam_paper",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 生成済み書類のレコード
///
/// 作成後は所有者または管理者による `DocumentUpdate` 以外で変更しない
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_first_name: String,
    pub user_last_name: String,
    pub kind: DocumentKind,
    pub fields: Json<FieldMap>,
    pub filename: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: Uuid,
    pub user_first_name: String,
    pub user_last_name: String,
    pub kind: DocumentKind,
    pub fields: FieldMap,
    pub filename: String,
}

/// 書類フィールドの明示的な更新
///
/// 種類・所有者・ファイル名・作成日時は変更対象外
#[derive(Debug, Clone)]
pub struct DocumentUpdate {
    pub fields: FieldMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_matches_db_label() {
        assert_eq!(DocumentKind::ExamPaper.to_string(), "exam_paper");
        assert_eq!(DocumentKind::LeaveLetter.as_str(), "leave_letter");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DocumentKind::TransferLetter).unwrap();
        assert_eq!(json, "\"transfer_letter\"");
    }
}
