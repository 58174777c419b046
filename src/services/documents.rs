//! 書類コンテキストビルダー
//!
//! 書類種別ごとの入力ペイロードを検証し、テンプレート変数のマッピングに変換する。

use garde::Validate;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::AppError;
use crate::models::document::FieldMap;
use crate::models::{DocumentKind, User};

fn not_blank(value: &String, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("must not be blank"));
    }
    Ok(())
}

fn iso_date(value: &String, _ctx: &()) -> garde::Result {
    parse_date(value)
        .map(|_| ())
        .map_err(|_| garde::Error::new("must be a date in YYYY-MM-DD format"))
}

fn parse_date(value: &str) -> Result<Date, time::error::Parse> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
}

fn long_date(date: Date) -> Result<String, AppError> {
    date.format(format_description!("[day padding:none] [month repr:long] [year]"))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("date format error: {e}")))
}

/// 休暇届
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LeaveLetter {
    #[garde(custom(not_blank), length(max = 120))]
    pub recipient_title: String,
    #[garde(length(min = 1, max = 120))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[garde(custom(not_blank), length(max = 200))]
    pub school_name: String,
    #[garde(custom(not_blank), length(max = 300))]
    pub school_address: String,
    /// 例: "Annual", "Sick", "Maternity", "Study"
    #[garde(custom(not_blank), length(max = 60))]
    pub leave_type: String,
    #[garde(custom(iso_date))]
    pub start_date: String,
    #[garde(custom(iso_date))]
    pub end_date: String,
    #[garde(custom(not_blank), length(max = 4000))]
    pub reason: String,
    #[garde(length(min = 1, max = 200))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_during_leave: Option<String>,
}

/// 転勤願
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferLetter {
    #[garde(custom(not_blank), length(max = 120))]
    pub recipient_title: String,
    #[garde(custom(not_blank), length(max = 200))]
    pub current_school: String,
    #[garde(custom(not_blank), length(max = 300))]
    pub current_school_address: String,
    #[garde(custom(not_blank), length(max = 200))]
    pub destination_school: String,
    #[garde(custom(not_blank), length(max = 200))]
    pub destination_district: String,
    #[garde(custom(not_blank), length(max = 4000))]
    pub reason: String,
    #[garde(range(max = 60))]
    pub years_of_service: u32,
    /// YYYY-MM-DD（構築時に検証）
    #[garde(length(min = 1, max = 10))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[garde(length(min = 1, max = 40))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExamQuestion {
    #[garde(custom(not_blank), length(max = 2000))]
    pub text: String,
    #[garde(range(min = 1, max = 100))]
    pub marks: u32,
    /// 選択肢（多肢選択問題のみ）
    #[garde(length(min = 2, max = 6))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// 試験問題
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExamPaper {
    #[garde(custom(not_blank), length(max = 200))]
    pub school_name: String,
    #[garde(custom(not_blank), length(max = 120))]
    pub subject: String,
    #[garde(custom(not_blank), length(max = 60))]
    pub class_name: String,
    #[garde(custom(not_blank), length(max = 60))]
    pub term: String,
    #[garde(custom(not_blank), length(max = 20))]
    pub academic_year: String,
    #[garde(range(min = 1, max = 600))]
    pub duration_minutes: u32,
    #[garde(length(min = 1, max = 4000))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[garde(length(min = 1, max = 200), dive)]
    pub questions: Vec<ExamQuestion>,
}

/// 種別付きの書類ペイロード
#[derive(Debug, Clone)]
pub enum DocumentPayload {
    Leave(LeaveLetter),
    Transfer(TransferLetter),
    Exam(ExamPaper),
}

impl DocumentPayload {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Leave(_) => DocumentKind::LeaveLetter,
            Self::Transfer(_) => DocumentKind::TransferLetter,
            Self::Exam(_) => DocumentKind::ExamPaper,
        }
    }

    /// 任意のJSONを指定種別のペイロードとして解釈・検証
    ///
    /// 書類更新時に、保存済みの種別に対して入力を再検証するために使う
    pub fn from_json(kind: DocumentKind, value: serde_json::Value) -> Result<Self, AppError> {
        let payload = match kind {
            DocumentKind::LeaveLetter => Self::Leave(deserialize(value)?),
            DocumentKind::TransferLetter => Self::Transfer(deserialize(value)?),
            DocumentKind::ExamPaper => Self::Exam(deserialize(value)?),
        };
        payload.validate()?;
        Ok(payload)
    }

    /// フィールド単位の検証（garde）と項目間の整合性チェック
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            Self::Leave(letter) => {
                Validate::validate(letter)?;
                let start = parse_date(&letter.start_date).map_err(date_error("start_date"))?;
                let end = parse_date(&letter.end_date).map_err(date_error("end_date"))?;
                if end < start {
                    return Err(AppError::Validation(
                        "end_date: must not be before start_date".to_string(),
                    ));
                }
            }
            Self::Transfer(letter) => {
                Validate::validate(letter)?;
                if let Some(date) = &letter.effective_date {
                    parse_date(date).map_err(date_error("effective_date"))?;
                }
            }
            Self::Exam(paper) => {
                Validate::validate(paper)?;
            }
        }
        Ok(())
    }
}

fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))
}

fn date_error(field: &'static str) -> impl Fn(time::error::Parse) -> AppError {
    move |_| AppError::Validation(format!("{field}: must be a date in YYYY-MM-DD format"))
}

/// ペイロードと作成者情報からテンプレート変数のマッピングを構築
///
/// 入力フィールドに加え、作成者情報（teacher_*）、作成日、派生値
/// （休暇日数・合計点・長形式の日付）を含める
pub fn build_context(
    payload: &DocumentPayload,
    author: &User,
    generated_at: OffsetDateTime,
) -> Result<FieldMap, AppError> {
    payload.validate()?;

    let value = match payload {
        DocumentPayload::Leave(letter) => serde_json::to_value(letter),
        DocumentPayload::Transfer(letter) => serde_json::to_value(letter),
        DocumentPayload::Exam(paper) => serde_json::to_value(paper),
    }
    .map_err(|e| AppError::Internal(anyhow::anyhow!("payload serialization error: {e}")))?;

    let serde_json::Value::Object(mut context) = value else {
        return Err(AppError::Internal(anyhow::anyhow!(
            "payload did not serialize to an object"
        )));
    };

    context.insert("teacher_name".into(), author.full_name().into());
    context.insert("teacher_email".into(), author.email.clone().into());
    context.insert("teacher_phone".into(), author.phone_number.clone().into());
    context.insert(
        "generated_on".into(),
        long_date(generated_at.date())?.into(),
    );

    match payload {
        DocumentPayload::Leave(letter) => {
            let start = parse_date(&letter.start_date).map_err(date_error("start_date"))?;
            let end = parse_date(&letter.end_date).map_err(date_error("end_date"))?;
            // 開始日・終了日を含む
            let leave_days = (end - start).whole_days() + 1;
            context.insert("leave_days".into(), leave_days.into());
            context.insert("start_date_long".into(), long_date(start)?.into());
            context.insert("end_date_long".into(), long_date(end)?.into());
        }
        DocumentPayload::Transfer(letter) => {
            if let Some(date) = &letter.effective_date {
                let date = parse_date(date).map_err(date_error("effective_date"))?;
                context.insert("effective_date_long".into(), long_date(date)?.into());
            }
        }
        DocumentPayload::Exam(paper) => {
            let total_marks: u32 = paper.questions.iter().map(|q| q.marks).sum();
            context.insert("total_marks".into(), total_marks.into());
            context.insert("question_count".into(), paper.questions.len().into());
        }
    }

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;
    use uuid::Uuid;

    fn author() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: "ama@school.edu".to_string(),
            password_hash: String::new(),
            first_name: "Ama".to_string(),
            last_name: "Mensah".to_string(),
            phone_number: "0244000000".to_string(),
            gender: "F".to_string(),
            is_verified: true,
            verification_code: None,
            reset_code: None,
            reset_code_expires_at: None,
            session_token_hash: None,
            last_login: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn leave_json() -> serde_json::Value {
        json!({
            "recipient_title": "The Headmaster",
            "school_name": "Ho Bankoe Basic School",
            "school_address": "P.O. Box 12, Ho",
            "leave_type": "Annual",
            "start_date": "2026-11-02",
            "end_date": "2026-11-06",
            "reason": "I wish to attend to family matters."
        })
    }

    #[test]
    fn test_leave_letter_context() {
        let payload = DocumentPayload::from_json(DocumentKind::LeaveLetter, leave_json()).unwrap();
        let context =
            build_context(&payload, &author(), datetime!(2026-10-18 09:00 UTC)).unwrap();

        assert_eq!(context["teacher_name"], "Ama Mensah");
        assert_eq!(context["leave_days"], 5);
        assert_eq!(context["start_date_long"], "2 November 2026");
        assert_eq!(context["generated_on"], "18 October 2026");
        assert_eq!(context["school_name"], "Ho Bankoe Basic School");
        assert!(!context.contains_key("recipient_name"));
    }

    #[test]
    fn test_missing_required_field_names_field() {
        let mut value = leave_json();
        value.as_object_mut().unwrap().remove("reason");

        let err = DocumentPayload::from_json(DocumentKind::LeaveLetter, value).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("reason"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_field_rejected() {
        let mut value = leave_json();
        value["school_name"] = json!("   ");

        let err = DocumentPayload::from_json(DocumentKind::LeaveLetter, value).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("school_name"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut value = leave_json();
        value["end_date"] = json!("2026-11-01");

        let result = DocumentPayload::from_json(DocumentKind::LeaveLetter, value);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let mut value = leave_json();
        value["start_date"] = json!("02/11/2026");

        let result = DocumentPayload::from_json(DocumentKind::LeaveLetter, value);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_transfer_effective_date_validated() {
        let value = json!({
            "recipient_title": "The District Director",
            "current_school": "Ho Bankoe Basic School",
            "current_school_address": "P.O. Box 12, Ho",
            "destination_school": "Keta Senior High",
            "destination_district": "Keta Municipal",
            "reason": "To join my spouse.",
            "years_of_service": 6,
            "effective_date": "next term"
        });

        let result = DocumentPayload::from_json(DocumentKind::TransferLetter, value);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_exam_paper_totals() {
        let value = json!({
            "school_name": "Ho Bankoe Basic School",
            "subject": "Mathematics",
            "class_name": "JHS 2",
            "term": "First Term",
            "academic_year": "2026/2027",
            "duration_minutes": 90,
            "questions": [
                { "text": "What is 2 + 2?", "marks": 2, "options": ["3", "4", "5", "22"] },
                { "text": "Prove that the sum of angles in a triangle is 180 degrees.", "marks": 8 }
            ]
        });

        let payload = DocumentPayload::from_json(DocumentKind::ExamPaper, value).unwrap();
        let context =
            build_context(&payload, &author(), datetime!(2026-10-18 09:00 UTC)).unwrap();

        assert_eq!(context["total_marks"], 10);
        assert_eq!(context["question_count"], 2);
    }

    #[test]
    fn test_exam_paper_requires_questions() {
        let value = json!({
            "school_name": "Ho Bankoe Basic School",
            "subject": "Mathematics",
            "class_name": "JHS 2",
            "term": "First Term",
            "academic_year": "2026/2027",
            "duration_minutes": 90,
            "questions": []
        });

        let err = DocumentPayload::from_json(DocumentKind::ExamPaper, value).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("questions"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_kind_payload_rejected() {
        let result = DocumentPayload::from_json(DocumentKind::ExamPaper, leave_json());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
