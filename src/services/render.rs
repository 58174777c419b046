use minijinja::Environment;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::error::AppError;
use crate::models::DocumentKind;
use crate::models::document::FieldMap;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// レンダリング済みのファイル
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 書類テンプレートのレンダラー（minijinja、テンプレートはバイナリに埋め込み）
pub struct DocumentRenderer {
    env: Environment<'static>,
}

impl DocumentRenderer {
    pub fn new() -> Result<Self, AppError> {
        let mut env = Environment::new();
        let sources = [
            ("base.html", include_str!("../../templates/documents/base.html")),
            (
                template_name(DocumentKind::LeaveLetter),
                include_str!("../../templates/documents/leave_letter.html"),
            ),
            (
                template_name(DocumentKind::TransferLetter),
                include_str!("../../templates/documents/transfer_letter.html"),
            ),
            (
                template_name(DocumentKind::ExamPaper),
                include_str!("../../templates/documents/exam_paper.html"),
            ),
        ];
        for (name, source) in sources {
            env.add_template(name, source).map_err(|e| {
                tracing::error!(error = ?e, template = name, "書類テンプレートの読み込みに失敗");
                AppError::Render(format!("invalid template {name}: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// コンテキストを種別のテンプレートでレンダリング
    pub fn render(
        &self,
        kind: DocumentKind,
        context: &FieldMap,
        filename: &str,
    ) -> Result<RenderedDocument, AppError> {
        let html = self
            .env
            .get_template(template_name(kind))
            .and_then(|tmpl| tmpl.render(context))
            .map_err(|e| AppError::Render(format!("{kind}: {e}")))?;

        Ok(RenderedDocument {
            filename: filename.to_string(),
            content_type: HTML_CONTENT_TYPE,
            bytes: html.into_bytes(),
        })
    }
}

fn template_name(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::LeaveLetter => "leave_letter.html",
        DocumentKind::TransferLetter => "transfer_letter.html",
        DocumentKind::ExamPaper => "exam_paper.html",
    }
}

/// 生成ファイル名: `{kind}_{last_name}_{YYYYMMDDHHMMSS}.html`
pub fn document_filename(kind: DocumentKind, last_name: &str, at: OffsetDateTime) -> String {
    let name: String = last_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let name = if name.is_empty() { "teacher".to_string() } else { name };
    let stamp = at
        .format(format_description!(
            "[year][month][day][hour][minute][second]"
        ))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("{kind}_{name}_{stamp}.html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn context(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filename_format() {
        let name = document_filename(
            DocumentKind::LeaveLetter,
            "Mensah",
            datetime!(2026-10-18 09:05:07 UTC),
        );
        assert_eq!(name, "leave_letter_Mensah_20261018090507.html");
    }

    #[test]
    fn test_filename_strips_unsafe_characters() {
        let name = document_filename(
            DocumentKind::ExamPaper,
            "../O'Neil",
            datetime!(2026-10-18 09:05:07 UTC),
        );
        assert_eq!(name, "exam_paper_ONeil_20261018090507.html");
    }

    #[test]
    fn test_render_leave_letter() {
        let renderer = DocumentRenderer::new().unwrap();
        let ctx = context(json!({
            "teacher_name": "Ama Mensah",
            "teacher_email": "ama@school.edu",
            "teacher_phone": "0244000000",
            "generated_on": "18 October 2026",
            "recipient_title": "The Headmaster",
            "school_name": "Ho Bankoe Basic School",
            "school_address": "P.O. Box 12, Ho",
            "leave_type": "Annual",
            "start_date_long": "2 November 2026",
            "end_date_long": "6 November 2026",
            "leave_days": 5,
            "reason": "Family matters & travel."
        }));

        let doc = renderer
            .render(DocumentKind::LeaveLetter, &ctx, "leave.html")
            .unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();

        assert_eq!(doc.content_type, HTML_CONTENT_TYPE);
        assert!(html.contains("Dear The Headmaster,"));
        assert!(html.contains("5 days"));
        assert!(html.contains("Family matters &amp; travel."));
    }

    #[test]
    fn test_render_exam_paper_lists_options() {
        let renderer = DocumentRenderer::new().unwrap();
        let ctx = context(json!({
            "teacher_name": "Ama Mensah",
            "school_name": "Ho Bankoe Basic School",
            "subject": "Mathematics",
            "class_name": "JHS 2",
            "term": "First Term",
            "academic_year": "2026/2027",
            "duration_minutes": 90,
            "total_marks": 3,
            "questions": [
                { "text": "What is 2 + 2?", "marks": 1, "options": ["3", "4"] },
                { "text": "Define a prime number.", "marks": 2 }
            ]
        }));

        let doc = renderer
            .render(DocumentKind::ExamPaper, &ctx, "exam.html")
            .unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();

        assert!(html.contains("MATHEMATICS"));
        assert!(html.contains("(1 mark)"));
        assert!(html.contains("(2 marks)"));
        assert!(html.contains("<li>4</li>"));
    }
}
