//! services/api/src/adapters/extraction_llm.rs
//!
//! This module contains the adapter for the multimodal extraction model.
//! It implements the `ErrorExtractionService` port from the `core` crate.
//!
//! Image and PDF parts are not covered by the typed request builders for every
//! provider, so the requests are built as raw JSON and sent through the
//! bring-your-own-types entry point.

use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use math_mentor_core::{
    domain::Topic,
    ports::{ErrorExtractionService, PortError, PortResult},
};
use serde_json::{json, Value};
use tracing::debug;

const IMAGE_PROMPT: &str = r#"Bạn là trợ lý phân tích lỗi sai môn Toán cho học sinh ôn thi THPTQG.
Ảnh đính kèm là một câu hỏi học sinh đã làm sai. Hãy trả về DUY NHẤT một đối tượng JSON với các trường:
- "source": tên Sở/Trường ra đề nếu thấy ở đầu ảnh, nếu không thì "Không rõ".
- "question": nội dung câu hỏi (công thức viết bằng LaTeX).
- "difficulty": một trong "Dễ", "Trung bình", "Khó", "Rất khó".
- "subType": dạng bài cụ thể.
- "errorType": nguyên nhân sai (tính toán, nhầm công thức, đọc đề...).
- "part": "I", "II" hoặc "III".
- "topics": mảng chủ đề, chỉ chọn trong danh sách: {topics}.
- "remedy": cách khắc phục ngắn gọn.
Không được để trống trường nào."#;

const DOCUMENT_PROMPT: &str = r#"Bạn là trợ lý phân tích lỗi sai môn Toán cho học sinh ôn thi THPTQG.
Tệp PDF đính kèm là một đề thi. Hãy trích xuất đúng các câu số: {numbers}, theo đúng thứ tự đó.
Tên Sở/Trường ra đề thường nằm ở tiêu đề trang đầu; dùng chung tên đó làm "source" cho mọi câu.
Trả về DUY NHẤT một đối tượng JSON dạng {"records": [...]}, mỗi phần tử có các trường
"source", "question", "difficulty" ("Dễ", "Trung bình", "Khó", "Rất khó"), "subType", "errorType",
"part" ("I", "II", "III"), "topics" (chỉ chọn trong: {topics}) và "remedy".
Mọi trường đều phải là chuỗi có nội dung, không dùng null."#;

fn topic_list() -> String {
    Topic::ALL
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pulls the text content out of the first choice of a chat completion body.
pub(crate) fn first_choice_text(response: &Value) -> PortResult<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PortError::Unexpected(
                "Extraction model response contained no text content.".to_string(),
            )
        })
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ErrorExtractionService` using an OpenAI-compatible
/// vision model.
#[derive(Clone)]
pub struct OpenAiExtractionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiExtractionAdapter {
    /// Creates a new `OpenAiExtractionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn image_request(&self, image: &[u8], mime_type: &str) -> Value {
        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(image));
        json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": IMAGE_PROMPT.replace("{topics}", &topic_list()) },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        })
    }

    fn document_request(&self, document: &[u8], question_numbers: &[u32]) -> Value {
        let numbers = question_numbers
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = DOCUMENT_PROMPT
            .replace("{numbers}", &numbers)
            .replace("{topics}", &topic_list());
        json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "file",
                        "file": {
                            "filename": "exam.pdf",
                            "file_data": format!("data:application/pdf;base64,{}", STANDARD.encode(document))
                        }
                    }
                ]
            }]
        })
    }

    async fn send(&self, request: Value) -> PortResult<String> {
        let response: Value = self
            .client
            .chat()
            .create_byot(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;
        first_choice_text(&response)
    }
}

//=========================================================================================
// `ErrorExtractionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ErrorExtractionService for OpenAiExtractionAdapter {
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> PortResult<String> {
        debug!("Sending a {} byte {} image for analysis.", image.len(), mime_type);
        self.send(self.image_request(image, mime_type)).await
    }

    async fn extract_document(
        &self,
        document: &[u8],
        question_numbers: &[u32],
    ) -> PortResult<String> {
        debug!(
            "Sending a {} byte document for questions {:?}.",
            document.len(),
            question_numbers
        );
        self.send(self.document_request(document, question_numbers))
            .await
    }
}
