//! services/api/src/adapters/recall_llm.rs
//!
//! This module contains the adapter for the recall-question LLM.
//! It implements the `RecallGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use math_mentor_core::{
    domain::Topic,
    ports::{PortError, PortResult, RecallGenerationService},
};

const SYSTEM_PROMPT: &str = r#"Bạn là giáo viên Toán luyện thi THPTQG. Hãy soạn các câu hỏi Active Recall ngắn giúp học sinh tự kiểm tra lại kiến thức ở những chủ đề hay làm sai.
Trả về DUY NHẤT một đối tượng JSON dạng {"questions": [{"topic": "...", "latex": "...", "explanation": "..."}]}.
"topic" phải là đúng một tên chủ đề được giao, "latex" là đề bài viết bằng LaTeX (công thức đặt trong $...$), "explanation" là gợi ý ôn tập một câu."#;

/// An adapter that implements `RecallGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiRecallAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiRecallAdapter {
    /// Creates a new `OpenAiRecallAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn user_prompt(topics: &[Topic]) -> String {
    let names = topics.iter().map(|t| t.label()).collect::<Vec<_>>().join(", ");
    format!(
        "Các chủ đề cần ôn: {}. Soạn 2 đến 3 câu hỏi cho mỗi chủ đề.",
        names
    )
}

#[async_trait]
impl RecallGenerationService for OpenAiRecallAdapter {
    async fn generate_recall_questions(&self, topics: &[Topic]) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt(topics))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Recall LLM response contained no text content.".to_string())
            })
    }
}
