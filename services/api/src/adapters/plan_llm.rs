//! services/api/src/adapters/plan_llm.rs
//!
//! This module contains the adapter for the study-plan LLM.
//! It implements the `StudyPlanService` port from the `core` crate.

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
    ports::{PortError, PortResult, StudyPlanService},
};

const SYSTEM_PROMPT: &str = r#"Bạn là người lập kế hoạch học tập cho học sinh lớp 12 ôn thi THPTQG môn Toán.
Dựa trên thời gian biểu và các chủ đề yếu, hãy lập lịch cho cả ngày (24h), xen kẽ học, ôn Active Recall và nghỉ ngơi.
Trả về DUY NHẤT một đối tượng JSON dạng {"tasks": [{"time": "HH:MM - HH:MM", "task": "...", "type": "study" | "recall" | "rest"}]}, sắp xếp theo thời gian."#;

/// An adapter that implements `StudyPlanService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiPlanAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiPlanAdapter {
    /// Creates a new `OpenAiPlanAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn user_prompt(weak_topics: &[Topic], availability: &str) -> String {
    let names = if weak_topics.is_empty() {
        "chưa có".to_string()
    } else {
        weak_topics.iter().map(|t| t.label()).collect::<Vec<_>>().join(", ")
    };
    format!(
        "Chủ đề yếu: {}.\nThời gian biểu cố định: {}",
        names,
        availability.trim()
    )
}

#[async_trait]
impl StudyPlanService for OpenAiPlanAdapter {
    async fn generate_study_plan(
        &self,
        weak_topics: &[Topic],
        availability: &str,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt(weak_topics, availability))
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

        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(PortError::Unexpected(
                    "Plan LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(PortError::Unexpected(
                "Plan LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}
