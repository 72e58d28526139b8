//! crates/math_mentor_core/src/reply.rs
//!
//! Parses the collaborator's raw reply text into a tagged result. Payloads
//! that are not JSON become `ParseError`; JSON of the wrong overall shape
//! becomes `SchemaError`; anything else is sanitized field by field and
//! returned as `Ok`.

use crate::domain::{DailyTask, RecallQuestion, RecordDraft};
use crate::sanitize::{
    sanitize_recall_question, sanitize_record, sanitize_task, RawRecallQuestion, RawRecord, RawTask,
};
use serde_json::Value;
use tracing::debug;

/// Outcome of reading one collaborator reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Ok(T),
    ParseError(String),
    SchemaError(String),
}

/// The failure branches of [`Reply`], for use with `?`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("the assistant reply was not valid JSON: {0}")]
    Parse(String),
    #[error("the assistant reply did not have the expected shape: {0}")]
    Schema(String),
}

impl<T> Reply<T> {
    pub fn into_result(self) -> Result<T, ReplyError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::ParseError(msg) => Err(ReplyError::Parse(msg)),
            Reply::SchemaError(msg) => Err(ReplyError::Schema(msg)),
        }
    }
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line. A fence written on
    // a single line has the info word glued to the payload.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_json(text: &str) -> Result<Value, String> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err("empty reply".to_string());
    }
    serde_json::from_str(body).map_err(|e| e.to_string())
}

/// Finds the list payload: either a bare array or the first array found
/// under one of `keys` in a wrapping object.
fn list_payload(value: Value, keys: &[&str]) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => keys.iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

fn sanitize_objects<R, T, F>(items: Vec<Value>, sanitize: F) -> Vec<T>
where
    R: serde::de::DeserializeOwned,
    F: Fn(R) -> Option<T>,
{
    items
        .into_iter()
        .filter_map(|item| {
            if !item.is_object() {
                debug!("Skipping non-object item in assistant reply: {}", item);
                return None;
            }
            serde_json::from_value::<R>(item).ok()
        })
        .filter_map(sanitize)
        .collect()
}

/// A single record-shaped object (image analysis).
pub fn parse_record_reply(text: &str) -> Reply<RecordDraft> {
    match parse_json(text) {
        Err(e) => Reply::ParseError(e),
        Ok(value @ Value::Object(_)) => match serde_json::from_value::<RawRecord>(value) {
            Ok(raw) => Reply::Ok(sanitize_record(raw)),
            Err(e) => Reply::SchemaError(e.to_string()),
        },
        Ok(other) => Reply::SchemaError(format!("expected an object, got {}", kind_of(&other))),
    }
}

/// A list of record-shaped objects (document extraction).
pub fn parse_record_list_reply(text: &str) -> Reply<Vec<RecordDraft>> {
    match parse_json(text) {
        Err(e) => Reply::ParseError(e),
        Ok(value) => match list_payload(value, &["records", "questions", "items"]) {
            Some(items) => Reply::Ok(sanitize_objects::<RawRecord, _, _>(items, |raw| {
                Some(sanitize_record(raw))
            })),
            None => Reply::SchemaError("expected an array of records".to_string()),
        },
    }
}

/// A list of `{topic, latex, explanation}` objects.
pub fn parse_recall_reply(text: &str) -> Reply<Vec<RecallQuestion>> {
    match parse_json(text) {
        Err(e) => Reply::ParseError(e),
        Ok(value) => match list_payload(value, &["questions", "items"]) {
            Some(items) => Reply::Ok(sanitize_objects::<RawRecallQuestion, _, _>(
                items,
                sanitize_recall_question,
            )),
            None => Reply::SchemaError("expected an array of recall questions".to_string()),
        },
    }
}

/// A `{tasks: [...]}` schedule.
pub fn parse_plan_reply(text: &str) -> Reply<Vec<DailyTask>> {
    match parse_json(text) {
        Err(e) => Reply::ParseError(e),
        Ok(value) => match list_payload(value, &["tasks"]) {
            Some(items) => Reply::Ok(sanitize_objects::<RawTask, _, _>(items, sanitize_task)),
            None => Reply::SchemaError("expected an object with a tasks array".to_string()),
        },
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, TaskKind, Topic};
    use crate::sanitize::DEFAULT_SOURCE;

    #[test]
    fn test_non_json_is_a_parse_error() {
        assert!(matches!(
            parse_record_reply("Xin lỗi, tôi không đọc được ảnh"),
            Reply::ParseError(_)
        ));
        assert!(matches!(parse_plan_reply(""), Reply::ParseError(_)));
    }

    #[test]
    fn test_wrong_shape_is_a_schema_error() {
        assert!(matches!(parse_record_reply("[1, 2]"), Reply::SchemaError(_)));
        assert!(matches!(parse_record_list_reply(r#"{"source": "x"}"#), Reply::SchemaError(_)));
        assert!(matches!(parse_plan_reply(r#"{"schedule": []}"#), Reply::SchemaError(_)));
    }

    #[test]
    fn test_record_reply_is_sanitized() {
        let reply = parse_record_reply(r#"{"question": "Tính xác suất", "difficulty": "??"}"#);
        let Reply::Ok(draft) = reply else {
            panic!("expected Ok, got {:?}", reply);
        };
        assert_eq!(draft.question, "Tính xác suất");
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.source, DEFAULT_SOURCE);
    }

    #[test]
    fn test_fenced_json_is_accepted() {
        let text = "```json\n{\"topics\": [\"Oxyz\"]}\n```";
        let draft = parse_record_reply(text).into_result().unwrap();
        assert_eq!(draft.topics, vec![Topic::Oxyz]);
    }

    #[test]
    fn test_single_line_fence_is_accepted() {
        let text = "```json {\"topics\": [\"Oxyz\"]}```";
        let draft = parse_record_reply(text).into_result().unwrap();
        assert_eq!(draft.topics, vec![Topic::Oxyz]);

        let bare = "```[{\"question\": \"Tính thể tích\"}]```";
        let items = parse_record_list_reply(bare).into_result().unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_record_list_accepts_bare_and_wrapped_arrays() {
        let bare = parse_record_list_reply(r#"[{"part": "II"}, 5, {"part": "III"}]"#)
            .into_result()
            .unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped = parse_record_list_reply(r#"{"records": [{"part": "II"}]}"#)
            .into_result()
            .unwrap();
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn test_plan_reply_drops_empty_tasks() {
        let tasks = parse_plan_reply(
            r#"{"tasks": [
                {"time": "19:00", "task": "Ôn Oxyz", "type": "study"},
                {"time": "21:00", "type": "rest"},
                {"time": "22:00", "task": "Tự kiểm tra", "type": "recall", "completed": true}
            ]}"#,
        )
        .into_result()
        .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].kind, TaskKind::Recall);
    }

    #[test]
    fn test_recall_reply() {
        let questions = parse_recall_reply(
            r#"{"questions": [{"topic": "Xác suất", "latex": "P(A)", "explanation": "Công thức cộng"}]}"#,
        )
        .into_result()
        .unwrap();
        assert_eq!(questions[0].topic, Topic::Probability);
    }
}
