//! crates/math_mentor_core/src/sanitize.rs
//!
//! Field-level repair of loosely-typed data. Everything that enters the
//! store (collaborator replies, manual entries, review edits, previously
//! saved state) passes through here, so a persisted record can never be
//! missing a required field.
//!
//! The `Raw*` structs accept any JSON shape: a field of the wrong type is
//! read as absent instead of failing the whole object.

use crate::domain::{
    DailyTask, Difficulty, ErrorRecord, Part, RecallQuestion, RecordDraft, TaskKind, Topic,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_SOURCE: &str = "Không rõ";
pub const DEFAULT_QUESTION: &str = "Nội dung câu hỏi đang được cập nhật...";
pub const DEFAULT_ERROR_TYPE: &str = "Lỗi tư duy";
pub const DEFAULT_SUB_TYPE: &str = "Dạng bài chung";
pub const DEFAULT_REMEDY: &str = "Hãy xem lại kiến thức cơ bản của chương này.";

//=========================================================================================
// Lenient Field Readers
//=========================================================================================

/// Reads a string, treating any other JSON type as absent.
pub fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Reads an array of strings, dropping non-string items. Any other JSON type
/// is absent.
pub fn lenient_string_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        _ => None,
    })
}

//=========================================================================================
// Raw Shapes
//=========================================================================================

/// A record-shaped object as the collaborator (or an editor) supplies it.
/// Doubles as a field patch: `None` means "not provided".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub part: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub topics: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub remedy: Option<String>,
}

impl RawRecord {
    /// Replaces every field that `patch` provides.
    pub fn overlay(&mut self, patch: RawRecord) {
        let RawRecord {
            source,
            question,
            difficulty,
            error_type,
            sub_type,
            part,
            topics,
            remedy,
        } = patch;
        self.source = source.or(self.source.take());
        self.question = question.or(self.question.take());
        self.difficulty = difficulty.or(self.difficulty.take());
        self.error_type = error_type.or(self.error_type.take());
        self.sub_type = sub_type.or(self.sub_type.take());
        self.part = part.or(self.part.take());
        self.topics = topics.or(self.topics.take());
        self.remedy = remedy.or(self.remedy.take());
    }
}

impl From<&RecordDraft> for RawRecord {
    fn from(draft: &RecordDraft) -> Self {
        Self {
            source: Some(draft.source.clone()),
            question: Some(draft.question.clone()),
            difficulty: Some(draft.difficulty.label().to_string()),
            error_type: Some(draft.error_type.clone()),
            sub_type: Some(draft.sub_type.clone()),
            part: Some(draft.part.label().to_string()),
            topics: Some(draft.topics.iter().map(|t| t.label().to_string()).collect()),
            remedy: Some(draft.remedy.clone()),
        }
    }
}

/// A record as found in local storage, possibly written by an older build.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub fields: RawRecord,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecallQuestion {
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: Option<String>,
    #[serde(default, alias = "body", deserialize_with = "lenient_string")]
    pub latex: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTask {
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub task: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub completed: Option<bool>,
}

//=========================================================================================
// Sanitizers
//=========================================================================================

fn text_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => default.to_string(),
    }
}

/// Keeps recognised topics in first-seen order without duplicates.
/// An empty result becomes `[Topic::Other]`.
pub fn sanitize_topics(labels: Option<&[String]>) -> Vec<Topic> {
    let mut topics = Vec::new();
    for label in labels.unwrap_or_default() {
        if let Some(topic) = Topic::from_label(label.trim()) {
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
    }
    if topics.is_empty() {
        topics.push(Topic::Other);
    }
    topics
}

/// Repairs every field of a record-shaped object. Never fails.
pub fn sanitize_record(raw: RawRecord) -> RecordDraft {
    let difficulty = raw
        .difficulty
        .as_deref()
        .and_then(|d| d.trim().parse::<Difficulty>().ok())
        .unwrap_or(Difficulty::Medium);
    let part = raw
        .part
        .as_deref()
        .and_then(|p| p.trim().parse::<Part>().ok())
        .unwrap_or(Part::I);
    let topics = sanitize_topics(raw.topics.as_deref());

    RecordDraft {
        source: text_or(raw.source, DEFAULT_SOURCE),
        question: text_or(raw.question, DEFAULT_QUESTION),
        difficulty,
        error_type: text_or(raw.error_type, DEFAULT_ERROR_TYPE),
        sub_type: text_or(raw.sub_type, DEFAULT_SUB_TYPE),
        part,
        topics,
        remedy: text_or(raw.remedy, DEFAULT_REMEDY),
    }
}

/// Repairs a previously saved record. A missing or unreadable id gets a
/// fresh one; a missing timestamp becomes `now`.
pub fn sanitize_stored_record(raw: StoredRecord, now: DateTime<Utc>) -> ErrorRecord {
    let id = raw
        .id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(Uuid::new_v4);
    let timestamp = raw
        .timestamp
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(now);
    let image_url = raw.image_url.filter(|url| !url.trim().is_empty());

    let mut record = sanitize_record(raw.fields).into_record(timestamp, image_url);
    record.id = id;
    record
}

/// Repairs a generated review question. Items without a body are dropped.
pub fn sanitize_recall_question(raw: RawRecallQuestion) -> Option<RecallQuestion> {
    let body = raw.latex.filter(|b| !b.trim().is_empty())?;
    let topic = raw
        .topic
        .as_deref()
        .and_then(|t| Topic::from_label(t.trim()))
        .unwrap_or(Topic::Other);
    Some(RecallQuestion {
        topic,
        body,
        explanation: raw.explanation.unwrap_or_default(),
    })
}

/// Repairs a scheduled task. Items without a description are dropped.
pub fn sanitize_task(raw: RawTask) -> Option<DailyTask> {
    let task = raw.task.filter(|t| !t.trim().is_empty())?;
    let kind = raw
        .kind
        .as_deref()
        .and_then(|k| k.parse::<TaskKind>().ok())
        .unwrap_or_default();
    Some(DailyTask {
        time: raw.time.unwrap_or_default(),
        task,
        kind,
        completed: raw.completed.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_object_gets_every_default() {
        let draft = sanitize_record(raw(json!({})));
        assert_eq!(draft.source, DEFAULT_SOURCE);
        assert_eq!(draft.question, DEFAULT_QUESTION);
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.error_type, DEFAULT_ERROR_TYPE);
        assert_eq!(draft.sub_type, DEFAULT_SUB_TYPE);
        assert_eq!(draft.part, Part::I);
        assert_eq!(draft.topics, vec![Topic::Other]);
        assert_eq!(draft.remedy, DEFAULT_REMEDY);
    }

    #[test]
    fn test_wrong_types_read_as_missing() {
        let draft = sanitize_record(raw(json!({
            "source": 42,
            "question": null,
            "difficulty": ["Khó"],
            "part": 3,
            "topics": "Oxyz",
        })));
        assert_eq!(draft.source, DEFAULT_SOURCE);
        assert_eq!(draft.question, DEFAULT_QUESTION);
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.part, Part::I);
        assert_eq!(draft.topics, vec![Topic::Other]);
    }

    #[test]
    fn test_invalid_topics_are_dropped_and_duplicates_collapsed() {
        let draft = sanitize_record(raw(json!({
            "topics": ["Đại số", "Oxyz", "Hàm số", "Oxyz", 7]
        })));
        assert_eq!(draft.topics, vec![Topic::Oxyz, Topic::Functions]);

        let only_invalid = sanitize_record(raw(json!({ "topics": ["Lượng giác"] })));
        assert_eq!(only_invalid.topics, vec![Topic::Other]);
    }

    #[test]
    fn test_valid_fields_are_kept() {
        let draft = sanitize_record(raw(json!({
            "source": "THPT Chuyên Hùng Vương - Phú Thọ",
            "question": "Tìm m để hàm số đồng biến",
            "difficulty": "Rất khó",
            "errorType": "Nhầm công thức",
            "subType": "Đơn điệu có tham số",
            "part": "III",
            "topics": ["Hàm số"],
            "remedy": "Ôn bảng biến thiên",
        })));
        assert_eq!(draft.source, "THPT Chuyên Hùng Vương - Phú Thọ");
        assert_eq!(draft.difficulty, Difficulty::VeryHard);
        assert_eq!(draft.part, Part::III);
        assert_eq!(draft.error_type, "Nhầm công thức");
    }

    #[test]
    fn test_blank_strings_count_as_missing() {
        let draft = sanitize_record(raw(json!({ "source": "   ", "remedy": "" })));
        assert_eq!(draft.source, DEFAULT_SOURCE);
        assert_eq!(draft.remedy, DEFAULT_REMEDY);
    }

    #[test]
    fn test_overlay_only_replaces_provided_fields() {
        let mut base = RawRecord::from(&sanitize_record(raw(json!({ "source": "Sở A" }))));
        base.overlay(raw(json!({ "question": "Câu mới", "part": "II" })));
        let draft = sanitize_record(base);
        assert_eq!(draft.source, "Sở A");
        assert_eq!(draft.question, "Câu mới");
        assert_eq!(draft.part, Part::II);
    }

    #[test]
    fn test_stored_record_keeps_identity() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let stored: StoredRecord = serde_json::from_value(json!({
            "id": id.to_string(),
            "timestamp": 1_700_000_000_000i64,
            "question": "Câu 5",
            "imageUrl": "data:image/png;base64,AAAA",
        }))
        .unwrap();
        let record = sanitize_stored_record(stored, now);
        assert_eq!(record.id, id);
        assert_eq!(record.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(record.question, "Câu 5");
        assert_eq!(record.image_url.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_stored_record_repairs_identity() {
        let now = Utc::now();
        let stored: StoredRecord =
            serde_json::from_value(json!({ "id": "k3j2h1g9f", "timestamp": "yesterday" })).unwrap();
        let record = sanitize_stored_record(stored, now);
        assert_eq!(record.timestamp, now);
        assert_eq!(record.topics, vec![Topic::Other]);
    }

    #[test]
    fn test_recall_question_sanitization() {
        let kept: RawRecallQuestion =
            serde_json::from_value(json!({ "topic": "Hình học", "latex": "x^2" })).unwrap();
        let question = sanitize_recall_question(kept).unwrap();
        assert_eq!(question.topic, Topic::Other);
        assert_eq!(question.explanation, "");

        let dropped: RawRecallQuestion =
            serde_json::from_value(json!({ "topic": "Oxyz", "latex": "  " })).unwrap();
        assert!(sanitize_recall_question(dropped).is_none());
    }

    #[test]
    fn test_task_sanitization() {
        let task: RawTask = serde_json::from_value(
            json!({ "time": "20:00", "task": "Ôn Oxyz", "type": "Recall", "completed": true }),
        )
        .unwrap();
        let task = sanitize_task(task).unwrap();
        assert_eq!(task.kind, TaskKind::Recall);
        assert!(task.completed);

        let unknown_kind: RawTask =
            serde_json::from_value(json!({ "task": "Chạy bộ", "type": "exercise" })).unwrap();
        assert_eq!(sanitize_task(unknown_kind).unwrap().kind, TaskKind::Study);

        let empty: RawTask = serde_json::from_value(json!({ "time": "7:00" })).unwrap();
        assert!(sanitize_task(empty).is_none());
    }

    fn field_strategy() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("Khó".to_string())),
            Just(Some("III".to_string())),
            ".{0,12}".prop_map(Some),
        ]
    }

    fn topics_strategy() -> impl Strategy<Value = Option<Vec<String>>> {
        let label = prop_oneof![
            prop::sample::select(
                Topic::ALL
                    .iter()
                    .map(|t| t.label().to_string())
                    .collect::<Vec<_>>(),
            ),
            ".{0,8}",
        ];
        prop::option::of(prop::collection::vec(label, 0..5))
    }

    prop_compose! {
        fn raw_record()(
            source in field_strategy(),
            question in field_strategy(),
            difficulty in field_strategy(),
            error_type in field_strategy(),
            sub_type in field_strategy(),
            part in field_strategy(),
            topics in topics_strategy(),
            remedy in field_strategy(),
        ) -> RawRecord {
            RawRecord { source, question, difficulty, error_type, sub_type, part, topics, remedy }
        }
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(input in raw_record()) {
            let once = sanitize_record(input);
            let twice = sanitize_record(RawRecord::from(&once));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn sanitized_topics_are_never_empty(input in raw_record()) {
            let draft = sanitize_record(input);
            prop_assert!(!draft.topics.is_empty());
        }
    }
}
