//! crates/math_mentor_core/src/domain.rs
//!
//! Defines the core data structures for the study tracker: the closed
//! vocabularies (topics, difficulty, exam part, task type) and the records
//! that the store persists.
//!
//! Field names serialize in camelCase so that a saved record list keeps the
//! same shape the dashboard has always written to local storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Closed Vocabularies
//=========================================================================================

/// Returned when a label does not belong to one of the closed vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a recognised label")]
pub struct UnknownLabel(pub String);

/// A subject-area label attached to a record. The vocabulary is closed;
/// anything outside it is coerced to [`Topic::Other`] during sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "Oxyz")]
    Oxyz,
    #[serde(rename = "Xác suất")]
    Probability,
    #[serde(rename = "Tích phân cơ bản")]
    BasicIntegrals,
    #[serde(rename = "Vận tốc, chuyển động")]
    VelocityMotion,
    #[serde(rename = "Tích phân S V")]
    AreaVolumeIntegrals,
    #[serde(rename = "Hàm số")]
    Functions,
    #[serde(rename = "Ứng dụng hàm số")]
    FunctionApplications,
    #[serde(rename = "Cực trị hình học")]
    GeometricExtrema,
    #[serde(rename = "Tìm đường ngắn nhất")]
    ShortestPath,
    #[serde(rename = "Hình không gian")]
    SolidGeometry,
    #[serde(rename = "Khác")]
    Other,
}

impl Topic {
    /// Every topic, in the order the dashboard lists them.
    pub const ALL: [Topic; 11] = [
        Topic::Oxyz,
        Topic::Probability,
        Topic::BasicIntegrals,
        Topic::VelocityMotion,
        Topic::AreaVolumeIntegrals,
        Topic::Functions,
        Topic::FunctionApplications,
        Topic::GeometricExtrema,
        Topic::ShortestPath,
        Topic::SolidGeometry,
        Topic::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Topic::Oxyz => "Oxyz",
            Topic::Probability => "Xác suất",
            Topic::BasicIntegrals => "Tích phân cơ bản",
            Topic::VelocityMotion => "Vận tốc, chuyển động",
            Topic::AreaVolumeIntegrals => "Tích phân S V",
            Topic::Functions => "Hàm số",
            Topic::FunctionApplications => "Ứng dụng hàm số",
            Topic::GeometricExtrema => "Cực trị hình học",
            Topic::ShortestPath => "Tìm đường ngắn nhất",
            Topic::SolidGeometry => "Hình không gian",
            Topic::Other => "Khác",
        }
    }

    /// Exact-match lookup against the vocabulary.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.label() == label)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Topic {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// How hard the question was judged to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "Dễ")]
    Easy,
    #[default]
    #[serde(rename = "Trung bình")]
    Medium,
    #[serde(rename = "Khó")]
    Hard,
    #[serde(rename = "Rất khó")]
    VeryHard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Dễ",
            Difficulty::Medium => "Trung bình",
            Difficulty::Hard => "Khó",
            Difficulty::VeryHard => "Rất khó",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.label() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// The exam section a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Part {
    #[default]
    I,
    II,
    III,
}

impl Part {
    pub const ALL: [Part; 3] = [Part::I, Part::II, Part::III];

    pub fn label(self) -> &'static str {
        match self {
            Part::I => "I",
            Part::II => "II",
            Part::III => "III",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Part {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// What kind of activity a scheduled task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Study,
    Recall,
    Rest,
}

impl FromStr for TaskKind {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "study" => Ok(TaskKind::Study),
            "recall" => Ok(TaskKind::Recall),
            "rest" => Ok(TaskKind::Rest),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

//=========================================================================================
// Records
//=========================================================================================

/// One captured mistake. Instances are only ever built through sanitization,
/// so every field carries a usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub id: Uuid,
    /// School or province the exam came from.
    pub source: String,
    pub question: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub difficulty: Difficulty,
    /// Root cause of the mistake.
    pub error_type: String,
    /// Detailed problem pattern.
    pub sub_type: String,
    pub part: Part,
    pub topics: Vec<Topic>,
    pub remedy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// The sanitized content of a record before it has an identity. Staged
/// review items and manual entries live in this shape until committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub source: String,
    pub question: String,
    pub difficulty: Difficulty,
    pub error_type: String,
    pub sub_type: String,
    pub part: Part,
    pub topics: Vec<Topic>,
    pub remedy: String,
}

impl RecordDraft {
    /// Stamps a fresh identity onto the draft.
    pub fn into_record(self, timestamp: DateTime<Utc>, image_url: Option<String>) -> ErrorRecord {
        ErrorRecord {
            id: Uuid::new_v4(),
            source: self.source,
            question: self.question,
            timestamp,
            difficulty: self.difficulty,
            error_type: self.error_type,
            sub_type: self.sub_type,
            part: self.part,
            topics: self.topics,
            remedy: self.remedy,
            image_url,
        }
    }
}

impl From<&ErrorRecord> for RecordDraft {
    fn from(record: &ErrorRecord) -> Self {
        Self {
            source: record.source.clone(),
            question: record.question.clone(),
            difficulty: record.difficulty,
            error_type: record.error_type.clone(),
            sub_type: record.sub_type.clone(),
            part: record.part,
            topics: record.topics.clone(),
            remedy: record.remedy.clone(),
        }
    }
}

/// One scheduled activity in the daily study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTask {
    pub time: String,
    pub task: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub completed: bool,
}

/// A generated review question. Never persisted; regenerated each session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallQuestion {
    pub topic: Topic,
    /// LaTeX-formatted question body.
    #[serde(rename = "latex", alias = "body")]
    pub body: String,
    pub explanation: String,
}
