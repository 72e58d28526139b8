//! crates/math_mentor_core/src/extraction.rs
//!
//! Turns uploads into records. The image path produces one finished record;
//! the document path is a two-step flow (pick question numbers, then review
//! the staged results) tracked by [`DocumentFlow`].
//!
//! A collaborator failure never touches the store: the orchestrator returns
//! an error and the caller leaves state as it was.

use crate::domain::{ErrorRecord, Part, RecordDraft};
use crate::ports::{ErrorExtractionService, PortError};
use crate::reply::{parse_record_list_reply, parse_record_reply, ReplyError};
use crate::sanitize::{sanitize_record, RawRecord};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

//=========================================================================================
// Question Numbering
//=========================================================================================

/// Questions 1-12 are Part I, 13-16 Part II, 17-22 Part III.
pub const QUESTION_COUNT: u32 = 22;

pub fn part_for_question(number: u32) -> Option<Part> {
    match number {
        1..=12 => Some(Part::I),
        13..=16 => Some(Part::II),
        17..=22 => Some(Part::III),
        _ => None,
    }
}

/// The label printed on the exam sheet: `5`, `II-1`, `III-6`.
pub fn question_label(number: u32) -> Option<String> {
    match part_for_question(number)? {
        Part::I => Some(number.to_string()),
        Part::II => Some(format!("II-{}", number - 12)),
        Part::III => Some(format!("III-{}", number - 16)),
    }
}

/// The set of question numbers the student got wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuestionSelection(BTreeSet<u32>);

impl QuestionSelection {
    pub fn from_numbers(numbers: impl IntoIterator<Item = u32>) -> Result<Self, FlowError> {
        let mut selection = Self::default();
        for number in numbers {
            selection.check(number)?;
            selection.0.insert(number);
        }
        Ok(selection)
    }

    fn check(&self, number: u32) -> Result<(), FlowError> {
        part_for_question(number)
            .map(|_| ())
            .ok_or(FlowError::QuestionOutOfRange(number))
    }

    /// Flips one number; returns whether it is now selected.
    pub fn toggle(&mut self, number: u32) -> Result<bool, FlowError> {
        self.check(number)?;
        if self.0.remove(&number) {
            Ok(false)
        } else {
            self.0.insert(number);
            Ok(true)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn numbers(&self) -> Vec<u32> {
        self.0.iter().copied().collect()
    }
}

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("The upload was empty.")]
    EmptyUpload,
    #[error("The assistant could not be reached: {0}")]
    Collaborator(#[from] PortError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error("No questions could be extracted from the selected numbers.")]
    NothingExtracted,
}

/// Misuse of the document flow: an action that the current step does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("No document has been uploaded.")]
    NoDocument,
    #[error("Select at least one question before extracting.")]
    NothingSelected,
    #[error("Question {0} does not exist; valid numbers are 1 to 22.")]
    QuestionOutOfRange(u32),
    #[error("There are no extracted questions waiting for review.")]
    NotReviewing,
    #[error("Review item {0} does not exist.")]
    ItemOutOfRange(usize),
    #[error("The source name must not be empty.")]
    EmptySource,
}

//=========================================================================================
// Document Flow
//=========================================================================================

/// Where the two-step document flow currently stands.
#[derive(Debug, Clone, Default)]
pub enum DocumentFlow {
    #[default]
    Idle,
    /// A document is uploaded and the student is picking question numbers.
    Selecting {
        document: Vec<u8>,
        selection: QuestionSelection,
    },
    /// Extracted questions are staged for correction before committing.
    Reviewing {
        items: Vec<RecordDraft>,
        bulk_source: String,
    },
}

/// A serializable view of [`DocumentFlow`] without the raw document bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FlowSnapshot {
    Idle,
    Selecting {
        document_size: usize,
        selection: Vec<u32>,
        can_extract: bool,
    },
    Reviewing {
        items: Vec<RecordDraft>,
        bulk_source: String,
    },
}

impl DocumentFlow {
    /// Starts a new selection step, discarding whatever was in progress.
    pub fn open_document(&mut self, document: Vec<u8>) -> Result<(), FlowError> {
        if document.is_empty() {
            return Err(FlowError::NoDocument);
        }
        *self = DocumentFlow::Selecting {
            document,
            selection: QuestionSelection::default(),
        };
        Ok(())
    }

    fn selection_mut(&mut self) -> Result<&mut QuestionSelection, FlowError> {
        match self {
            DocumentFlow::Selecting { selection, .. } => Ok(selection),
            _ => Err(FlowError::NoDocument),
        }
    }

    pub fn toggle_question(&mut self, number: u32) -> Result<bool, FlowError> {
        self.selection_mut()?.toggle(number)
    }

    pub fn set_selection(&mut self, selection: QuestionSelection) -> Result<(), FlowError> {
        *self.selection_mut()? = selection;
        Ok(())
    }

    /// Extraction is only offered once at least one question is selected.
    pub fn can_extract(&self) -> bool {
        matches!(self, DocumentFlow::Selecting { selection, .. } if !selection.is_empty())
    }

    /// Hands out the document and selection and returns the flow to idle.
    /// If the extraction then fails, the input is simply gone.
    pub fn take_extraction_input(&mut self) -> Result<(Vec<u8>, QuestionSelection), FlowError> {
        match self {
            DocumentFlow::Selecting { selection, .. } if selection.is_empty() => {
                return Err(FlowError::NothingSelected)
            }
            DocumentFlow::Selecting { .. } => {}
            _ => return Err(FlowError::NoDocument),
        }
        let DocumentFlow::Selecting { document, selection } = std::mem::take(self) else {
            return Err(FlowError::NoDocument);
        };
        Ok((document, selection))
    }

    /// Opens the review step. The bulk-source field starts from the first item.
    pub fn stage(&mut self, items: Vec<RecordDraft>) {
        let bulk_source = items.first().map(|d| d.source.clone()).unwrap_or_default();
        *self = DocumentFlow::Reviewing { items, bulk_source };
    }

    fn items_mut(&mut self) -> Result<&mut Vec<RecordDraft>, FlowError> {
        match self {
            DocumentFlow::Reviewing { items, .. } => Ok(items),
            _ => Err(FlowError::NotReviewing),
        }
    }

    /// Applies the provided fields to one staged item and re-sanitizes it.
    pub fn update_item(
        &mut self,
        index: usize,
        patch: RawRecord,
    ) -> Result<RecordDraft, FlowError> {
        let item = self
            .items_mut()?
            .get_mut(index)
            .ok_or(FlowError::ItemOutOfRange(index))?;
        let mut raw = RawRecord::from(&*item);
        raw.overlay(patch);
        *item = sanitize_record(raw);
        Ok(item.clone())
    }

    /// Overwrites the source of every staged item.
    pub fn apply_bulk_source(&mut self, source: &str) -> Result<usize, FlowError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(FlowError::EmptySource);
        }
        let DocumentFlow::Reviewing { items, bulk_source } = self else {
            return Err(FlowError::NotReviewing);
        };
        *bulk_source = source.to_string();
        for item in items.iter_mut() {
            item.source = source.to_string();
        }
        Ok(items.len())
    }

    /// Turns every staged item into a record and returns the flow to idle.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<Vec<ErrorRecord>, FlowError> {
        match self {
            DocumentFlow::Reviewing { items, .. } if !items.is_empty() => {}
            _ => return Err(FlowError::NotReviewing),
        }
        let DocumentFlow::Reviewing { items, .. } = std::mem::take(self) else {
            return Err(FlowError::NotReviewing);
        };
        Ok(items
            .into_iter()
            .map(|draft| draft.into_record(now, None))
            .collect())
    }

    pub fn cancel(&mut self) {
        *self = DocumentFlow::Idle;
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        match self {
            DocumentFlow::Idle => FlowSnapshot::Idle,
            DocumentFlow::Selecting { document, selection } => FlowSnapshot::Selecting {
                document_size: document.len(),
                selection: selection.numbers(),
                can_extract: !selection.is_empty(),
            },
            DocumentFlow::Reviewing { items, bulk_source } => FlowSnapshot::Reviewing {
                items: items.clone(),
                bulk_source: bulk_source.clone(),
            },
        }
    }
}

//=========================================================================================
// Orchestrator
//=========================================================================================

/// Delegates extraction to the collaborator and sanitizes what comes back.
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    service: Arc<dyn ErrorExtractionService>,
}

impl ExtractionOrchestrator {
    pub fn new(service: Arc<dyn ErrorExtractionService>) -> Self {
        Self { service }
    }

    /// Analyzes one photographed question into a finished record that keeps
    /// the image as a data URL.
    pub async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
        now: DateTime<Utc>,
    ) -> Result<ErrorRecord, ExtractionError> {
        if image.is_empty() {
            return Err(ExtractionError::EmptyUpload);
        }
        let reply = self.service.analyze_image(image, mime_type).await?;
        let draft = parse_record_reply(&reply).into_result()?;
        let image_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(image));
        info!("Image analyzed into a '{}' record.", draft.sub_type);
        Ok(draft.into_record(now, Some(image_url)))
    }

    /// Extracts one draft per selected question. Extra items beyond the
    /// selection size are discarded.
    pub async fn extract_document(
        &self,
        document: &[u8],
        selection: &QuestionSelection,
    ) -> Result<Vec<RecordDraft>, ExtractionError> {
        if document.is_empty() {
            return Err(ExtractionError::EmptyUpload);
        }
        let numbers = selection.numbers();
        let reply = self.service.extract_document(document, &numbers).await?;
        let mut drafts = parse_record_list_reply(&reply).into_result()?;
        if drafts.is_empty() {
            return Err(ExtractionError::NothingExtracted);
        }
        drafts.truncate(numbers.len());
        info!(
            "Extracted {} of {} requested questions from the document.",
            drafts.len(),
            numbers.len()
        );
        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Topic;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with canned text, or fails when none is set.
    #[derive(Default)]
    struct CannedExtraction {
        reply: Option<String>,
        requested: Mutex<Vec<u32>>,
    }

    impl CannedExtraction {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                ..Self::default()
            }
        }

        fn result(&self) -> PortResult<String> {
            self.reply
                .clone()
                .ok_or_else(|| PortError::Unexpected("connection reset".to_string()))
        }
    }

    #[async_trait]
    impl ErrorExtractionService for CannedExtraction {
        async fn analyze_image(&self, _image: &[u8], _mime_type: &str) -> PortResult<String> {
            self.result()
        }

        async fn extract_document(
            &self,
            _document: &[u8],
            question_numbers: &[u32],
        ) -> PortResult<String> {
            *self.requested.lock().unwrap() = question_numbers.to_vec();
            self.result()
        }
    }

    #[test]
    fn test_question_labels() {
        assert_eq!(question_label(12).as_deref(), Some("12"));
        assert_eq!(question_label(13).as_deref(), Some("II-1"));
        assert_eq!(question_label(16).as_deref(), Some("II-4"));
        assert_eq!(question_label(17).as_deref(), Some("III-1"));
        assert_eq!(question_label(22).as_deref(), Some("III-6"));
        assert_eq!(question_label(0), None);
        assert_eq!(question_label(23), None);
    }

    #[test]
    fn test_selection_toggles_and_rejects_out_of_range() {
        let mut selection = QuestionSelection::default();
        assert!(selection.toggle(14).unwrap());
        assert!(selection.toggle(3).unwrap());
        assert!(!selection.toggle(14).unwrap());
        assert_eq!(selection.numbers(), vec![3]);
        assert_eq!(selection.toggle(30), Err(FlowError::QuestionOutOfRange(30)));
        assert!(QuestionSelection::from_numbers([1, 0]).is_err());
    }

    #[test]
    fn test_extraction_needs_a_selection() {
        let mut flow = DocumentFlow::default();
        assert!(!flow.can_extract());
        assert_eq!(flow.take_extraction_input().unwrap_err(), FlowError::NoDocument);

        flow.open_document(b"%PDF-1.7".to_vec()).unwrap();
        assert!(!flow.can_extract());
        assert_eq!(flow.take_extraction_input().unwrap_err(), FlowError::NothingSelected);

        flow.toggle_question(5).unwrap();
        assert!(flow.can_extract());
        let (document, selection) = flow.take_extraction_input().unwrap();
        assert_eq!(document, b"%PDF-1.7");
        assert_eq!(selection.numbers(), vec![5]);
        assert!(matches!(flow, DocumentFlow::Idle));
    }

    #[test]
    fn test_opening_a_document_resets_selection() {
        let mut flow = DocumentFlow::default();
        flow.open_document(b"a".to_vec()).unwrap();
        flow.toggle_question(1).unwrap();
        flow.open_document(b"b".to_vec()).unwrap();
        assert!(!flow.can_extract());
        assert_eq!(flow.open_document(Vec::new()), Err(FlowError::NoDocument));
    }

    #[test]
    fn test_review_edit_bulk_source_and_confirm() {
        let mut flow = DocumentFlow::default();
        let drafts = vec![
            sanitize_record(RawRecord {
                source: Some("Sở A".to_string()),
                ..RawRecord::default()
            }),
            sanitize_record(RawRecord::default()),
        ];
        flow.stage(drafts);
        let FlowSnapshot::Reviewing { bulk_source, .. } = flow.snapshot() else {
            panic!("expected review step");
        };
        assert_eq!(bulk_source, "Sở A");

        let edited = flow
            .update_item(1, RawRecord { part: Some("III".to_string()), ..RawRecord::default() })
            .unwrap();
        assert_eq!(edited.part, Part::III);
        assert_eq!(flow.update_item(7, RawRecord::default()), Err(FlowError::ItemOutOfRange(7)));

        assert_eq!(flow.apply_bulk_source("   "), Err(FlowError::EmptySource));
        assert_eq!(flow.apply_bulk_source("THPT Chuyên Lam Sơn").unwrap(), 2);

        let records = flow.confirm(Utc::now()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source == "THPT Chuyên Lam Sơn"));
        assert_eq!(records[1].part, Part::III);
        assert_ne!(records[0].id, records[1].id);
        assert!(matches!(flow, DocumentFlow::Idle));
        assert_eq!(flow.confirm(Utc::now()).unwrap_err(), FlowError::NotReviewing);
    }

    #[tokio::test]
    async fn test_image_analysis_builds_a_sanitized_record() {
        let service = Arc::new(CannedExtraction::replying(
            r#"{"question": "Tính khoảng cách", "topics": ["Oxyz", "Bogus"], "part": "X"}"#,
        ));
        let orchestrator = ExtractionOrchestrator::new(service);
        let record = orchestrator
            .analyze_image(&[0x89, 0x50], "image/png", Utc::now())
            .await
            .unwrap();
        assert_eq!(record.topics, vec![Topic::Oxyz]);
        assert_eq!(record.part, Part::I);
        assert_eq!(record.image_url.as_deref(), Some("data:image/png;base64,iVA="));
    }

    #[tokio::test]
    async fn test_image_analysis_failures() {
        let failing = ExtractionOrchestrator::new(Arc::new(CannedExtraction::default()));
        assert!(matches!(
            failing.analyze_image(b"img", "image/png", Utc::now()).await,
            Err(ExtractionError::Collaborator(_))
        ));
        assert!(matches!(
            failing.analyze_image(b"", "image/png", Utc::now()).await,
            Err(ExtractionError::EmptyUpload)
        ));

        let garbled = ExtractionOrchestrator::new(Arc::new(CannedExtraction::replying("<html>")));
        assert!(matches!(
            garbled.analyze_image(b"img", "image/png", Utc::now()).await,
            Err(ExtractionError::Reply(ReplyError::Parse(_)))
        ));
    }

    #[tokio::test]
    async fn test_document_extraction() {
        let service = Arc::new(CannedExtraction::replying(
            r#"{"records": [{"part": "I"}, {"part": "II"}, {"part": "III"}]}"#,
        ));
        let orchestrator = ExtractionOrchestrator::new(service.clone());
        let selection = QuestionSelection::from_numbers([14, 2]).unwrap();
        let drafts = orchestrator.extract_document(b"%PDF", &selection).await.unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(*service.requested.lock().unwrap(), vec![2, 14]);
    }

    #[tokio::test]
    async fn test_document_extraction_with_no_results_fails() {
        let orchestrator =
            ExtractionOrchestrator::new(Arc::new(CannedExtraction::replying(r#"{"records": []}"#)));
        let selection = QuestionSelection::from_numbers([1]).unwrap();
        assert!(matches!(
            orchestrator.extract_document(b"%PDF", &selection).await,
            Err(ExtractionError::NothingExtracted)
        ));
    }
}
