//! crates/math_mentor_core/src/filter.rs
//!
//! Conjunctive filtering of the record list for the error log view.

use crate::domain::{ErrorRecord, Part, Topic, UnknownLabel};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The label that disables a topic or part predicate.
pub const ALL: &str = "All";

/// How far back the log view looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecencyWindow {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl RecencyWindow {
    /// `None` means unbounded.
    pub fn max_age(self) -> Option<Duration> {
        match self {
            RecencyWindow::All => None,
            RecencyWindow::Today => Some(Duration::days(1)),
            RecencyWindow::Week => Some(Duration::days(7)),
            RecencyWindow::Month => Some(Duration::days(30)),
        }
    }
}

impl FromStr for RecencyWindow {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(RecencyWindow::All),
            "Today" => Ok(RecencyWindow::Today),
            "Week" => Ok(RecencyWindow::Week),
            "Month" => Ok(RecencyWindow::Month),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// The four predicates of the log view. `Default` disables all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub topic: Option<Topic>,
    pub part: Option<Part>,
    pub search: String,
    pub window: RecencyWindow,
}

/// Reads a selector label where [`ALL`] (or nothing) means "no predicate".
pub fn parse_selector<T>(label: Option<&str>) -> Result<Option<T>, T::Err>
where
    T: FromStr,
{
    match label.map(str::trim) {
        None | Some("") | Some(ALL) => Ok(None),
        Some(label) => label.parse().map(Some),
    }
}

impl RecordFilter {
    pub fn matches(&self, record: &ErrorRecord, now: DateTime<Utc>) -> bool {
        if let Some(topic) = self.topic {
            if !record.topics.contains(&topic) {
                return false;
            }
        }
        if let Some(part) = self.part {
            if record.part != part {
                return false;
            }
        }
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            let hit = [&record.question, &record.source, &record.sub_type]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        match self.window.max_age() {
            Some(max_age) => now.signed_duration_since(record.timestamp) < max_age,
            None => true,
        }
    }
}

/// Returns the matching records in their original order.
pub fn filter_records<'a>(
    records: &'a [ErrorRecord],
    filter: &RecordFilter,
    now: DateTime<Utc>,
) -> Vec<&'a ErrorRecord> {
    records.iter().filter(|r| filter.matches(r, now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::{sanitize_record, RawRecord};
    use proptest::prelude::*;

    fn record(question: &str, topics: &[Topic], part: Part, age: Duration) -> ErrorRecord {
        let mut draft = sanitize_record(RawRecord {
            question: Some(question.to_string()),
            ..RawRecord::default()
        });
        draft.topics = topics.to_vec();
        draft.part = part;
        draft.into_record(Utc::now() - age, None)
    }

    fn sample() -> Vec<ErrorRecord> {
        vec![
            record("Mặt cầu ngoại tiếp", &[Topic::Oxyz], Part::I, Duration::hours(2)),
            record("Xác suất có điều kiện", &[Topic::Probability], Part::II, Duration::days(3)),
            record(
                "Thể tích khối tròn xoay",
                &[Topic::AreaVolumeIntegrals, Topic::Oxyz],
                Part::III,
                Duration::days(20),
            ),
            record("Cực trị hàm bậc ba", &[Topic::Functions], Part::I, Duration::days(45)),
        ]
    }

    #[test]
    fn test_default_filter_is_identity() {
        let records = sample();
        let filtered = filter_records(&records, &RecordFilter::default(), Utc::now());
        assert_eq!(filtered.len(), records.len());
        assert!(filtered.iter().zip(&records).all(|(a, b)| a.id == b.id));
    }

    #[test]
    fn test_topic_and_part_are_conjunctive() {
        let records = sample();
        let filter = RecordFilter {
            topic: Some(Topic::Oxyz),
            part: Some(Part::III),
            ..RecordFilter::default()
        };
        let filtered = filter_records(&records, &filter, Utc::now());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].question, "Thể tích khối tròn xoay");
    }

    #[test]
    fn test_search_is_case_insensitive_over_question_source_and_subtype() {
        let mut records = sample();
        records[3].source = "Sở GD Đắk Lắk".to_string();
        records[1].sub_type = "Bayes".to_string();

        let by_question = RecordFilter {
            search: "MẶT CẦU".to_string(),
            ..RecordFilter::default()
        };
        assert_eq!(filter_records(&records, &by_question, Utc::now()).len(), 1);

        let by_source = RecordFilter {
            search: "đắk lắk".to_string(),
            ..RecordFilter::default()
        };
        assert_eq!(filter_records(&records, &by_source, Utc::now())[0].id, records[3].id);

        let by_sub_type = RecordFilter {
            search: "bayes".to_string(),
            ..RecordFilter::default()
        };
        assert_eq!(filter_records(&records, &by_sub_type, Utc::now())[0].id, records[1].id);
    }

    #[test]
    fn test_recency_windows() {
        let records = sample();
        let now = Utc::now();
        let count = |window| {
            let filter = RecordFilter { window, ..RecordFilter::default() };
            filter_records(&records, &filter, now).len()
        };
        assert_eq!(count(RecencyWindow::Today), 1);
        assert_eq!(count(RecencyWindow::Week), 2);
        assert_eq!(count(RecencyWindow::Month), 3);
        assert_eq!(count(RecencyWindow::All), 4);
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(parse_selector::<Topic>(Some("All")).unwrap(), None);
        assert_eq!(parse_selector::<Topic>(None).unwrap(), None);
        assert_eq!(parse_selector::<Topic>(Some("Oxyz")).unwrap(), Some(Topic::Oxyz));
        assert_eq!(parse_selector::<Part>(Some("II")).unwrap(), Some(Part::II));
        assert!(parse_selector::<Part>(Some("IV")).is_err());
        assert_eq!("Week".parse::<RecencyWindow>().unwrap(), RecencyWindow::Week);
    }

    proptest! {
        #[test]
        fn default_filter_keeps_everything(ages in prop::collection::vec(0i64..10_000, 0..30)) {
            let records: Vec<ErrorRecord> = ages
                .iter()
                .map(|days| record("q", &[Topic::Other], Part::I, Duration::days(*days)))
                .collect();
            let filtered = filter_records(&records, &RecordFilter::default(), Utc::now());
            prop_assert_eq!(filtered.len(), records.len());
        }
    }
}
