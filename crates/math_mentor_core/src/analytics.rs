//! crates/math_mentor_core/src/analytics.rs
//!
//! Topic-frequency analysis and the 80/20 priority set.
//!
//! The priority set is the shortest prefix of the descending frequency list
//! whose cumulative share of all (record, topic) memberships reaches
//! [`PRIORITY_THRESHOLD`]. The first topic is always included, so the set is
//! non-empty whenever any record exists. The topic breakdown flags exactly
//! the members of this set as priority topics.

use crate::domain::{ErrorRecord, Topic};
use serde::Serialize;
use uuid::Uuid;

pub const PRIORITY_THRESHOLD: f64 = 0.8;
/// How many of the most frequent topics count as "weak" for recall and planning.
pub const WEAK_TOPIC_LIMIT: usize = 5;
pub const KEY_REMEDY_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopicFrequency {
    pub topic: Topic,
    pub count: usize,
}

/// Counts (record, topic) memberships per topic, most frequent first.
/// Ties keep the order in which topics were first encountered.
pub fn compute_topic_frequencies(records: &[ErrorRecord]) -> Vec<TopicFrequency> {
    let mut frequencies: Vec<TopicFrequency> = Vec::new();
    for topic in records.iter().flat_map(|r| r.topics.iter().copied()) {
        match frequencies.iter_mut().find(|f| f.topic == topic) {
            Some(entry) => entry.count += 1,
            None => frequencies.push(TopicFrequency { topic, count: 1 }),
        }
    }
    // `sort_by` is stable.
    frequencies.sort_by(|a, b| b.count.cmp(&a.count));
    frequencies
}

pub fn compute_priority_set(frequencies: &[TopicFrequency]) -> Vec<Topic> {
    let total = frequencies.iter().map(|f| f.count).sum::<usize>().max(1) as f64;
    let mut running = 0usize;
    let mut priority = Vec::new();
    for frequency in frequencies {
        priority.push(frequency.topic);
        running += frequency.count;
        if running as f64 / total >= PRIORITY_THRESHOLD {
            break;
        }
    }
    priority
}

/// The most frequent topics, capped at [`WEAK_TOPIC_LIMIT`].
pub fn weak_topics(frequencies: &[TopicFrequency]) -> Vec<Topic> {
    frequencies
        .iter()
        .take(WEAK_TOPIC_LIMIT)
        .map(|f| f.topic)
        .collect()
}

//=========================================================================================
// Topic Breakdown
//=========================================================================================

/// Per-topic detail for the topic analysis view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicInsight {
    pub topic: Topic,
    pub count: usize,
    pub most_common_sub_type: String,
    pub most_common_error_type: String,
    pub priority: bool,
    pub record_ids: Vec<Uuid>,
}

fn most_common<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    // `max_by_key` keeps the last maximum; walk in reverse so the first encountered wins.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, n)| *n)
        .map(|(v, _)| v.to_string())
}

pub fn topic_breakdown(records: &[ErrorRecord]) -> Vec<TopicInsight> {
    let frequencies = compute_topic_frequencies(records);
    let priority = compute_priority_set(&frequencies);

    frequencies
        .iter()
        .map(|frequency| {
            let members: Vec<&ErrorRecord> = records
                .iter()
                .filter(|r| r.topics.contains(&frequency.topic))
                .collect();
            TopicInsight {
                topic: frequency.topic,
                count: frequency.count,
                most_common_sub_type: most_common(members.iter().map(|r| r.sub_type.as_str()))
                    .unwrap_or_else(|| "N/A".to_string()),
                most_common_error_type: most_common(members.iter().map(|r| r.error_type.as_str()))
                    .unwrap_or_else(|| "N/A".to_string()),
                priority: priority.contains(&frequency.topic),
                record_ids: members.iter().map(|r| r.id).collect(),
            }
        })
        .collect()
}

//=========================================================================================
// Dashboard Summary
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyRemedy {
    pub topic: Topic,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_records: usize,
    pub topic_count: usize,
    pub priority_topics: Vec<Topic>,
    pub key_remedies: Vec<KeyRemedy>,
}

/// Everything derived from the record list in one pass. The store memoizes
/// this against its version counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub frequencies: Vec<TopicFrequency>,
    pub priority_set: Vec<Topic>,
    pub weak_topics: Vec<Topic>,
    pub breakdown: Vec<TopicInsight>,
    pub summary: DashboardSummary,
}

impl Analytics {
    pub fn compute(records: &[ErrorRecord]) -> Self {
        let frequencies = compute_topic_frequencies(records);
        let priority_set = compute_priority_set(&frequencies);
        let weak_topics = weak_topics(&frequencies);
        let breakdown = topic_breakdown(records);

        let key_remedies = records
            .iter()
            .filter(|r| !r.remedy.trim().is_empty())
            .take(KEY_REMEDY_LIMIT)
            .map(|r| KeyRemedy {
                topic: r.topics.first().copied().unwrap_or(Topic::Other),
                text: r.remedy.clone(),
            })
            .collect();

        let summary = DashboardSummary {
            total_records: records.len(),
            topic_count: frequencies.len(),
            priority_topics: priority_set.clone(),
            key_remedies,
        };

        Self {
            frequencies,
            priority_set,
            weak_topics,
            breakdown,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordDraft;
    use crate::sanitize::{sanitize_record, RawRecord};
    use chrono::Utc;
    use proptest::prelude::*;

    fn record(topics: &[Topic]) -> ErrorRecord {
        let mut draft = sanitize_record(RawRecord::default());
        draft.topics = topics.to_vec();
        draft.into_record(Utc::now(), None)
    }

    fn record_with(topics: &[Topic], sub_type: &str, error_type: &str) -> ErrorRecord {
        let draft = RecordDraft {
            sub_type: sub_type.to_string(),
            error_type: error_type.to_string(),
            ..sanitize_record(RawRecord::default())
        };
        let mut record = draft.into_record(Utc::now(), None);
        record.topics = topics.to_vec();
        record
    }

    #[test]
    fn test_frequencies_and_priority_scenario() {
        let records = vec![
            record(&[Topic::Oxyz]),
            record(&[Topic::Oxyz]),
            record(&[Topic::Probability]),
        ];
        let frequencies = compute_topic_frequencies(&records);
        assert_eq!(
            frequencies,
            vec![
                TopicFrequency { topic: Topic::Oxyz, count: 2 },
                TopicFrequency { topic: Topic::Probability, count: 1 },
            ]
        );
        // 2/3 < 0.8, so the walk continues to 3/3.
        assert_eq!(
            compute_priority_set(&frequencies),
            vec![Topic::Oxyz, Topic::Probability]
        );
    }

    #[test]
    fn test_dominant_topic_alone_is_priority() {
        let mut records: Vec<ErrorRecord> = (0..9).map(|_| record(&[Topic::Functions])).collect();
        records.push(record(&[Topic::SolidGeometry]));
        let frequencies = compute_topic_frequencies(&records);
        assert_eq!(compute_priority_set(&frequencies), vec![Topic::Functions]);
    }

    #[test]
    fn test_ties_keep_first_encountered_order() {
        let records = vec![
            record(&[Topic::ShortestPath]),
            record(&[Topic::Oxyz, Topic::ShortestPath]),
            record(&[Topic::Oxyz]),
        ];
        let order: Vec<Topic> = compute_topic_frequencies(&records)
            .into_iter()
            .map(|f| f.topic)
            .collect();
        assert_eq!(order, vec![Topic::ShortestPath, Topic::Oxyz]);
    }

    #[test]
    fn test_empty_input() {
        let frequencies = compute_topic_frequencies(&[]);
        assert!(frequencies.is_empty());
        assert!(compute_priority_set(&frequencies).is_empty());
        let analytics = Analytics::compute(&[]);
        assert_eq!(analytics.summary.total_records, 0);
        assert!(analytics.breakdown.is_empty());
    }

    #[test]
    fn test_weak_topics_are_capped() {
        let records: Vec<ErrorRecord> = Topic::ALL.iter().map(|t| record(&[*t])).collect();
        let weak = weak_topics(&compute_topic_frequencies(&records));
        assert_eq!(weak.len(), WEAK_TOPIC_LIMIT);
        assert_eq!(weak[0], Topic::Oxyz);
    }

    #[test]
    fn test_breakdown_reports_most_common_labels() {
        let records = vec![
            record_with(&[Topic::Probability], "Bayes", "Đọc đề"),
            record_with(&[Topic::Probability], "Tổ hợp", "Tính toán"),
            record_with(&[Topic::Probability], "Tổ hợp", "Đọc đề"),
            record_with(&[Topic::Oxyz], "Mặt phẳng", "Tính toán"),
        ];
        let breakdown = topic_breakdown(&records);
        assert_eq!(breakdown[0].topic, Topic::Probability);
        assert_eq!(breakdown[0].count, 3);
        assert_eq!(breakdown[0].most_common_sub_type, "Tổ hợp");
        assert_eq!(breakdown[0].most_common_error_type, "Đọc đề");
        assert!(breakdown[0].priority);
        assert_eq!(breakdown[0].record_ids.len(), 3);
        // 3/4 < 0.8, so Oxyz is needed to reach the threshold.
        assert!(breakdown[1].priority);
    }

    #[test]
    fn test_most_common_tie_prefers_first() {
        assert_eq!(
            most_common(["b", "a", "a", "b"].into_iter()),
            Some("b".to_string())
        );
        assert_eq!(most_common(std::iter::empty::<&str>()), None);
    }

    #[test]
    fn test_summary_key_remedies() {
        let records: Vec<ErrorRecord> = (0..5).map(|_| record(&[Topic::Oxyz])).collect();
        let analytics = Analytics::compute(&records);
        assert_eq!(analytics.summary.key_remedies.len(), KEY_REMEDY_LIMIT);
        assert_eq!(analytics.summary.key_remedies[0].topic, Topic::Oxyz);
        assert_eq!(analytics.summary.priority_topics, vec![Topic::Oxyz]);
    }

    fn records_strategy() -> impl Strategy<Value = Vec<ErrorRecord>> {
        let topics = prop::collection::vec(prop::sample::select(Topic::ALL.to_vec()), 0..4);
        prop::collection::vec(topics, 0..40)
            .prop_map(|lists| lists.iter().map(|topics| record(topics)).collect())
    }

    proptest! {
        #[test]
        fn frequencies_sum_to_memberships_and_descend(records in records_strategy()) {
            let frequencies = compute_topic_frequencies(&records);
            let memberships: usize = records.iter().map(|r| r.topics.len()).sum();
            prop_assert_eq!(frequencies.iter().map(|f| f.count).sum::<usize>(), memberships);
            prop_assert!(frequencies.windows(2).all(|w| w[0].count >= w[1].count));
        }

        #[test]
        fn priority_set_is_a_non_empty_prefix(records in records_strategy()) {
            let frequencies = compute_topic_frequencies(&records);
            let priority = compute_priority_set(&frequencies);
            if !frequencies.is_empty() {
                prop_assert!(!priority.is_empty());
            }
            prop_assert!(priority.len() <= frequencies.len());
            for (topic, frequency) in priority.iter().zip(&frequencies) {
                prop_assert_eq!(*topic, frequency.topic);
            }
        }
    }
}
