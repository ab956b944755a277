//! Question is a pair <question, answer> plus its scheduling state.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Interval given to a freshly added or reset question.
pub const INITIAL_INTERVAL_DAYS: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub last_reviewed: Option<NaiveDate>,
    pub next_review: NaiveDate,
    pub interval_days: u32,
}

impl Question {
    /// Topic tag written as a leading `[TOPIC]`, if any.
    pub fn topic(&self) -> Option<&str> {
        let rest = self.question.trim_start().strip_prefix('[')?;
        let end = rest.find(']')?;
        Some(rest[..end].trim())
    }

    /// Short label used in review lists.
    pub fn label(&self) -> String {
        match self.topic() {
            Some(topic) => format!("[{}] - Review Now", topic),
            None => format!("{} - Review Now", self.question),
        }
    }
}

/// Partial update of a question row. `None` leaves a column untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuestionUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    /// `Some(None)` clears the column.
    pub last_reviewed: Option<Option<NaiveDate>>,
    pub next_review: Option<NaiveDate>,
    pub interval_days: Option<u32>,
}

impl QuestionUpdate {
    /// Fields written after a review on `today`.
    pub fn reviewed(today: NaiveDate, next_review: NaiveDate, interval_days: u32) -> Self {
        Self {
            last_reviewed: Some(Some(today)),
            next_review: Some(next_review),
            interval_days: Some(interval_days),
            ..Default::default()
        }
    }

    /// Fields that put a question back at the start of the schedule.
    pub fn reset(today: NaiveDate) -> Self {
        Self {
            last_reviewed: Some(None),
            next_review: Some(today),
            interval_days: Some(INITIAL_INTERVAL_DAYS),
            ..Default::default()
        }
    }

    /// Snapshot of the scheduling columns of `question`.
    pub fn schedule_of(question: &Question) -> Self {
        Self {
            last_reviewed: Some(question.last_reviewed),
            next_review: Some(question.next_review),
            interval_days: Some(question.interval_days),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the update to an in-memory copy.
    pub fn apply_to(&self, question: &mut Question) {
        if let Some(text) = &self.question {
            question.question = text.clone();
        }
        if let Some(text) = &self.answer {
            question.answer = text.clone();
        }
        if let Some(last) = self.last_reviewed {
            question.last_reviewed = last;
        }
        if let Some(next) = self.next_review {
            question.next_review = next;
        }
        if let Some(interval) = self.interval_days {
            question.interval_days = interval;
        }
    }
}
