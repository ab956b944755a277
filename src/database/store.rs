//! Storage interface consumed by the review service.
//!
//! Both backends (local SQLite file, hosted REST tables) implement [`Store`];
//! scheduling rules live above this layer and never depend on the backend.

use crate::error::Result;
use crate::models::{Backup, Question, QuestionUpdate, ReviewEvent};
use chrono::NaiveDate;

/// Predicate on `next_review`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DueFilter {
    Any,
    OnOrBefore(NaiveDate),
    On(NaiveDate),
    After(NaiveDate),
}

impl DueFilter {
    pub fn matches(&self, next_review: NaiveDate) -> bool {
        match *self {
            DueFilter::Any => true,
            DueFilter::OnOrBefore(date) => next_review <= date,
            DueFilter::On(date) => next_review == date,
            DueFilter::After(date) => next_review > date,
        }
    }
}

pub trait Store {
    /// Inserts a question due on `created` with the initial interval; returns its id.
    fn insert_question(&mut self, question: &str, answer: &str, created: NaiveDate)
    -> Result<i64>;

    fn get_question(&self, id: i64) -> Result<Option<Question>>;

    fn get_all_questions(&self) -> Result<Vec<Question>>;

    /// Questions matching `filter`, ordered by `next_review` then id.
    fn get_questions_where(&self, filter: DueFilter) -> Result<Vec<Question>>;

    /// Returns false when no question has this id.
    fn update_question(&mut self, id: i64, fields: &QuestionUpdate) -> Result<bool>;

    /// Applies `fields` to every question; returns the number of rows touched.
    fn update_all_questions(&mut self, fields: &QuestionUpdate) -> Result<usize>;

    /// Returns false when no question has this id.
    fn delete_question(&mut self, id: i64) -> Result<bool>;

    fn delete_review_events_for(&mut self, question_id: i64) -> Result<usize>;

    fn delete_all_review_events(&mut self) -> Result<usize>;

    fn insert_review_event(&mut self, question_id: i64, date: NaiveDate) -> Result<()>;

    /// Writes the post-review fields and appends the matching event as one unit.
    /// Returns false, writing nothing, when the question does not exist.
    fn apply_review(&mut self, id: i64, fields: &QuestionUpdate, date: NaiveDate)
    -> Result<bool>;

    /// Inserts every question of `backup` under a fresh id, keeping its schedule,
    /// and attaches the events whose `question_id` names one of them. All or nothing:
    /// on error no question from `backup` is left behind. Returns the question count.
    fn restore_backup(&mut self, backup: &Backup) -> Result<usize>;

    /// Review dates of one question, oldest first.
    fn get_review_events_for(&self, question_id: i64) -> Result<Vec<NaiveDate>>;

    fn get_review_events_on(&self, date: NaiveDate) -> Result<Vec<ReviewEvent>>;

    /// Every event, oldest first.
    fn get_all_review_events(&self) -> Result<Vec<ReviewEvent>>;

    fn count_questions(&self, filter: DueFilter) -> Result<usize>;

    fn count_distinct_reviewed_questions(&self) -> Result<usize>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn insert_question(
        &mut self,
        question: &str,
        answer: &str,
        created: NaiveDate,
    ) -> Result<i64> {
        (**self).insert_question(question, answer, created)
    }

    fn get_question(&self, id: i64) -> Result<Option<Question>> {
        (**self).get_question(id)
    }

    fn get_all_questions(&self) -> Result<Vec<Question>> {
        (**self).get_all_questions()
    }

    fn get_questions_where(&self, filter: DueFilter) -> Result<Vec<Question>> {
        (**self).get_questions_where(filter)
    }

    fn update_question(&mut self, id: i64, fields: &QuestionUpdate) -> Result<bool> {
        (**self).update_question(id, fields)
    }

    fn update_all_questions(&mut self, fields: &QuestionUpdate) -> Result<usize> {
        (**self).update_all_questions(fields)
    }

    fn delete_question(&mut self, id: i64) -> Result<bool> {
        (**self).delete_question(id)
    }

    fn delete_review_events_for(&mut self, question_id: i64) -> Result<usize> {
        (**self).delete_review_events_for(question_id)
    }

    fn delete_all_review_events(&mut self) -> Result<usize> {
        (**self).delete_all_review_events()
    }

    fn insert_review_event(&mut self, question_id: i64, date: NaiveDate) -> Result<()> {
        (**self).insert_review_event(question_id, date)
    }

    fn apply_review(
        &mut self,
        id: i64,
        fields: &QuestionUpdate,
        date: NaiveDate,
    ) -> Result<bool> {
        (**self).apply_review(id, fields, date)
    }

    fn restore_backup(&mut self, backup: &Backup) -> Result<usize> {
        (**self).restore_backup(backup)
    }

    fn get_review_events_for(&self, question_id: i64) -> Result<Vec<NaiveDate>> {
        (**self).get_review_events_for(question_id)
    }

    fn get_review_events_on(&self, date: NaiveDate) -> Result<Vec<ReviewEvent>> {
        (**self).get_review_events_on(date)
    }

    fn get_all_review_events(&self) -> Result<Vec<ReviewEvent>> {
        (**self).get_all_review_events()
    }

    fn count_questions(&self, filter: DueFilter) -> Result<usize> {
        (**self).count_questions(filter)
    }

    fn count_distinct_reviewed_questions(&self) -> Result<usize> {
        (**self).count_distinct_reviewed_questions()
    }
}
