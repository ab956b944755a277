//! Review workflow on top of a [`Store`]: due-date bucketing, review history,
//! and every write that must keep questions and the review log consistent.

use crate::database::{DueFilter, Store};
use crate::error::{Error, Result};
use crate::models::question::INITIAL_INTERVAL_DAYS;
use crate::models::scheduler::{Outcome, clamp_interval, compute_next_state};
use crate::models::{Backup, Question, QuestionUpdate};
use chrono::{Days, NaiveDate};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Questions split by when they are next due, each bucket ordered by due date.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DueGroups {
    /// Due today or overdue.
    pub due_today: Vec<Question>,
    pub due_tomorrow: Vec<Question>,
    pub future: Vec<Question>,
}

impl DueGroups {
    pub fn len(&self) -> usize {
        self.due_today.len() + self.due_tomorrow.len() + self.future.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ReviewService<S> {
    store: S,
}

impl<S: Store> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds a question due on `today` with the initial interval.
    pub fn add_question(&mut self, question: &str, answer: &str, today: NaiveDate) -> Result<i64> {
        let (question, answer) = validate(question, answer)?;
        self.store.insert_question(question, answer, today)
    }

    /// Adds `samples` when the store holds no questions; returns how many were added.
    /// A failed read is returned as an error and nothing is added.
    pub fn seed_if_empty(&mut self, samples: &[(&str, &str)], today: NaiveDate) -> Result<usize> {
        if self.store.count_questions(DueFilter::Any)? > 0 {
            return Ok(0);
        }
        for (question, answer) in samples {
            self.add_question(question, answer, today)?;
        }
        info!(count = samples.len(), "sample questions created");
        Ok(samples.len())
    }

    pub fn all_questions(&self) -> Result<Vec<Question>> {
        self.store.get_all_questions()
    }

    pub fn question(&self, id: i64) -> Result<Question> {
        self.store.get_question(id)?.ok_or(Error::NotFound(id))
    }

    /// Records a review on `today`: reschedules the question and appends one event.
    pub fn review(&mut self, id: i64, outcome: Outcome, today: NaiveDate) -> Result<Question> {
        let mut question = self.question(id)?;
        let next = compute_next_state(question.interval_days, outcome, today);
        let fields = QuestionUpdate::reviewed(today, next.next_review, next.interval_days);

        if !self.store.apply_review(id, &fields, today)? {
            warn!(id, "question vanished before review was recorded");
            return Err(Error::NotFound(id));
        }
        info!(
            id,
            ?outcome,
            interval = next.interval_days,
            next_review = %next.next_review,
            "review recorded"
        );
        fields.apply_to(&mut question);
        Ok(question)
    }

    /// Puts a question back into today's list at the start of the schedule.
    pub fn reschedule_today(&mut self, id: i64, today: NaiveDate) -> Result<()> {
        let fields = QuestionUpdate {
            next_review: Some(today),
            interval_days: Some(INITIAL_INTERVAL_DAYS),
            ..Default::default()
        };
        self.update_existing(id, &fields)?;
        info!(id, "question rescheduled for today");
        Ok(())
    }

    pub fn edit_question(&mut self, id: i64, question: &str, answer: &str) -> Result<()> {
        let (question, answer) = validate(question, answer)?;
        let fields = QuestionUpdate {
            question: Some(question.to_string()),
            answer: Some(answer.to_string()),
            ..Default::default()
        };
        self.update_existing(id, &fields)?;
        info!(id, "question edited");
        Ok(())
    }

    /// Deletes a question together with its review history.
    pub fn delete_question(&mut self, id: i64) -> Result<()> {
        let purged = self.store.delete_review_events_for(id)?;
        if !self.store.delete_question(id)? {
            return Err(Error::NotFound(id));
        }
        info!(id, purged, "question deleted");
        Ok(())
    }

    /// Resets every question to be due today with the initial interval.
    pub fn reset_all(&mut self, today: NaiveDate, clear_history: bool) -> Result<usize> {
        let reset = self
            .store
            .update_all_questions(&QuestionUpdate::reset(today))?;
        let cleared = if clear_history {
            self.store.delete_all_review_events()?
        } else {
            0
        };
        info!(reset, cleared, "all questions reset");
        Ok(reset)
    }

    pub fn group_by_due_date(&self, today: NaiveDate) -> Result<DueGroups> {
        let due_today = DueFilter::OnOrBefore(today);
        let due_tomorrow = DueFilter::On(today + Days::new(1));

        // one ordered read; buckets keep the store's order
        let mut groups = DueGroups::default();
        for question in self.store.get_questions_where(DueFilter::Any)? {
            if due_today.matches(question.next_review) {
                groups.due_today.push(question);
            } else if due_tomorrow.matches(question.next_review) {
                groups.due_tomorrow.push(question);
            } else {
                groups.future.push(question);
            }
        }
        debug!(
            due_today = groups.due_today.len(),
            due_tomorrow = groups.due_tomorrow.len(),
            future = groups.future.len(),
            "grouped questions by due date"
        );
        Ok(groups)
    }

    /// Dates a question was reviewed on, oldest first.
    pub fn review_history(&self, question_id: i64) -> Result<Vec<NaiveDate>> {
        self.store.get_review_events_for(question_id)
    }

    /// Texts of the questions reviewed on `date`, one entry per review.
    pub fn questions_reviewed_on(&self, date: NaiveDate) -> Result<Vec<String>> {
        let events = self.store.get_review_events_on(date)?;
        let mut texts = HashMap::new();
        let mut reviewed = Vec::with_capacity(events.len());
        for event in events {
            if !texts.contains_key(&event.question_id) {
                let text = self.store.get_question(event.question_id)?.map(|q| q.question);
                texts.insert(event.question_id, text);
            }
            if let Some(Some(text)) = texts.get(&event.question_id) {
                reviewed.push(text.clone());
            }
        }
        Ok(reviewed)
    }

    pub fn export_backup(&self) -> Result<Backup> {
        Ok(Backup {
            questions: self.store.get_all_questions()?,
            reviews: self.store.get_all_review_events()?,
        })
    }

    /// Adds every question of `backup` with its schedule and history; returns how many.
    /// Ids are reassigned by the store. The whole backup is checked before anything is
    /// written, so a rejected import leaves the store untouched.
    pub fn import_backup(&mut self, backup: &Backup) -> Result<usize> {
        let prepared = prepare_import(backup)?;
        let dropped = backup.reviews.len() - prepared.reviews.len();
        if dropped > 0 {
            warn!(dropped, "skipped review events without a matching question");
        }
        let imported = self.store.restore_backup(&prepared)?;
        info!(questions = imported, reviews = prepared.reviews.len(), "backup imported");
        Ok(imported)
    }

    fn update_existing(&mut self, id: i64, fields: &QuestionUpdate) -> Result<()> {
        if self.store.update_question(id, fields)? {
            Ok(())
        } else {
            warn!(id, "update of missing question");
            Err(Error::NotFound(id))
        }
    }
}

/// Copy of `backup` ready for storage: trimmed text, intervals brought into range,
/// events without a matching question removed.
fn prepare_import(backup: &Backup) -> Result<Backup> {
    let questions = backup
        .questions
        .iter()
        .map(|q| {
            let (question, answer) = validate(&q.question, &q.answer)?;
            Ok(Question {
                question: question.to_string(),
                answer: answer.to_string(),
                interval_days: clamp_interval(q.interval_days),
                ..q.clone()
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let known: HashSet<i64> = questions.iter().map(|q| q.id).collect();
    let reviews = backup
        .reviews
        .iter()
        .filter(|event| known.contains(&event.question_id))
        .cloned()
        .collect();

    Ok(Backup { questions, reviews })
}

/// Rejects blank question or answer text before it reaches storage.
fn validate<'a>(question: &'a str, answer: &'a str) -> Result<(&'a str, &'a str)> {
    let question = question.trim();
    let answer = answer.trim();
    if question.is_empty() {
        return Err(Error::Validation("question must not be empty".to_string()));
    }
    if answer.is_empty() {
        return Err(Error::Validation("answer must not be empty".to_string()));
    }
    Ok((question, answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteStore;
    use crate::models::ReviewEvent;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 30).unwrap() + Days::new(n)
    }

    fn service() -> ReviewService<SqliteStore> {
        ReviewService::new(SqliteStore::open_in_memory().unwrap())
    }

    fn ids(questions: &[Question]) -> Vec<i64> {
        questions.iter().map(|q| q.id).collect()
    }

    #[test]
    fn test_add_question_defaults() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();

        let q = svc.question(id).unwrap();
        assert_eq!(q.next_review, day(0));
        assert_eq!(q.interval_days, 3);
        assert_eq!(q.last_reviewed, None);
    }

    #[test]
    fn test_seed_only_empty_store() {
        let mut svc = service();
        let samples = [("[RUST] Q1", "A1"), ("Q2", "A2")];
        assert_eq!(svc.seed_if_empty(&samples, day(0)).unwrap(), 2);
        assert_eq!(svc.seed_if_empty(&samples, day(0)).unwrap(), 0);
        assert_eq!(svc.all_questions().unwrap().len(), 2);
    }

    #[test]
    fn test_seed_skipped_when_read_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.execute_batch("DROP TABLE reviews; DROP TABLE questions").unwrap();
        let mut svc = ReviewService::new(store);

        let result = svc.seed_if_empty(&[("Q1", "A1")], day(0));
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn test_add_rejects_blank_text() {
        let mut svc = service();
        assert!(matches!(
            svc.add_question("  ", "A1", day(0)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            svc.add_question("Q1", "", day(0)),
            Err(Error::Validation(_))
        ));
        assert!(svc.all_questions().unwrap().is_empty());
    }

    #[test]
    fn test_unreviewed_question_stays_due_today() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();

        let groups = svc.group_by_due_date(day(0)).unwrap();
        assert_eq!(ids(&groups.due_today), vec![id]);

        let groups = svc.group_by_due_date(day(1)).unwrap();
        assert_eq!(ids(&groups.due_today), vec![id]);
        assert!(groups.due_tomorrow.is_empty());
    }

    #[test]
    fn test_review_reschedules_and_logs() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();

        let q = svc.review(id, Outcome::Remembered, day(0)).unwrap();
        assert_eq!(q.interval_days, 6);
        assert_eq!(q.next_review, day(6));
        assert_eq!(q.last_reviewed, Some(day(0)));
        assert_eq!(svc.question(id).unwrap(), q);
        assert_eq!(svc.review_history(id).unwrap(), vec![day(0)]);
    }

    #[test]
    fn test_forgotten_review_still_logged() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();
        svc.review(id, Outcome::Remembered, day(0)).unwrap();
        svc.review(id, Outcome::Remembered, day(6)).unwrap();

        let q = svc.review(id, Outcome::Forgotten, day(18)).unwrap();
        assert_eq!(q.interval_days, 3);
        assert_eq!(q.next_review, day(21));
        assert_eq!(
            svc.review_history(id).unwrap(),
            vec![day(0), day(6), day(18)]
        );
    }

    #[test]
    fn test_review_missing_question() {
        let mut svc = service();
        assert!(matches!(
            svc.review(99, Outcome::Remembered, day(0)),
            Err(Error::NotFound(99))
        ));
        assert!(svc.store().get_all_review_events().unwrap().is_empty());
    }

    #[test]
    fn test_group_partition() {
        let mut svc = service();
        let overdue = svc.add_question("overdue", "a", day(0)).unwrap();
        let today = svc.add_question("today", "a", day(2)).unwrap();
        let tomorrow = svc.add_question("tomorrow", "a", day(3)).unwrap();
        let later = svc.add_question("later", "a", day(9)).unwrap();

        let groups = svc.group_by_due_date(day(2)).unwrap();
        assert_eq!(ids(&groups.due_today), vec![overdue, today]);
        assert_eq!(ids(&groups.due_tomorrow), vec![tomorrow]);
        assert_eq!(ids(&groups.future), vec![later]);
        assert_eq!(groups.len(), svc.all_questions().unwrap().len());

        let again = svc.group_by_due_date(day(2)).unwrap();
        assert_eq!(groups, again);
    }

    #[test]
    fn test_reschedule_today_resets_interval() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();
        svc.review(id, Outcome::Remembered, day(0)).unwrap();

        svc.reschedule_today(id, day(2)).unwrap();
        let q = svc.question(id).unwrap();
        assert_eq!(q.next_review, day(2));
        assert_eq!(q.interval_days, 3);
        assert_eq!(ids(&svc.group_by_due_date(day(2)).unwrap().due_today), vec![id]);

        assert!(matches!(
            svc.reschedule_today(42, day(2)),
            Err(Error::NotFound(42))
        ));
    }

    #[test]
    fn test_edit_question() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();

        svc.edit_question(id, "Q2", "A2").unwrap();
        let q = svc.question(id).unwrap();
        assert_eq!((q.question.as_str(), q.answer.as_str()), ("Q2", "A2"));

        assert!(matches!(
            svc.edit_question(id, "", "A3"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            svc.edit_question(77, "Q", "A"),
            Err(Error::NotFound(77))
        ));
    }

    #[test]
    fn test_delete_purges_history() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();
        let other = svc.add_question("Q2", "A2", day(0)).unwrap();
        svc.review(id, Outcome::Remembered, day(0)).unwrap();
        svc.review(other, Outcome::Remembered, day(0)).unwrap();

        svc.delete_question(id).unwrap();
        assert!(svc.review_history(id).unwrap().is_empty());
        assert_eq!(svc.review_history(other).unwrap(), vec![day(0)]);
        assert!(matches!(svc.delete_question(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_reset_all() {
        let mut svc = service();
        let a = svc.add_question("a", "a", day(0)).unwrap();
        let b = svc.add_question("b", "b", day(0)).unwrap();
        svc.review(a, Outcome::Remembered, day(0)).unwrap();
        svc.review(b, Outcome::Remembered, day(0)).unwrap();

        assert_eq!(svc.reset_all(day(4), false).unwrap(), 2);
        for q in svc.all_questions().unwrap() {
            assert_eq!(q.next_review, day(4));
            assert_eq!(q.interval_days, 3);
            assert_eq!(q.last_reviewed, None);
        }
        assert_eq!(svc.store().get_all_review_events().unwrap().len(), 2);

        svc.reset_all(day(4), true).unwrap();
        assert!(svc.store().get_all_review_events().unwrap().is_empty());
    }

    #[test]
    fn test_questions_reviewed_on() {
        let mut svc = service();
        let a = svc.add_question("first", "a", day(0)).unwrap();
        let b = svc.add_question("second", "b", day(0)).unwrap();
        svc.review(a, Outcome::Remembered, day(0)).unwrap();
        svc.review(b, Outcome::Remembered, day(1)).unwrap();

        assert_eq!(svc.questions_reviewed_on(day(0)).unwrap(), vec!["first"]);
        assert_eq!(svc.questions_reviewed_on(day(1)).unwrap(), vec!["second"]);
        assert!(svc.questions_reviewed_on(day(2)).unwrap().is_empty());
    }

    #[test]
    fn test_backup_roundtrip_into_fresh_store() {
        let mut svc = service();
        let id = svc.add_question("Q1", "A1", day(0)).unwrap();
        svc.review(id, Outcome::Remembered, day(0)).unwrap();
        svc.add_question("Q2", "A2", day(1)).unwrap();
        let backup = svc.export_backup().unwrap();

        let mut restored = service();
        assert_eq!(restored.import_backup(&backup).unwrap(), 2);

        let questions = restored.all_questions().unwrap();
        let q1 = questions.iter().find(|q| q.question == "Q1").unwrap();
        assert_eq!(q1.interval_days, 6);
        assert_eq!(q1.next_review, day(6));
        assert_eq!(q1.last_reviewed, Some(day(0)));
        assert_eq!(restored.review_history(q1.id).unwrap(), vec![day(0)]);
    }

    #[test]
    fn test_import_drops_orphan_events() {
        let mut svc = service();
        let backup = Backup {
            questions: vec![],
            reviews: vec![ReviewEvent {
                question_id: 3,
                review_date: day(0),
            }],
        };
        assert_eq!(svc.import_backup(&backup).unwrap(), 0);
        assert!(svc.store().get_all_review_events().unwrap().is_empty());
    }

    fn backup_question(id: i64, question: &str, interval_days: u32) -> Question {
        Question {
            id,
            question: question.to_string(),
            answer: "answer".to_string(),
            last_reviewed: None,
            next_review: day(0),
            interval_days,
        }
    }

    #[test]
    fn test_import_brings_intervals_into_range() {
        let mut svc = service();
        let backup = Backup {
            questions: vec![
                backup_question(1, "too long", 500),
                backup_question(2, "zero", 0),
                backup_question(3, "fine", 12),
            ],
            reviews: vec![],
        };
        assert_eq!(svc.import_backup(&backup).unwrap(), 3);

        let intervals: Vec<u32> = svc
            .all_questions()
            .unwrap()
            .iter()
            .map(|q| q.interval_days)
            .collect();
        assert_eq!(intervals, vec![60, 3, 12]);
    }

    #[test]
    fn test_rejected_import_writes_nothing() {
        let mut svc = service();
        let backup = Backup {
            questions: vec![backup_question(1, "good", 3), backup_question(2, "  ", 3)],
            reviews: vec![ReviewEvent {
                question_id: 1,
                review_date: day(0),
            }],
        };
        assert!(matches!(
            svc.import_backup(&backup),
            Err(Error::Validation(_))
        ));
        assert!(svc.all_questions().unwrap().is_empty());
        assert!(svc.store().get_all_review_events().unwrap().is_empty());

        // the corrected file imports once, without duplicates
        let fixed = Backup {
            questions: vec![backup_question(1, "good", 3), backup_question(2, "also good", 3)],
            ..backup
        };
        assert_eq!(svc.import_backup(&fixed).unwrap(), 2);
        assert_eq!(svc.all_questions().unwrap().len(), 2);
    }
}
