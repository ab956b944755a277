//! SQLite backend for the question store
//!
//! Handles schema creation, CRUD operations for questions and the
//! append-only review log. Dates are stored as `YYYY-MM-DD` text so
//! string comparison in SQL matches calendar order.

use super::store::{DueFilter, Store};
use crate::error::Result;
use crate::models::question::INITIAL_INTERVAL_DAYS;
use crate::models::{Backup, Question, QuestionUpdate, ReviewEvent};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const QUESTION_COLUMNS: &str = "id, question, answer, last_reviewed, next_review, interval_days";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened sqlite store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.execute_batch(sql)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Creates the questions and reviews tables. Safe to call on every startup.
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS questions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            question      TEXT NOT NULL,
            answer        TEXT NOT NULL,
            last_reviewed TEXT,
            next_review   TEXT NOT NULL,
            interval_days INTEGER NOT NULL DEFAULT 3
        );
        CREATE INDEX IF NOT EXISTS idx_questions_next_review
            ON questions(next_review);
        CREATE TABLE IF NOT EXISTS reviews (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id INTEGER NOT NULL,
            review_date TEXT NOT NULL,
            FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_reviews_question
            ON reviews(question_id, review_date);
        CREATE INDEX IF NOT EXISTS idx_reviews_date
            ON reviews(review_date);",
    )
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        last_reviewed: row.get(3)?,
        next_review: row.get(4)?,
        interval_days: row.get(5)?,
    })
}

/// WHERE fragment and its single optional parameter for a due filter.
fn filter_clause(filter: &DueFilter) -> (&'static str, Option<&NaiveDate>) {
    match filter {
        DueFilter::Any => ("", None),
        DueFilter::OnOrBefore(date) => (" WHERE next_review <= ?1", Some(date)),
        DueFilter::On(date) => (" WHERE next_review = ?1", Some(date)),
        DueFilter::After(date) => (" WHERE next_review > ?1", Some(date)),
    }
}

/// Builds `SET col = ?, ...` with parameters in the same order.
fn set_clause(fields: &QuestionUpdate) -> (String, Vec<&dyn ToSql>) {
    let mut columns = Vec::new();
    let mut values: Vec<&dyn ToSql> = Vec::new();

    if let Some(text) = &fields.question {
        columns.push("question = ?");
        values.push(text);
    }
    if let Some(text) = &fields.answer {
        columns.push("answer = ?");
        values.push(text);
    }
    if let Some(last) = &fields.last_reviewed {
        columns.push("last_reviewed = ?");
        values.push(last);
    }
    if let Some(next) = &fields.next_review {
        columns.push("next_review = ?");
        values.push(next);
    }
    if let Some(interval) = &fields.interval_days {
        columns.push("interval_days = ?");
        values.push(interval);
    }

    (columns.join(", "), values)
}

fn update_one(conn: &Connection, id: i64, fields: &QuestionUpdate) -> rusqlite::Result<bool> {
    if fields.is_empty() {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        return Ok(exists);
    }

    let (set, mut values) = set_clause(fields);
    values.push(&id);
    let sql = format!("UPDATE questions SET {} WHERE id = ?", set);
    let changed = conn.execute(&sql, values.as_slice())?;
    Ok(changed > 0)
}

impl Store for SqliteStore {
    fn insert_question(
        &mut self,
        question: &str,
        answer: &str,
        created: NaiveDate,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO questions (question, answer, last_reviewed, next_review, interval_days)
             VALUES (?1, ?2, NULL, ?3, ?4)",
            params![question, answer, created, INITIAL_INTERVAL_DAYS],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, "question added");
        Ok(id)
    }

    fn get_question(&self, id: i64) -> Result<Option<Question>> {
        let sql = format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS);
        let question = self
            .conn
            .query_row(&sql, params![id], question_from_row)
            .optional()?;
        Ok(question)
    }

    fn get_all_questions(&self) -> Result<Vec<Question>> {
        let sql = format!("SELECT {} FROM questions ORDER BY id", QUESTION_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let questions = stmt
            .query_map([], question_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(questions)
    }

    fn get_questions_where(&self, filter: DueFilter) -> Result<Vec<Question>> {
        let (clause, date) = filter_clause(&filter);
        let sql = format!(
            "SELECT {} FROM questions{} ORDER BY next_review ASC, id ASC",
            QUESTION_COLUMNS, clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match date {
            Some(date) => stmt.query_map(params![date], question_from_row)?,
            None => stmt.query_map([], question_from_row)?,
        };
        let questions = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(?filter, count = questions.len(), "queried questions");
        Ok(questions)
    }

    fn update_question(&mut self, id: i64, fields: &QuestionUpdate) -> Result<bool> {
        Ok(update_one(&self.conn, id, fields)?)
    }

    fn update_all_questions(&mut self, fields: &QuestionUpdate) -> Result<usize> {
        if fields.is_empty() {
            return self.count_questions(DueFilter::Any);
        }
        let (set, values) = set_clause(fields);
        let sql = format!("UPDATE questions SET {}", set);
        let changed = self.conn.execute(&sql, values.as_slice())?;
        Ok(changed)
    }

    fn delete_question(&mut self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM questions WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn delete_review_events_for(&mut self, question_id: i64) -> Result<usize> {
        let changed = self.conn.execute(
            "DELETE FROM reviews WHERE question_id = ?1",
            params![question_id],
        )?;
        Ok(changed)
    }

    fn delete_all_review_events(&mut self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM reviews", [])?)
    }

    fn insert_review_event(&mut self, question_id: i64, date: NaiveDate) -> Result<()> {
        self.conn.execute(
            "INSERT INTO reviews (question_id, review_date) VALUES (?1, ?2)",
            params![question_id, date],
        )?;
        Ok(())
    }

    fn apply_review(
        &mut self,
        id: i64,
        fields: &QuestionUpdate,
        date: NaiveDate,
    ) -> Result<bool> {
        let tx = self.conn.transaction()?;
        if !update_one(&tx, id, fields)? {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO reviews (question_id, review_date) VALUES (?1, ?2)",
            params![id, date],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn restore_backup(&mut self, backup: &Backup) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut new_ids = HashMap::with_capacity(backup.questions.len());
        {
            let mut insert_question = tx.prepare(
                "INSERT INTO questions (question, answer, last_reviewed, next_review, interval_days)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for q in &backup.questions {
                insert_question.execute(params![
                    q.question,
                    q.answer,
                    q.last_reviewed,
                    q.next_review,
                    q.interval_days
                ])?;
                new_ids.insert(q.id, tx.last_insert_rowid());
            }

            let mut insert_event =
                tx.prepare("INSERT INTO reviews (question_id, review_date) VALUES (?1, ?2)")?;
            for event in &backup.reviews {
                if let Some(id) = new_ids.get(&event.question_id) {
                    insert_event.execute(params![id, event.review_date])?;
                }
            }
        }
        tx.commit()?;
        info!(questions = new_ids.len(), "backup restored");
        Ok(new_ids.len())
    }

    fn get_review_events_for(&self, question_id: i64) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT review_date FROM reviews WHERE question_id = ?1 ORDER BY review_date ASC, id ASC",
        )?;
        let dates = stmt
            .query_map(params![question_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<NaiveDate>>>()?;
        Ok(dates)
    }

    fn get_review_events_on(&self, date: NaiveDate) -> Result<Vec<ReviewEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT question_id, review_date FROM reviews WHERE review_date = ?1 ORDER BY id ASC",
        )?;
        let events = stmt
            .query_map(params![date], |row| {
                Ok(ReviewEvent {
                    question_id: row.get(0)?,
                    review_date: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn get_all_review_events(&self) -> Result<Vec<ReviewEvent>> {
        let mut stmt = self
            .conn
            .prepare("SELECT question_id, review_date FROM reviews ORDER BY review_date ASC, id ASC")?;
        let events = stmt
            .query_map([], |row| {
                Ok(ReviewEvent {
                    question_id: row.get(0)?,
                    review_date: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn count_questions(&self, filter: DueFilter) -> Result<usize> {
        let (clause, date) = filter_clause(&filter);
        let sql = format!("SELECT COUNT(*) FROM questions{}", clause);
        let count: i64 = match date {
            Some(date) => self.conn.query_row(&sql, params![date], |row| row.get(0))?,
            None => self.conn.query_row(&sql, [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    fn count_distinct_reviewed_questions(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT question_id) FROM reviews",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
