//! Hosted table backend speaking the PostgREST dialect (as exposed by Supabase).
//!
//! Tables are addressed as `{url}/rest/v1/{table}`; filters travel in the query
//! string (`next_review=lte.2025-07-30`). There are no cross-request transactions,
//! so [`Store::apply_review`] compensates by restoring the previous schedule when
//! the event insert fails.

use super::store::{DueFilter, Store};
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::models::question::INITIAL_INTERVAL_DAYS;
use crate::models::{Backup, Question, QuestionUpdate, ReviewEvent};
use chrono::NaiveDate;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

const QUESTIONS: &str = "questions";
const REVIEWS: &str = "reviews";

/// Matches every row; PostgREST rejects unfiltered bulk writes.
const ALL_ROWS: (&str, &str) = ("id", "not.is.null");

#[derive(Deserialize)]
struct DateRow {
    review_date: NaiveDate,
}

#[derive(Deserialize)]
struct QuestionIdRow {
    question_id: i64,
}

pub struct RemoteStore {
    client: Client,
    base_url: String,
    key: String,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        info!(url = %config.url, "using remote store");
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str, query: &[(&str, String)]) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .query(query)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    fn send(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::StorageUnavailable(format!(
                "remote returned {}: {}",
                status, body
            )));
        }
        Ok(response)
    }

    fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let response = Self::send(self.request(Method::GET, table, query))?;
        Ok(response.json()?)
    }

    /// Runs a write that echoes affected ids back and returns how many rows it hit.
    fn write_counting(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<usize> {
        let mut builder = self
            .request(method, table, query)
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let body = Self::send(builder)?.bytes()?;
        count_rows(&body)
    }

    /// Writes `backup` row by row, recording each new question id as it goes.
    fn restore_into(&mut self, backup: &Backup, new_ids: &mut HashMap<i64, i64>) -> Result<()> {
        for q in &backup.questions {
            let id = self.insert_question(&q.question, &q.answer, q.next_review)?;
            new_ids.insert(q.id, id);
            self.update_question(id, &QuestionUpdate::schedule_of(q))?;
        }
        for event in &backup.reviews {
            if let Some(&id) = new_ids.get(&event.question_id) {
                self.insert_review_event(id, event.review_date)?;
            }
        }
        Ok(())
    }

    fn question_query(filter: &DueFilter) -> Vec<(&'static str, String)> {
        let mut query = vec![("select", "*".to_string())];
        if let Some(param) = filter_param(filter) {
            query.push(param);
        }
        query
    }
}

/// Number of rows in a `return=representation` body.
pub(crate) fn count_rows(body: &[u8]) -> Result<usize> {
    let rows: Vec<IgnoredAny> = serde_json::from_slice(body)
        .map_err(|e| Error::StorageUnavailable(format!("unexpected response body: {}", e)))?;
    Ok(rows.len())
}

/// PostgREST query parameter for a due filter.
pub(crate) fn filter_param(filter: &DueFilter) -> Option<(&'static str, String)> {
    match filter {
        DueFilter::Any => None,
        DueFilter::OnOrBefore(date) => Some(("next_review", format!("lte.{}", date))),
        DueFilter::On(date) => Some(("next_review", format!("eq.{}", date))),
        DueFilter::After(date) => Some(("next_review", format!("gt.{}", date))),
    }
}

/// JSON body for a PATCH; untouched fields are omitted, cleared ones become null.
pub(crate) fn update_body(fields: &QuestionUpdate) -> Value {
    let mut body = Map::new();
    if let Some(text) = &fields.question {
        body.insert("question".into(), json!(text));
    }
    if let Some(text) = &fields.answer {
        body.insert("answer".into(), json!(text));
    }
    if let Some(last) = fields.last_reviewed {
        body.insert("last_reviewed".into(), json!(last));
    }
    if let Some(next) = fields.next_review {
        body.insert("next_review".into(), json!(next));
    }
    if let Some(interval) = fields.interval_days {
        body.insert("interval_days".into(), json!(interval));
    }
    Value::Object(body)
}

/// Total from a `Content-Range` header such as `0-24/312` or `*/0`.
pub(crate) fn parse_content_range(header: &str) -> Option<usize> {
    let (_, total) = header.rsplit_once('/')?;
    total.trim().parse().ok()
}

fn eq(id: i64) -> String {
    format!("eq.{}", id)
}

impl Store for RemoteStore {
    fn insert_question(
        &mut self,
        question: &str,
        answer: &str,
        created: NaiveDate,
    ) -> Result<i64> {
        let body = json!({
            "question": question,
            "answer": answer,
            "last_reviewed": null,
            "next_review": created,
            "interval_days": INITIAL_INTERVAL_DAYS,
        });
        let builder = self
            .request(Method::POST, QUESTIONS, &[])
            .header("Prefer", "return=representation")
            .json(&body);
        let rows: Vec<Question> = Self::send(builder)?.json()?;
        let id = rows
            .first()
            .map(|q| q.id)
            .ok_or_else(|| Error::StorageUnavailable("insert returned no row".to_string()))?;
        info!(id, "question added");
        Ok(id)
    }

    fn get_question(&self, id: i64) -> Result<Option<Question>> {
        let rows: Vec<Question> =
            self.select(QUESTIONS, &[("select", "*".to_string()), ("id", eq(id))])?;
        Ok(rows.into_iter().next())
    }

    fn get_all_questions(&self) -> Result<Vec<Question>> {
        self.select(
            QUESTIONS,
            &[("select", "*".to_string()), ("order", "id.asc".to_string())],
        )
    }

    fn get_questions_where(&self, filter: DueFilter) -> Result<Vec<Question>> {
        let mut query = Self::question_query(&filter);
        query.push(("order", "next_review.asc,id.asc".to_string()));
        let questions: Vec<Question> = self.select(QUESTIONS, &query)?;
        debug!(?filter, count = questions.len(), "queried questions");
        Ok(questions)
    }

    fn update_question(&mut self, id: i64, fields: &QuestionUpdate) -> Result<bool> {
        if fields.is_empty() {
            return Ok(self.get_question(id)?.is_some());
        }
        let changed = self.write_counting(
            Method::PATCH,
            QUESTIONS,
            &[("id", eq(id)), ("select", "id".to_string())],
            Some(&update_body(fields)),
        )?;
        Ok(changed > 0)
    }

    fn update_all_questions(&mut self, fields: &QuestionUpdate) -> Result<usize> {
        if fields.is_empty() {
            return self.count_questions(DueFilter::Any);
        }
        self.write_counting(
            Method::PATCH,
            QUESTIONS,
            &[(ALL_ROWS.0, ALL_ROWS.1.to_string()), ("select", "id".to_string())],
            Some(&update_body(fields)),
        )
    }

    fn delete_question(&mut self, id: i64) -> Result<bool> {
        let changed = self.write_counting(
            Method::DELETE,
            QUESTIONS,
            &[("id", eq(id)), ("select", "id".to_string())],
            None,
        )?;
        Ok(changed > 0)
    }

    fn delete_review_events_for(&mut self, question_id: i64) -> Result<usize> {
        self.write_counting(
            Method::DELETE,
            REVIEWS,
            &[("question_id", eq(question_id)), ("select", "id".to_string())],
            None,
        )
    }

    fn delete_all_review_events(&mut self) -> Result<usize> {
        self.write_counting(
            Method::DELETE,
            REVIEWS,
            &[(ALL_ROWS.0, ALL_ROWS.1.to_string()), ("select", "id".to_string())],
            None,
        )
    }

    fn insert_review_event(&mut self, question_id: i64, date: NaiveDate) -> Result<()> {
        let body = json!({ "question_id": question_id, "review_date": date });
        let builder = self
            .request(Method::POST, REVIEWS, &[])
            .header("Prefer", "return=minimal")
            .json(&body);
        Self::send(builder)?;
        Ok(())
    }

    fn apply_review(
        &mut self,
        id: i64,
        fields: &QuestionUpdate,
        date: NaiveDate,
    ) -> Result<bool> {
        let Some(previous) = self.get_question(id)? else {
            return Ok(false);
        };
        if !self.update_question(id, fields)? {
            return Ok(false);
        }
        if let Err(e) = self.insert_review_event(id, date) {
            warn!(id, error = %e, "review event insert failed, restoring schedule");
            if let Err(restore) = self.update_question(id, &QuestionUpdate::schedule_of(&previous)) {
                warn!(id, error = %restore, "could not restore schedule");
            }
            return Err(e);
        }
        Ok(true)
    }

    fn restore_backup(&mut self, backup: &Backup) -> Result<usize> {
        let mut new_ids = HashMap::with_capacity(backup.questions.len());
        if let Err(e) = self.restore_into(backup, &mut new_ids) {
            warn!(inserted = new_ids.len(), error = %e, "restore failed, removing inserted questions");
            for &id in new_ids.values() {
                let removed = self
                    .delete_review_events_for(id)
                    .and_then(|_| self.delete_question(id));
                if let Err(cleanup) = removed {
                    warn!(id, error = %cleanup, "could not remove partially restored question");
                }
            }
            return Err(e);
        }
        info!(questions = new_ids.len(), "backup restored");
        Ok(new_ids.len())
    }

    fn get_review_events_for(&self, question_id: i64) -> Result<Vec<NaiveDate>> {
        let rows: Vec<DateRow> = self.select(
            REVIEWS,
            &[
                ("select", "review_date".to_string()),
                ("question_id", eq(question_id)),
                ("order", "review_date.asc,id.asc".to_string()),
            ],
        )?;
        Ok(rows.into_iter().map(|r| r.review_date).collect())
    }

    fn get_review_events_on(&self, date: NaiveDate) -> Result<Vec<ReviewEvent>> {
        self.select(
            REVIEWS,
            &[
                ("select", "question_id,review_date".to_string()),
                ("review_date", format!("eq.{}", date)),
                ("order", "id.asc".to_string()),
            ],
        )
    }

    fn get_all_review_events(&self) -> Result<Vec<ReviewEvent>> {
        self.select(
            REVIEWS,
            &[
                ("select", "question_id,review_date".to_string()),
                ("order", "review_date.asc,id.asc".to_string()),
            ],
        )
    }

    fn count_questions(&self, filter: DueFilter) -> Result<usize> {
        let mut query = vec![("select", "id".to_string())];
        if let Some(param) = filter_param(&filter) {
            query.push(param);
        }
        let response = Self::send(
            self.request(Method::HEAD, QUESTIONS, &query)
                .header("Prefer", "count=exact"),
        )?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| Error::StorageUnavailable("missing Content-Range in count".to_string()))
    }

    fn count_distinct_reviewed_questions(&self) -> Result<usize> {
        let rows: Vec<QuestionIdRow> =
            self.select(REVIEWS, &[("select", "question_id".to_string())])?;
        let distinct: HashSet<i64> = rows.into_iter().map(|r| r.question_id).collect();
        Ok(distinct.len())
    }
}
