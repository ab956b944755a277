//! Review activity reporting for the dashboard.
//!
//! The per-day series is dense: every date from the first recorded review up to
//! today is present, with zero for days without reviews. The heatmap keeps the
//! difference between "zero reviews" (`Some(0)`) and "no data" (`None`), which
//! covers days before the first review and days after today.

use crate::database::{DueFilter, Store};
use crate::error::Result;
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// Counts shown in the dashboard header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DashboardMetrics {
    pub total_questions: usize,
    /// Questions due today, overdue ones included.
    pub due_today: usize,
    pub reviewed_today: usize,
    /// Distinct questions reviewed at least once.
    pub total_reviewed: usize,
}

/// Calendar grid of review counts, one column per week and one row per weekday
/// (Sunday = 0).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heatmap {
    pub start: NaiveDate,
    pub cells: Vec<[Option<u32>; 7]>,
}

impl Heatmap {
    pub fn weeks(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, week: usize, weekday: usize) -> Option<u32> {
        self.cells.get(week).and_then(|column| column.get(weekday).copied().flatten())
    }

    /// Calendar date shown in a cell.
    pub fn date_at(&self, week: usize, weekday: usize) -> NaiveDate {
        let start_weekday = self.start.weekday().num_days_from_sunday() as usize;
        let offset = week * 7 + (weekday + 7 - start_weekday) % 7;
        self.start + Days::new(offset as u64)
    }

    pub fn max_count(&self) -> u32 {
        self.cells
            .iter()
            .flat_map(|column| column.iter().flatten())
            .copied()
            .max()
            .unwrap_or(0)
    }
}

/// Dense per-day counts from the earliest date in `dates` to `today` inclusive.
pub fn dense_series(dates: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> Vec<DayCount> {
    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for date in dates {
        *counts.entry(date).or_insert(0) += 1;
    }
    let Some(&earliest) = counts.keys().next() else {
        return Vec::new();
    };

    earliest
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| DayCount {
            date,
            count: counts.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// Lays `series` out on a `weeks`-column grid starting at `start`.
pub fn heatmap(series: &[DayCount], start: NaiveDate, weeks: usize) -> Heatmap {
    let counts: BTreeMap<NaiveDate, u32> = series.iter().map(|d| (d.date, d.count)).collect();
    let mut cells = vec![[None; 7]; weeks];

    for (offset, date) in start.iter_days().take(weeks * 7).enumerate() {
        let weekday = date.weekday().num_days_from_sunday() as usize;
        cells[offset / 7][weekday] = counts.get(&date).copied();
    }

    Heatmap { start, cells }
}

/// Read-only aggregation over a store.
pub struct Reporter<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> Reporter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn reviews_per_day(&self, today: NaiveDate) -> Result<Vec<DayCount>> {
        let events = self.store.get_all_review_events()?;
        Ok(dense_series(events.into_iter().map(|e| e.review_date), today))
    }

    pub fn heatmap_series(&self, start: NaiveDate, weeks: usize, today: NaiveDate) -> Result<Heatmap> {
        let series = self.reviews_per_day(today)?;
        Ok(heatmap(&series, start, weeks))
    }

    pub fn dashboard_metrics(&self, today: NaiveDate) -> Result<DashboardMetrics> {
        Ok(DashboardMetrics {
            total_questions: self.store.count_questions(DueFilter::Any)?,
            due_today: self.store.count_questions(DueFilter::OnOrBefore(today))?,
            reviewed_today: self.store.get_review_events_on(today)?.len(),
            total_reviewed: self.store.count_distinct_reviewed_questions()?,
        })
    }
}
