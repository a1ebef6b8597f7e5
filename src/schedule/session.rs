use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;

use super::export::{ExportError, ExportFile, export_file};
use super::guard::{RequestGuard, RequestTicket};
use super::pagination::{PageError, PageInfo, Pagination};
use super::view::{ExpandState, FilterState, FlatDisplayRow, StatusSort, build_rows};
use crate::model::attendance::ScheduleFeed;

pub const MAX_RANGE_DAYS: i64 = 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("range of {days} days exceeds the 365-day limit")]
    SpanTooLong { days: i64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("no schedule has been loaded yet")]
    NotLoaded,

    #[error(transparent)]
    Page(#[from] PageError),
}

/// What a view is looking at: one day (latest available when `date` is
/// absent) or an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleQuery {
    Day {
        #[schema(value_type = Option<String>, format = "date")]
        date: Option<NaiveDate>,
    },
    Range {
        #[schema(value_type = String, format = "date")]
        start: NaiveDate,
        #[schema(value_type = String, format = "date")]
        end: NaiveDate,
    },
}

impl ScheduleQuery {
    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::StartAfterEnd { start, end });
        }
        let days = (end - start).num_days();
        if days > MAX_RANGE_DAYS {
            return Err(QueryError::SpanTooLong { days });
        }
        Ok(ScheduleQuery::Range { start, end })
    }

    /// The `days` calendar days ending with `today`.
    pub fn last_days(days: u32, today: NaiveDate) -> Result<Self, QueryError> {
        let back = i64::from(days.max(1)) - 1;
        Self::range(today - chrono::Duration::days(back), today)
    }
}

/// A fetch the caller must perform and then hand back to
/// [`ScheduleView::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: RequestTicket,
    pub query: ScheduleQuery,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ViewSnapshot {
    pub query: Option<ScheduleQuery>,
    pub rows: Vec<FlatDisplayRow>,
    pub total_count: u64,
    pub late_count: u64,
    pub page: PageInfo,
    pub filter: FilterState,
    pub expanded: Vec<u64>,
    pub loading: bool,
    pub error: Option<String>,
}

/// State of one schedule screen. Every input change that needs new data
/// returns a [`FetchRequest`]; everything else is recomputed from the held
/// dataset on [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct ScheduleView {
    query: Option<ScheduleQuery>,
    feed: Option<ScheduleFeed>,
    filter: FilterState,
    expanded: ExpandState,
    pagination: Pagination,
    guard: RequestGuard,
    loading: bool,
    error: Option<String>,
}

impl ScheduleView {
    pub fn new(per_page: u32) -> Self {
        Self {
            pagination: Pagination::new(per_page),
            ..Default::default()
        }
    }

    pub fn query(&self) -> Option<ScheduleQuery> {
        self.query
    }

    fn request(&mut self, query: ScheduleQuery) -> FetchRequest {
        self.loading = true;
        self.error = None;
        FetchRequest {
            ticket: self.guard.begin(),
            query,
            page: self.pagination.current_page(),
            per_page: self.pagination.items_per_page(),
        }
    }

    /// New date or range: back to the first page.
    pub fn load(&mut self, query: ScheduleQuery) -> FetchRequest {
        self.query = Some(query);
        self.pagination.reset();
        self.request(query)
    }

    /// New page size: back to the first page. Returns `None` when nothing
    /// has been loaded yet; the size then applies to the first load.
    pub fn set_per_page(&mut self, per_page: u32) -> Option<FetchRequest> {
        self.set_page_size(per_page);
        let query = self.query?;
        Some(self.request(query))
    }

    /// Changes the page size and returns to page 1 without fetching. The
    /// next load picks it up.
    pub fn set_page_size(&mut self, per_page: u32) {
        self.pagination.set_items_per_page(per_page);
    }

    pub fn go_to_page(&mut self, page: u32) -> Result<FetchRequest, ViewError> {
        let query = self.query.ok_or(ViewError::NotLoaded)?;
        self.pagination.go_to(page)?;
        Ok(self.request(query))
    }

    pub fn retry(&mut self) -> Result<FetchRequest, ViewError> {
        let query = self.query.ok_or(ViewError::NotLoaded)?;
        Ok(self.request(query))
    }

    /// Applies a fetch result unless a newer fetch has started since.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: Result<ScheduleFeed, String>,
    ) -> Completion {
        if !self.guard.is_current(ticket) {
            debug!(ticket = ticket.id(), "Dropping superseded schedule response");
            return Completion::Stale;
        }

        self.loading = false;
        match result {
            Ok(feed) => {
                if let (Some(ScheduleQuery::Day { date: None }), ScheduleFeed::Day(day)) =
                    (self.query, &feed)
                {
                    self.query = Some(ScheduleQuery::Day {
                        date: Some(day.date),
                    });
                }
                self.pagination.set_total_count(feed.total_count());
                self.expanded.clear();
                self.feed = Some(feed);
                self.error = None;
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
        Completion::Applied
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter.search = search.into();
    }

    pub fn set_departments(&mut self, department_ids: BTreeSet<u64>) {
        self.filter.department_ids = department_ids;
    }

    pub fn cycle_sort(&mut self) -> StatusSort {
        self.filter.sort = self.filter.sort.next();
        self.filter.sort
    }

    pub fn toggle_expanded(&mut self, employee_id: u64) -> bool {
        self.expanded.toggle(employee_id)
    }

    pub fn rows(&self) -> Vec<FlatDisplayRow> {
        self.feed
            .as_ref()
            .map(|feed| build_rows(feed, &self.filter, &self.expanded))
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            query: self.query,
            rows: self.rows(),
            total_count: self.feed.as_ref().map_or(0, ScheduleFeed::total_count),
            late_count: self.feed.as_ref().map_or(0, ScheduleFeed::late_count),
            page: self.pagination.info(),
            filter: self.filter.clone(),
            expanded: self.expanded.ids().into_iter().collect(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }

    pub fn export(&self) -> Result<ExportFile, ExportError> {
        let feed = self.feed.as_ref().ok_or(ExportError::Empty)?;
        export_file(feed, &self.filter)
    }
}
