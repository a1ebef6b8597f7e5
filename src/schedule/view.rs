use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::flatten::flatten;
use crate::model::attendance::{EmployeeDayRecord, ScheduleFeed};

/// Three-state lateness ordering, cycled by repeated clicks on the status
/// column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusSort {
    #[default]
    None,
    LateFirst,
    NormalFirst,
}

impl StatusSort {
    pub fn next(self) -> Self {
        match self {
            StatusSort::None => StatusSort::LateFirst,
            StatusSort::LateFirst => StatusSort::NormalFirst,
            StatusSort::NormalFirst => StatusSort::None,
        }
    }

    fn rank(self, record: &EmployeeDayRecord) -> u8 {
        match (self, record.is_late) {
            (StatusSort::None, _) => 0,
            (StatusSort::LateFirst, true) | (StatusSort::NormalFirst, false) => 0,
            (StatusSort::LateFirst, false) | (StatusSort::NormalFirst, true) => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilterState {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    #[schema(value_type = Vec<u64>)]
    pub department_ids: BTreeSet<u64>,
    #[serde(default)]
    pub sort: StatusSort,
}

/// Case-insensitive substring match on the display name. The query is
/// trimmed first, so a whitespace-only query filters nothing.
pub fn matches_search(record: &EmployeeDayRecord, search: &str) -> bool {
    let needle = search.trim();
    if needle.is_empty() {
        return true;
    }
    record
        .full_name
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

/// Rows without a department id are kept even when a department filter is
/// active, so legacy records without department linkage stay visible.
pub fn matches_departments(record: &EmployeeDayRecord, selected: &BTreeSet<u64>) -> bool {
    if selected.is_empty() {
        return true;
    }
    match record.department_id {
        Some(id) => selected.contains(&id),
        None => true,
    }
}

/// Filters, then orders by name and date, then (stably) by lateness.
pub fn filter_and_sort(records: &[EmployeeDayRecord], filter: &FilterState) -> Vec<EmployeeDayRecord> {
    let mut rows: Vec<EmployeeDayRecord> = records
        .iter()
        .filter(|r| matches_search(r, &filter.search))
        .filter(|r| matches_departments(r, &filter.department_ids))
        .cloned()
        .collect();

    rows.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.date.cmp(&b.date)));
    if filter.sort != StatusSort::None {
        rows.sort_by_key(|r| filter.sort.rank(r));
    }
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub employee_id: u64,
    pub rows: Vec<EmployeeDayRecord>,
}

/// Collects each employee's rows behind that employee's first row. Groups
/// keep the order of their first rows.
pub fn group_rows(sorted: Vec<EmployeeDayRecord>) -> Vec<RowGroup> {
    let mut groups: Vec<RowGroup> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();
    for row in sorted {
        match index.get(&row.employee_id) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(row.employee_id, groups.len());
                groups.push(RowGroup {
                    employee_id: row.employee_id,
                    rows: vec![row],
                });
            }
        }
    }
    groups
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    expanded: HashSet<u64>,
}

impl ExpandState {
    /// Returns whether the employee is expanded after the toggle.
    pub fn toggle(&mut self, employee_id: u64) -> bool {
        if self.expanded.remove(&employee_id) {
            false
        } else {
            self.expanded.insert(employee_id);
            true
        }
    }

    pub fn is_expanded(&self, employee_id: u64) -> bool {
        self.expanded.contains(&employee_id)
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    pub fn ids(&self) -> BTreeSet<u64> {
        self.expanded.iter().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FlatDisplayRow {
    #[serde(flatten)]
    pub record: EmployeeDayRecord,
    pub is_first_in_group: bool,
    pub total_in_group: usize,
    pub group_index: usize,
}

/// Collapsed groups show their first row only; expanded groups show all.
pub fn visible_rows(groups: Vec<RowGroup>, expanded: &ExpandState) -> Vec<FlatDisplayRow> {
    let mut out = Vec::new();
    for (group_index, group) in groups.into_iter().enumerate() {
        let total_in_group = group.rows.len();
        let take = if expanded.is_expanded(group.employee_id) {
            total_in_group
        } else {
            1
        };
        out.extend(
            group
                .rows
                .into_iter()
                .take(take)
                .enumerate()
                .map(|(i, record)| FlatDisplayRow {
                    record,
                    is_first_in_group: i == 0,
                    total_in_group,
                    group_index,
                }),
        );
    }
    out
}

/// `(raw feed, filter state, expansion) -> rows to render`.
pub fn build_rows(feed: &ScheduleFeed, filter: &FilterState, expanded: &ExpandState) -> Vec<FlatDisplayRow> {
    let sorted = filter_and_sort(&flatten(feed), filter);
    match feed {
        ScheduleFeed::Range(_) => visible_rows(group_rows(sorted), expanded),
        ScheduleFeed::Day(_) => sorted
            .into_iter()
            .enumerate()
            .map(|(group_index, record)| FlatDisplayRow {
                record,
                is_first_in_group: true,
                total_in_group: 1,
                group_index,
            })
            .collect(),
    }
}
