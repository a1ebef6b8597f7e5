use crate::model::attendance::{EmployeeDayRecord, EmployeeRangeGroup, RangeDay, ScheduleFeed};

/// One record per (employee, day). Single-date feeds pass through as-is.
pub fn flatten(feed: &ScheduleFeed) -> Vec<EmployeeDayRecord> {
    match feed {
        ScheduleFeed::Day(day) => day.employees.clone(),
        ScheduleFeed::Range(range) => flatten_range(&range.employees),
    }
}

pub fn flatten_range(groups: &[EmployeeRangeGroup]) -> Vec<EmployeeDayRecord> {
    let total: usize = groups.iter().map(|g| g.days.len()).sum();
    let mut rows = Vec::with_capacity(total);
    for group in groups {
        rows.extend(group.days.iter().map(|day| day_record(group, day)));
    }
    rows
}

fn day_record(group: &EmployeeRangeGroup, day: &RangeDay) -> EmployeeDayRecord {
    EmployeeDayRecord {
        employee_id: group.employee_id,
        full_name: group.full_name.clone(),
        full_name_expanded: group.full_name_expanded.clone(),
        department_id: group.department_id,
        department_name: group.department_name.clone(),
        date: day.date,
        first_entry: day.first_entry,
        last_exit: day.last_exit,
        first_entry_door: day.first_entry_door.clone(),
        last_exit_door: day.last_exit_door.clone(),
        is_late: day.is_late,
        late_minutes: day.late_minutes,
        work_hours: day.work_hours,
        status: day.status.clone(),
        exception: day.exception.clone(),
    }
}
