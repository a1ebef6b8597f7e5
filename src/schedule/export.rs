//! Spreadsheet export of the currently filtered and sorted schedule.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, XlsxError};
use thiserror::Error;

use super::flatten::flatten;
use super::view::{FilterState, filter_and_sort};
use crate::model::attendance::{EmployeeDayRecord, ScheduleFeed};
use crate::utils::dates::format_date;

pub const COLUMNS: [&str; 8] = [
    "№",
    "ФИО",
    "Пришел",
    "Ушел",
    "Часы работы",
    "Статус",
    "Опоздание (мин)",
    "Исключение",
];

const COLUMN_WIDTHS: [f64; 8] = [5.0, 30.0, 12.0, 12.0, 12.0, 15.0, 15.0, 25.0];
const SHEET_NAME: &str = "Расписание";
const FILE_PREFIX: &str = "Расписание_сотрудников";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Нет данных для экспорта")]
    Empty,

    #[error("failed to build workbook: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportLine {
    pub number: usize,
    pub full_name: String,
    pub arrived: String,
    pub left: String,
    pub hours: String,
    pub status: String,
    pub late_minutes: i64,
    pub exception: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportRow {
    /// Section marker of a range export. Exists only in the file.
    Date(NaiveDate),
    Data(ExportLine),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportTable {
    pub rows: Vec<ExportRow>,
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

fn time_cell(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn export_line(number: usize, record: &EmployeeDayRecord) -> ExportLine {
    let status = if !record.status.is_empty() {
        record.status.clone()
    } else if record.is_late {
        "Опоздал".to_string()
    } else {
        "В норме".to_string()
    };

    ExportLine {
        number,
        full_name: record.full_name.clone(),
        arrived: time_cell(record.first_entry),
        left: time_cell(record.last_exit),
        hours: match record.work_hours {
            Some(h) if h > 0.0 => format!("{h:.1} ч"),
            _ => "-".to_string(),
        },
        status,
        late_minutes: if record.is_late { record.late_minutes } else { 0 },
        exception: record
            .exception
            .as_ref()
            .map(|e| e.reason.clone())
            .unwrap_or_else(|| "-".to_string()),
    }
}

/// One numbered row per record, in the given order.
pub fn day_table(records: &[EmployeeDayRecord]) -> ExportTable {
    ExportTable {
        rows: records
            .iter()
            .enumerate()
            .map(|(i, r)| ExportRow::Data(export_line(i + 1, r)))
            .collect(),
    }
}

/// Sections per calendar date, ascending. Inside a section rows keep the
/// given order; numbering runs through the whole file.
pub fn range_table(records: &[EmployeeDayRecord]) -> ExportTable {
    let mut by_date: BTreeMap<NaiveDate, Vec<&EmployeeDayRecord>> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_default().push(record);
    }

    let mut rows = Vec::with_capacity(records.len() + by_date.len() * 2);
    let mut number = 0;
    for (date, day_records) in by_date {
        rows.push(ExportRow::Date(date));
        for record in day_records {
            number += 1;
            rows.push(ExportRow::Data(export_line(number, record)));
        }
        rows.push(ExportRow::Blank);
    }
    ExportTable { rows }
}

pub fn file_name(feed: &ScheduleFeed) -> String {
    match feed {
        ScheduleFeed::Day(day) => format!("{FILE_PREFIX}_{}.xlsx", format_date(day.date)),
        ScheduleFeed::Range(range) => format!(
            "{FILE_PREFIX}_{}_{}.xlsx",
            format_date(range.start_date),
            format_date(range.end_date)
        ),
    }
}

pub fn render(table: &ExportTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);
    let date_format = Format::new().set_bold();

    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        worksheet.set_column_width(col as u16, COLUMN_WIDTHS[col])?;
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        match row {
            ExportRow::Date(date) => {
                worksheet.write_string_with_format(r, 0, format_date(*date), &date_format)?;
            }
            ExportRow::Data(line) => {
                worksheet.write_number(r, 0, line.number as f64)?;
                worksheet.write_string(r, 1, &line.full_name)?;
                worksheet.write_string(r, 2, &line.arrived)?;
                worksheet.write_string(r, 3, &line.left)?;
                worksheet.write_string(r, 4, &line.hours)?;
                worksheet.write_string(r, 5, &line.status)?;
                worksheet.write_number(r, 6, line.late_minutes as f64)?;
                worksheet.write_string(r, 7, &line.exception)?;
            }
            ExportRow::Blank => {}
        }
    }

    worksheet.set_freeze_panes(1, 0)?;

    workbook.save_to_buffer()
}

/// Exports exactly what the screen shows after filtering and sorting,
/// ignoring expand/collapse.
pub fn export_file(feed: &ScheduleFeed, filter: &FilterState) -> Result<ExportFile, ExportError> {
    let rows = filter_and_sort(&flatten(feed), filter);
    if rows.is_empty() {
        return Err(ExportError::Empty);
    }

    let table = match feed {
        ScheduleFeed::Day(_) => day_table(&rows),
        ScheduleFeed::Range(_) => range_table(&rows),
    };

    Ok(ExportFile {
        file_name: file_name(feed),
        bytes: render(&table)?,
    })
}
