//! Spreadsheet exports of lecture reports and complaints.

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::models::{Complaint, LectureReport};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
}

struct Column<T> {
    header: &'static str,
    width: f64,
    value: fn(&T) -> Cell,
}

const REPORT_COLUMNS: &[Column<LectureReport>] = &[
    Column {
        header: "Faculty",
        width: 24.0,
        value: |r| Cell::Text(r.faculty_name.clone()),
    },
    Column {
        header: "Class",
        width: 16.0,
        value: |r| Cell::Text(r.class_name.clone()),
    },
    Column {
        header: "Week",
        width: 10.0,
        value: |r| Cell::Text(r.week_of_reporting.clone()),
    },
    Column {
        header: "Date",
        width: 12.0,
        value: |r| Cell::Text(r.date_of_lecture.format(DATE_FORMAT).to_string()),
    },
    Column {
        header: "Course",
        width: 28.0,
        value: |r| Cell::Text(r.course_name.clone()),
    },
    Column {
        header: "Course Code",
        width: 12.0,
        value: |r| Cell::Text(r.course_code.clone()),
    },
    Column {
        header: "Lecturer",
        width: 22.0,
        value: |r| Cell::Text(r.lecturer_name.clone()),
    },
    Column {
        header: "Students Present",
        width: 16.0,
        value: |r| Cell::Number(f64::from(r.students_present)),
    },
    Column {
        header: "Total Students",
        width: 14.0,
        value: |r| Cell::Number(f64::from(r.total_students)),
    },
    Column {
        header: "Venue",
        width: 16.0,
        value: |r| Cell::Text(r.venue.clone()),
    },
    Column {
        header: "Scheduled Time",
        width: 14.0,
        value: |r| Cell::Text(r.scheduled_time.clone()),
    },
    Column {
        header: "Topic",
        width: 32.0,
        value: |r| Cell::Text(r.topic_taught.clone()),
    },
    Column {
        header: "Learning Outcomes",
        width: 40.0,
        value: |r| Cell::Text(r.learning_outcomes.clone()),
    },
    Column {
        header: "Status",
        width: 24.0,
        value: |r| Cell::Text(r.status.clone()),
    },
    Column {
        header: "Created At",
        width: 20.0,
        value: |r| Cell::Text(r.created_at.format(TIMESTAMP_FORMAT).to_string()),
    },
];

const COMPLAINT_COLUMNS: &[Column<Complaint>] = &[
    Column {
        header: "Title",
        width: 28.0,
        value: |c| Cell::Text(c.title.clone()),
    },
    Column {
        header: "Description",
        width: 48.0,
        value: |c| Cell::Text(c.description.clone()),
    },
    Column {
        header: "Complainant Role",
        width: 16.0,
        value: |c| Cell::Text(c.complainant_role.clone()),
    },
    Column {
        header: "Against Role",
        width: 14.0,
        value: |c| Cell::Text(c.against_role.clone()),
    },
    Column {
        header: "Status",
        width: 12.0,
        value: |c| Cell::Text(c.status.clone()),
    },
    Column {
        header: "Priority",
        width: 10.0,
        value: |c| Cell::Text(c.priority.clone()),
    },
    Column {
        header: "Created At",
        width: 20.0,
        value: |c| Cell::Text(c.created_at.format(TIMESTAMP_FORMAT).to_string()),
    },
];

fn render<T>(sheet_name: &str, columns: &[Column<T>], rows: &[T]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, column.header, &header_format)?;
        worksheet.set_column_width(col, column.width)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let row_number = index as u32 + 1;
        for (col, column) in columns.iter().enumerate() {
            match (column.value)(row) {
                Cell::Text(text) => {
                    worksheet.write_string(row_number, col as u16, &text)?;
                }
                Cell::Number(number) => {
                    worksheet.write_number(row_number, col as u16, number)?;
                }
            }
        }
    }
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save_to_buffer()
}

pub fn reports_workbook(reports: &[LectureReport]) -> Result<Vec<u8>, XlsxError> {
    render("Lecture Reports", REPORT_COLUMNS, reports)
}

pub fn complaints_workbook(complaints: &[Complaint]) -> Result<Vec<u8>, XlsxError> {
    render("Complaints", COMPLAINT_COLUMNS, complaints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn sample_report() -> LectureReport {
        let now = Utc::now().naive_utc();
        LectureReport {
            id: Uuid::new_v4(),
            faculty_name: "FICT".into(),
            class_name: "BSCSM Y2".into(),
            week_of_reporting: "Week 6".into(),
            date_of_lecture: NaiveDate::from_ymd_opt(2024, 9, 12).unwrap(),
            course_name: "Data Structures".into(),
            course_code: "DS201".into(),
            lecturer_id: Uuid::new_v4(),
            lecturer_name: "Thabo Lecturer".into(),
            students_present: 38,
            total_students: 45,
            venue: "Hall 4".into(),
            scheduled_time: "08:30".into(),
            topic_taught: "Heaps".into(),
            learning_outcomes: "Implement a binary heap".into(),
            recommendations: None,
            status: "pending_student_approval".into(),
            feedback_prl: None,
            feedback_pl: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn workbook_is_a_zip_container() {
        let bytes = reports_workbook(&[sample_report()]).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let empty = complaints_workbook(&[]).unwrap();
        assert!(empty.starts_with(b"PK"));
    }

    #[test]
    fn report_columns_keep_attendance_numeric() {
        let report = sample_report();
        let headers: Vec<&str> = REPORT_COLUMNS.iter().map(|c| c.header).collect();
        let present = headers.iter().position(|h| *h == "Students Present").unwrap();
        assert_eq!((REPORT_COLUMNS[present].value)(&report), Cell::Number(38.0));
        assert_eq!(
            (REPORT_COLUMNS[3].value)(&report),
            Cell::Text("2024-09-12".into())
        );
        assert_eq!(headers.len(), 15);
        assert_eq!(COMPLAINT_COLUMNS.len(), 7);
    }
}
