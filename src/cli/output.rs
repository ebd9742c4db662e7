//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use super::OutputFormat;
use crate::api::resources::{
    attendance_rate, Announcement, Attendance, AttendanceStatus, Faculty, Grade, Mark, Notice,
    Student, Subject,
};
use crate::guard::GuardState;
use crate::session::User;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

pub fn format_guard_state(state: GuardState) -> String {
    let label = state.to_string();
    match state {
        GuardState::Authorized => label.green().to_string(),
        GuardState::Unauthorized => label.red().to_string(),
        GuardState::Loading => label.yellow().to_string(),
    }
}

/// Serialize as JSON/YAML, or hand off to a table printer
pub fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    table: impl FnOnce(&T),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => table(value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// Print the signed-in user
pub fn print_user_detail(user: &User) {
    println!("{}", "Signed in".bold().underline());
    println!();
    println!("  {} {}", "Name:".bold(), user.name);
    println!("  {} {}", "Email:".bold(), user.email);
    println!("  {} {}", "Role:".bold(), user.role.to_string().cyan());
    println!("  {} {}", "ID:".bold(), user.id);
}

pub fn print_notices(notices: &[Notice]) {
    if notices.is_empty() {
        info("No notices yet");
        return;
    }

    let mut table = new_table(&["", "Title", "Category", "Posted"]);
    for notice in notices {
        let category = notice.category.as_deref().unwrap_or("GENERAL");
        let color = match category {
            "URGENT" => Color::Red,
            "ACADEMIC" => Color::Blue,
            "EVENTS" => Color::Green,
            _ => Color::Reset,
        };
        table.add_row(vec![
            Cell::new(if notice.is_pinned { "📌" } else { "" }),
            Cell::new(&notice.title),
            Cell::new(category).fg(color),
            Cell::new(
                notice
                    .created_at
                    .map(|dt| dt.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    println!("{table}");
}

pub fn print_announcements(announcements: &[Announcement]) {
    if announcements.is_empty() {
        info("No announcements");
        return;
    }

    let mut table = new_table(&["Title", "Type", "Date", "Content"]);
    for a in announcements {
        table.add_row(vec![
            Cell::new(&a.title),
            Cell::new(format!("{:?}", a.kind).to_lowercase()),
            Cell::new(or_dash(a.date.as_deref())),
            Cell::new(&a.content),
        ]);
    }
    println!("{table}");
}

pub fn print_students(students: &[Student]) {
    if students.is_empty() {
        info("No students found");
        return;
    }

    let mut table = new_table(&["ID", "Name", "Email", "Roll No", "Reg No", "Course", "Sem"]);
    for s in students {
        table.add_row(vec![
            Cell::new(&s.id),
            Cell::new(&s.name),
            Cell::new(&s.email),
            Cell::new(or_dash(s.roll_no.as_deref())),
            Cell::new(or_dash(s.reg_no.as_deref())),
            Cell::new(or_dash(s.course.as_deref())),
            Cell::new(s.semester.map(|n| n.to_string()).unwrap_or_else(|| "-".into())),
        ]);
    }
    println!("{table}");
}

pub fn print_faculty(faculty: &[Faculty]) {
    if faculty.is_empty() {
        info("No faculty found");
        return;
    }

    let mut table = new_table(&["ID", "Name", "Email", "Department", "Designation"]);
    for f in faculty {
        table.add_row(vec![
            Cell::new(&f.id),
            Cell::new(&f.name),
            Cell::new(&f.email),
            Cell::new(or_dash(f.department.as_deref())),
            Cell::new(or_dash(f.designation.as_deref())),
        ]);
    }
    println!("{table}");
}

pub fn print_subjects(subjects: &[Subject]) {
    if subjects.is_empty() {
        info("No subjects found");
        return;
    }

    let mut table = new_table(&["Code", "Name", "Faculty", "Credits", "Sem", "Course"]);
    for s in subjects {
        table.add_row(vec![
            Cell::new(&s.code),
            Cell::new(&s.name),
            Cell::new(or_dash(s.faculty.as_deref())),
            Cell::new(s.credits.map(|n| n.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(s.semester.map(|n| n.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(or_dash(s.course.as_deref())),
        ]);
    }
    println!("{table}");
}

pub fn print_marks(marks: &[Mark]) {
    if marks.is_empty() {
        info("No marks recorded");
        return;
    }

    let mut table = new_table(&["Subject", "Exam", "Marks", "%"]);
    for m in marks {
        let (pct, color) = match (m.percentage(), m.grade()) {
            (Some(pct), Some(grade)) => (format!("{:.1}", pct), grade_color(grade)),
            _ => ("-".to_string(), Color::Reset),
        };
        table.add_row(vec![
            Cell::new(m.subject.as_ref().map(|s| s.label()).unwrap_or_else(|| "-".into())),
            Cell::new(format!("{:?}", m.exam_type).to_lowercase()),
            Cell::new(format!("{}/{}", m.marks_obtained, m.max_marks)),
            Cell::new(pct).fg(color),
        ]);
    }
    println!("{table}");
}

fn grade_color(grade: Grade) -> Color {
    match grade {
        Grade::Excellent => Color::Green,
        Grade::Good => Color::Blue,
        Grade::Average => Color::Yellow,
        Grade::Poor => Color::Red,
    }
}

pub fn print_attendance(records: &[Attendance]) {
    if records.is_empty() {
        info("No attendance recorded");
        return;
    }

    let mut table = new_table(&["Date", "Subject", "Status"]);
    for r in records {
        let (label, color) = match r.status {
            AttendanceStatus::Present => ("present", Color::Green),
            AttendanceStatus::Absent => ("absent", Color::Red),
        };
        table.add_row(vec![
            Cell::new(&r.date),
            Cell::new(r.subject.as_ref().map(|s| s.label()).unwrap_or_else(|| "-".into())),
            Cell::new(label).fg(color),
        ]);
    }
    println!("{table}");

    if let Some(rate) = attendance_rate(records) {
        println!("  {} {:.1}%", "Attendance:".bold(), rate);
    }
}
