//! Domain resources consumed by the dashboard views
//!
//! Thin typed calls over plain REST CRUD endpoints. Authorization is the
//! server's business; the client only attaches the session token.

use crate::api::ApiClient;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A related record that may arrive populated (`{_id, name}`) or as a bare id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Populated {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
    Id(String),
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Reference::Populated { id, .. } | Reference::Id(id) => id,
        }
    }

    /// Human label: name (with code when present), else the id
    pub fn label(&self) -> String {
        match self {
            Reference::Populated {
                name: Some(name),
                code: Some(code),
                ..
            } => format!("{} ({})", name, code),
            Reference::Populated {
                name: Some(name), ..
            } => name.clone(),
            Reference::Populated { id, .. } | Reference::Id(id) => id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    Notice,
    Exam,
    Assignment,
    #[serde(other)]
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_kind() -> AnnouncementKind {
    AnnouncementKind::General
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementDraft {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roll_no: Option<String>,
    #[serde(default)]
    pub reg_no: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub semester: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Create/update payload; `password` is only sent when set
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reg_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FacultyForm {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub credits: Option<u32>,
    #[serde(default)]
    pub semester: Option<u32>,
    #[serde(default)]
    pub course: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectForm {
    pub name: String,
    pub code: String,
    pub faculty: String,
    pub credits: u32,
    pub semester: u32,
    pub course: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Internal1,
    Internal2,
    Assignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Excellent,
    Good,
    Average,
    Poor,
}

impl Grade {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 90.0 {
            Grade::Excellent
        } else if pct >= 75.0 {
            Grade::Good
        } else if pct >= 60.0 {
            Grade::Average
        } else {
            Grade::Poor
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    #[serde(alias = "_id")]
    pub id: String,
    pub student: Reference,
    #[serde(default)]
    pub subject: Option<Reference>,
    pub exam_type: ExamType,
    pub marks_obtained: f64,
    pub max_marks: f64,
}

impl Mark {
    /// `None` when the maximum is not positive
    pub fn percentage(&self) -> Option<f64> {
        (self.max_marks > 0.0).then(|| self.marks_obtained / self.max_marks * 100.0)
    }

    pub fn grade(&self) -> Option<Grade> {
        self.percentage().map(Grade::from_percentage)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMark {
    pub student_id: String,
    pub subject_id: String,
    pub exam_type: ExamType,
    pub marks_obtained: f64,
    pub max_marks: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(alias = "_id")]
    pub id: String,
    pub student: Reference,
    #[serde(default)]
    pub subject: Option<Reference>,
    pub date: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendance {
    pub student_id: String,
    pub subject_id: String,
    pub date: String,
    pub status: AttendanceStatus,
}

/// Share of records marked present, as a percentage
pub fn attendance_rate(records: &[Attendance]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let present = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    Some(present as f64 / records.len() as f64 * 100.0)
}

/// Number of notices the dashboard shows
pub const DASHBOARD_NOTICE_COUNT: usize = 5;

pub struct Resources<'a> {
    api: &'a ApiClient,
}

impl<'a> Resources<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    // Notices

    pub async fn notices(&self) -> Result<Vec<Notice>> {
        self.api.get("/notices").await
    }

    pub async fn latest_notices(&self, count: usize) -> Result<Vec<Notice>> {
        let mut notices = self.notices().await?;
        notices.truncate(count);
        Ok(notices)
    }

    // Announcements

    pub async fn announcements(&self) -> Result<Vec<Announcement>> {
        self.api.get("/announcements").await
    }

    pub async fn create_announcement(&self, draft: &AnnouncementDraft) -> Result<Announcement> {
        self.api.post("/announcements", draft).await
    }

    pub async fn update_announcement(
        &self,
        id: &str,
        draft: &AnnouncementDraft,
    ) -> Result<Announcement> {
        self.api.put(&format!("/announcements/{}", id), draft).await
    }

    pub async fn delete_announcement(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/announcements/{}", id)).await
    }

    // Students

    pub async fn students(&self) -> Result<Vec<Student>> {
        self.api.get("/students").await
    }

    pub async fn my_student_profile(&self) -> Result<Student> {
        self.api.get("/students/me").await
    }

    pub async fn create_student(&self, form: &StudentForm) -> Result<Student> {
        self.api.post("/students", form).await
    }

    pub async fn update_student(&self, id: &str, form: &StudentForm) -> Result<Student> {
        self.api.put(&format!("/students/{}", id), form).await
    }

    pub async fn update_my_student_profile(&self, form: &StudentForm) -> Result<Student> {
        self.api.put("/students/me", form).await
    }

    pub async fn delete_student(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/students/{}", id)).await
    }

    // Faculty

    pub async fn faculty_list(&self) -> Result<Vec<Faculty>> {
        self.api.get("/faculty").await
    }

    pub async fn faculty(&self, id: &str) -> Result<Faculty> {
        self.api.get(&format!("/faculty/{}", id)).await
    }

    pub async fn my_faculty_profile(&self) -> Result<Faculty> {
        self.api.get("/faculty/me").await
    }

    pub async fn create_faculty(&self, form: &FacultyForm) -> Result<Faculty> {
        self.api.post("/faculty", form).await
    }

    pub async fn update_faculty(&self, id: &str, form: &FacultyForm) -> Result<Faculty> {
        self.api.put(&format!("/faculty/{}", id), form).await
    }

    pub async fn update_my_faculty_profile(&self, form: &FacultyForm) -> Result<Faculty> {
        self.api.put("/faculty/me", form).await
    }

    pub async fn delete_faculty(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/faculty/{}", id)).await
    }

    // Subjects

    pub async fn subjects(&self) -> Result<Vec<Subject>> {
        self.api.get("/subjects").await
    }

    pub async fn create_subject(&self, form: &SubjectForm) -> Result<Subject> {
        self.api.post("/subjects", form).await
    }

    pub async fn update_subject(&self, id: &str, form: &SubjectForm) -> Result<Subject> {
        self.api.put(&format!("/subjects/{}", id), form).await
    }

    pub async fn delete_subject(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("/subjects/{}", id)).await
    }

    // Marks and attendance

    pub async fn marks_for(&self, student_id: &str) -> Result<Vec<Mark>> {
        self.api.get(&format!("/marks/{}", student_id)).await
    }

    pub async fn record_mark(&self, mark: &NewMark) -> Result<Mark> {
        self.api.post("/marks", mark).await
    }

    pub async fn attendance_for(&self, student_id: &str) -> Result<Vec<Attendance>> {
        self.api.get(&format!("/attendance/{}", student_id)).await
    }

    pub async fn record_attendance(&self, record: &NewAttendance) -> Result<Attendance> {
        self.api.post("/attendance/upload", record).await
    }
}
