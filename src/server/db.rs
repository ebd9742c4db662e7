//! In-memory records behind the development server

use crate::session::Role;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Plain CRUD collections served under `/<name>`
pub const COLLECTIONS: &[&str] = &["students", "faculty", "subjects", "announcements", "notices"];

/// bcrypt's minimum cost; this server only ever holds throwaway accounts
const DEV_HASH_COST: u32 = 4;

#[derive(Error, Debug, PartialEq)]
pub enum DbError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Unauthorized(String),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

impl Account {
    /// Wire form used by the auth endpoints and `/students/me`
    pub fn identity(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkBody {
    pub student_id: String,
    pub subject_id: String,
    pub exam_type: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceBody {
    pub student_id: String,
    pub subject_id: String,
    pub date: String,
    pub status: String,
}

#[derive(Debug, Default)]
pub struct Db {
    accounts: HashMap<String, Account>,
    collections: HashMap<&'static str, Vec<Value>>,
    marks: Vec<Value>,
    attendance: Vec<Value>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    pub fn register(&mut self, name: &str, email: &str, password: &str, role: Role) -> DbResult<Account> {
        let account = self.create_account(name, email, password, role)?;
        if let Some(collection) = profile_collection(role) {
            self.records_mut(collection).push(json!({
                "_id": account.id,
                "name": account.name,
                "email": account.email,
                "createdAt": chrono::Utc::now(),
            }));
        }
        Ok(account)
    }

    pub fn authenticate(&self, email: &str, password: &str) -> DbResult<Account> {
        let email = normalize_email(email);
        let invalid = || DbError::Unauthorized("Invalid email or password".to_string());

        let account = self
            .accounts
            .values()
            .find(|a| a.email == email)
            .ok_or_else(invalid)?;

        match bcrypt::verify(password, &account.password_hash) {
            Ok(true) => Ok(account.clone()),
            _ => Err(invalid()),
        }
    }

    pub fn list(&self, collection: &str) -> DbResult<Vec<Value>> {
        let collection = known_collection(collection)?;
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }

    pub fn get(&self, collection: &str, id: &str) -> DbResult<Value> {
        let collection = known_collection(collection)?;
        self.collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned()
            .ok_or_else(|| not_found(collection))
    }

    pub fn create(&mut self, collection: &str, body: Value) -> DbResult<Value> {
        let collection = known_collection(collection)?;
        let mut record = into_object(body)?;
        let password = take_string(&mut record, "password");
        record.remove("_id");

        let id = match (profile_role(collection), password) {
            (Some(role), Some(password)) => {
                let name = required_str(&record, "name")?;
                let email = required_str(&record, "email")?;
                self.create_account(&name, &email, &password, role)?.id
            }
            (Some(_), None) => {
                let email = normalize_email(&required_str(&record, "email")?);
                if self.email_taken(&email) {
                    return Err(DbError::Conflict("User already exists".to_string()));
                }
                uuid::Uuid::new_v4().to_string()
            }
            (None, _) => uuid::Uuid::new_v4().to_string(),
        };

        record.insert("_id".to_string(), Value::String(id));
        record.insert("createdAt".to_string(), json!(chrono::Utc::now()));
        let record = Value::Object(record);
        self.records_mut(collection).push(record.clone());
        Ok(record)
    }

    pub fn update(&mut self, collection: &str, id: &str, body: Value) -> DbResult<Value> {
        let collection = known_collection(collection)?;
        let mut changes = into_object(body)?;
        changes.remove("_id");
        changes.remove("createdAt");
        let password = take_string(&mut changes, "password");

        // Validate everything before touching either the record or the account
        let index = self
            .collections
            .get(collection)
            .and_then(|records| records.iter().position(|r| record_id(r) == Some(id)))
            .ok_or_else(|| not_found(collection))?;

        if let Some(email) = changes.get("email").and_then(Value::as_str) {
            let email = normalize_email(email);
            if email.is_empty() {
                return Err(DbError::Invalid("email is required".to_string()));
            }
            if self.email_taken_by_other(&email, id) {
                return Err(DbError::Conflict("User already exists".to_string()));
            }
            changes.insert("email".to_string(), Value::String(email));
        }
        let password_hash = password
            .filter(|p| !p.is_empty())
            .map(|p| hash(&p))
            .transpose()?;

        if let Some(account) = self.accounts.get_mut(id) {
            if let Some(name) = changes.get("name").and_then(Value::as_str) {
                account.name = name.to_string();
            }
            if let Some(email) = changes.get("email").and_then(Value::as_str) {
                account.email = email.to_string();
            }
            if let Some(password_hash) = password_hash {
                account.password_hash = password_hash;
            }
        }

        let record = &mut self.records_mut(collection)[index];
        if let Value::Object(existing) = record {
            existing.extend(changes);
        }
        Ok(record.clone())
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> DbResult<()> {
        let collection = known_collection(collection)?;
        let records = self.records_mut(collection);
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Err(not_found(collection));
        }

        if profile_role(collection).is_some() {
            self.accounts.remove(id);
        }
        Ok(())
    }

    pub fn record_mark(&mut self, body: MarkBody) -> DbResult<Value> {
        if !matches!(body.exam_type.as_str(), "internal1" | "internal2" | "assignment") {
            return Err(DbError::Invalid(format!("Unknown exam type: {}", body.exam_type)));
        }
        if body.max_marks <= 0.0 || body.marks_obtained < 0.0 || body.marks_obtained > body.max_marks {
            return Err(DbError::Invalid("Marks must be between 0 and the maximum".to_string()));
        }

        let mark = json!({
            "_id": uuid::Uuid::new_v4().to_string(),
            "student": self.reference("students", &body.student_id)?,
            "subject": self.reference("subjects", &body.subject_id)?,
            "examType": body.exam_type,
            "marksObtained": body.marks_obtained,
            "maxMarks": body.max_marks,
        });
        self.marks.push(mark.clone());
        Ok(mark)
    }

    pub fn marks_for(&self, student_id: &str) -> Vec<Value> {
        filter_by_student(&self.marks, student_id)
    }

    pub fn record_attendance(&mut self, body: AttendanceBody) -> DbResult<Value> {
        if !matches!(body.status.as_str(), "present" | "absent") {
            return Err(DbError::Invalid(format!("Unknown attendance status: {}", body.status)));
        }

        let record = json!({
            "_id": uuid::Uuid::new_v4().to_string(),
            "student": self.reference("students", &body.student_id)?,
            "subject": self.reference("subjects", &body.subject_id)?,
            "date": body.date,
            "status": body.status,
        });
        self.attendance.push(record.clone());
        Ok(record)
    }

    pub fn attendance_for(&self, student_id: &str) -> Vec<Value> {
        filter_by_student(&self.attendance, student_id)
    }

    fn create_account(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> DbResult<Account> {
        let email = normalize_email(email);
        if name.trim().is_empty() || email.is_empty() || password.is_empty() {
            return Err(DbError::Invalid("Name, email and password are required".to_string()));
        }
        if self.email_taken(&email) {
            return Err(DbError::Conflict("User already exists".to_string()));
        }

        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email,
            role,
            password_hash: hash(password)?,
        };
        self.accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    fn email_taken(&self, email: &str) -> bool {
        self.email_owners(email).next().is_some()
    }

    fn email_taken_by_other(&self, email: &str, id: &str) -> bool {
        self.email_owners(email).any(|owner| owner != id)
    }

    /// Ids of accounts and profile records registered under `email`
    fn email_owners<'a>(&'a self, email: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let accounts = self
            .accounts
            .values()
            .filter(move |a| a.email == email)
            .map(|a| a.id.as_str());
        let profiles = COLLECTIONS
            .iter()
            .filter(|c| profile_role(c).is_some())
            .filter_map(move |c| self.collections.get(c))
            .flatten()
            .filter(move |r| {
                r.get("email").and_then(Value::as_str).map(normalize_email).as_deref() == Some(email)
            })
            .filter_map(record_id);
        accounts.chain(profiles)
    }

    fn records_mut(&mut self, collection: &'static str) -> &mut Vec<Value> {
        self.collections.entry(collection).or_default()
    }

    /// `{_id, name[, code]}` for a record that must exist
    fn reference(&self, collection: &str, id: &str) -> DbResult<Value> {
        let record = self.get(collection, id)?;
        let mut reference = Map::new();
        for key in ["_id", "name", "code"] {
            if let Some(value) = record.get(key) {
                reference.insert(key.to_string(), value.clone());
            }
        }
        Ok(Value::Object(reference))
    }
}

/// Collection that holds the profile of accounts with `role`
pub fn profile_collection(role: Role) -> Option<&'static str> {
    match role {
        Role::Student => Some("students"),
        Role::Faculty => Some("faculty"),
        Role::Admin => None,
    }
}

fn profile_role(collection: &str) -> Option<Role> {
    match collection {
        "students" => Some(Role::Student),
        "faculty" => Some(Role::Faculty),
        _ => None,
    }
}

fn known_collection(name: &str) -> DbResult<&'static str> {
    COLLECTIONS
        .iter()
        .copied()
        .find(|c| *c == name)
        .ok_or_else(|| DbError::NotFound(format!("Unknown resource: {}", name)))
}

fn not_found(collection: &str) -> DbError {
    DbError::NotFound(format!("No such record in {}", collection))
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("_id").and_then(Value::as_str)
}

fn filter_by_student(records: &[Value], student_id: &str) -> Vec<Value> {
    records
        .iter()
        .filter(|r| r.pointer("/student/_id").and_then(Value::as_str) == Some(student_id))
        .cloned()
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash(password: &str) -> DbResult<String> {
    bcrypt::hash(password, DEV_HASH_COST).map_err(|e| DbError::Invalid(e.to_string()))
}

fn into_object(body: Value) -> DbResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(DbError::Invalid("Expected a JSON object".to_string())),
    }
}

fn take_string(record: &mut Map<String, Value>, key: &str) -> Option<String> {
    match record.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn required_str(record: &Map<String, Value>, key: &str) -> DbResult<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| DbError::Invalid(format!("{} is required", key)))
}
