//! Identity models and the wire shapes of the auth endpoints

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of portal roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Faculty, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Faculty => "FACULTY",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: servers have sent "student", "Student" and "STUDENT".
impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "FACULTY" => Ok(Role::Faculty),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(Error::UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_faculty(&self) -> bool {
        self.role == Role::Faculty
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Create, edit and delete shared records (students, faculty, subjects,
    /// announcements, marks, attendance).
    pub fn can_manage_records(&self) -> bool {
        self.is_admin()
    }

    /// Students and faculty maintain their own profile through `/me`.
    pub fn can_edit_own_profile(&self) -> bool {
        matches!(self.role, Role::Student | Role::Faculty)
    }
}

/// Login form
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

/// Identity record as servers send it: `_id` or `id`, role in any casing.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl TryFrom<WireUser> for User {
    type Error = Error;

    fn try_from(wire: WireUser) -> Result<Self> {
        Ok(User {
            role: wire.role.parse()?,
            id: wire.id,
            email: wire.email,
            name: wire.name,
        })
    }
}

/// Body of a successful login or registration.
///
/// Two server generations exist: one nests the identity under `user`, the
/// other flattens it next to the token. Both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AuthResponse {
    Nested {
        token: String,
        user: WireUser,
    },
    Flat {
        token: String,
        #[serde(flatten)]
        user: WireUser,
    },
}

impl AuthResponse {
    /// Split into the bearer token and a normalized user.
    pub fn into_parts(self) -> Result<(String, User)> {
        let (token, wire) = match self {
            AuthResponse::Nested { token, user } | AuthResponse::Flat { token, user } => {
                (token, user)
            }
        };
        if token.trim().is_empty() {
            return Err(Error::MalformedResponse("empty token".to_string()));
        }
        Ok((token, User::try_from(wire)?))
    }
}
