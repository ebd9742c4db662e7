//! CLI command implementations

use anyhow::{bail, Result};
use std::fs;

use crate::cli::{
    emit, error, format_guard_state, info, print_announcements, print_attendance, print_faculty,
    print_marks, print_notices, print_students, print_subjects, print_user_detail, success, warn,
    OutputFormat, RoleArg,
};
use crate::config::{self, loader::CONFIG_FILENAME, Config};
use crate::guard::{Decision, GuardState};
use crate::portal::Portal;
use crate::server;
use crate::session::{Credentials, Registration, User};

/// Initialize a new portal.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Point [api].base_url at your portal and run 'portal login --email <email>'");

    Ok(())
}

pub async fn login(email: &str, password: Option<String>) -> Result<()> {
    let portal = open()?;
    let password = password_or_prompt(password)?;

    match portal.session().login(&Credentials::new(email, password)).await {
        Ok(user) => {
            success(&format!("Welcome back, {}!", user.name));
            Ok(())
        }
        Err(e) => {
            error(&e.to_string());
            Err(e.into())
        }
    }
}

pub async fn register(
    name: &str,
    email: &str,
    role: RoleArg,
    password: Option<String>,
) -> Result<()> {
    let portal = open()?;
    let registration = Registration {
        email: email.to_string(),
        password: password_or_prompt(password)?,
        name: name.to_string(),
        role: role.into(),
    };

    match portal.session().register(&registration).await {
        Ok(user) => {
            success(&format!("Registered {} as {}", user.email, user.role));
            Ok(())
        }
        Err(e) => {
            error(&format!("Registration failed: {}", e));
            Err(e.into())
        }
    }
}

pub async fn logout() -> Result<()> {
    let portal = open()?;
    portal.session().logout();
    success("Logged out");
    Ok(())
}

pub async fn whoami(format: OutputFormat) -> Result<()> {
    let portal = start()?;
    let user = require_user(&portal).await?;
    emit(format, &user, print_user_detail)
}

/// Report the guard verdict for the protected dashboard
pub async fn status() -> Result<()> {
    let portal = start()?;
    let mut guard = portal.guard();

    if guard.state() == GuardState::Loading {
        info("Confirming stored session...");
    }
    let state = guard.settled().await;
    println!("Dashboard access: {}", format_guard_state(state));

    match guard.decision() {
        Decision::Render => {
            if let Some(user) = portal.session().user() {
                info(&format!("{} ({})", user.email, user.role));
            }
        }
        Decision::Redirect(route) => info(&format!("Would redirect to {}", route)),
        Decision::ShowLoading => {}
    }
    Ok(())
}

pub async fn notices(limit: usize, format: OutputFormat) -> Result<()> {
    let portal = start()?;
    require_user(&portal).await?;
    let notices = portal.resources().latest_notices(limit).await?;
    emit(format, notices.as_slice(), print_notices)
}

pub async fn announcements(format: OutputFormat) -> Result<()> {
    let portal = start()?;
    require_user(&portal).await?;
    let announcements = portal.resources().announcements().await?;
    emit(format, announcements.as_slice(), print_announcements)
}

/// Admins see everyone, students see their own record
pub async fn students(format: OutputFormat) -> Result<()> {
    let portal = start()?;
    let user = require_user(&portal).await?;

    let students = if user.is_student() {
        vec![portal.resources().my_student_profile().await?]
    } else {
        portal.resources().students().await?
    };
    emit(format, students.as_slice(), print_students)
}

pub async fn faculty(format: OutputFormat) -> Result<()> {
    let portal = start()?;
    let user = require_user(&portal).await?;

    let faculty = if user.is_faculty() {
        vec![portal.resources().my_faculty_profile().await?]
    } else {
        portal.resources().faculty_list().await?
    };
    emit(format, faculty.as_slice(), print_faculty)
}

pub async fn subjects(format: OutputFormat) -> Result<()> {
    let portal = start()?;
    require_user(&portal).await?;
    let subjects = portal.resources().subjects().await?;
    emit(format, subjects.as_slice(), print_subjects)
}

pub async fn marks(student: Option<String>, format: OutputFormat) -> Result<()> {
    let portal = start()?;
    let user = require_user(&portal).await?;
    let student_id = student_or_self(student, &user)?;
    let marks = portal.resources().marks_for(&student_id).await?;
    emit(format, marks.as_slice(), print_marks)
}

pub async fn attendance(student: Option<String>, format: OutputFormat) -> Result<()> {
    let portal = start()?;
    let user = require_user(&portal).await?;
    let student_id = student_or_self(student, &user)?;
    let records = portal.resources().attendance_for(&student_id).await?;
    emit(format, records.as_slice(), print_attendance)
}

pub async fn dev_server(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config()?.server;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    server::run_server(&config).await?;
    Ok(())
}

fn load_config() -> Result<Config> {
    Ok(config::load_config_or_default()?)
}

fn start() -> Result<Portal> {
    Ok(Portal::bootstrap(load_config()?)?)
}

/// Stored session without the startup `/students/me` round trip
fn open() -> Result<Portal> {
    Ok(Portal::open(load_config()?)?)
}

/// Wait out the startup fetch and insist on a confirmed user
async fn require_user(portal: &Portal) -> Result<User> {
    match portal.ready().await {
        GuardState::Authorized => {}
        _ => bail!("Not signed in. Run 'portal login --email <email>' first."),
    }
    match portal.session().user() {
        Some(user) => Ok(user),
        None => bail!("Signed in, but the current user could not be resolved"),
    }
}

fn student_or_self(student: Option<String>, user: &User) -> Result<String> {
    match student {
        Some(id) => Ok(id),
        None if user.is_student() => Ok(user.id.clone()),
        None => bail!("Pass --student <id> to choose whose records to show"),
    }
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Ok(dialoguer::Password::new()
            .with_prompt("Password")
            .interact()?),
    }
}
