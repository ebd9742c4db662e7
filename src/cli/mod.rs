//! CLI interface for the campus portal

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand, ValueEnum};

use crate::session::Role;

#[derive(Parser)]
#[command(name = "portal")]
#[command(version)]
#[command(about = "Campus portal client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter portal.toml in the current directory
    Init,

    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted for when omitted
        #[arg(short, long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in with it
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, default_value = "student")]
        role: RoleArg,

        /// Prompted for when omitted
        #[arg(short, long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show what the route guard decides for the dashboard
    Status,

    /// Latest notices, as on the dashboard
    Notices {
        #[arg(short, long, default_value = "5")]
        limit: usize,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List announcements
    Announcements {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List students (admin) or show your own profile (student)
    Students {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List faculty
    Faculty {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List subjects
    Subjects {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Marks for a student (defaults to yourself)
    Marks {
        #[arg(short, long)]
        student: Option<String>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Attendance for a student (defaults to yourself)
    Attendance {
        #[arg(short, long)]
        student: Option<String>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Run the in-memory development API server
    DevServer {
        /// Host to bind to (overrides portal.toml)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides portal.toml)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Student,
    Faculty,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Student => Role::Student,
            RoleArg::Faculty => Role::Faculty,
            RoleArg::Admin => Role::Admin,
        }
    }
}
