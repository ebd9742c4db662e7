use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_portal::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_portal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Login { email, password } => cli::commands::login(&email, password).await,
        Commands::Register {
            name,
            email,
            role,
            password,
        } => cli::commands::register(&name, &email, role, password).await,
        Commands::Logout => cli::commands::logout().await,
        Commands::Whoami { format } => cli::commands::whoami(format).await,
        Commands::Status => cli::commands::status().await,
        Commands::Notices { limit, format } => cli::commands::notices(limit, format).await,
        Commands::Announcements { format } => cli::commands::announcements(format).await,
        Commands::Students { format } => cli::commands::students(format).await,
        Commands::Faculty { format } => cli::commands::faculty(format).await,
        Commands::Subjects { format } => cli::commands::subjects(format).await,
        Commands::Marks { student, format } => cli::commands::marks(student, format).await,
        Commands::Attendance { student, format } => {
            cli::commands::attendance(student, format).await
        }
        Commands::DevServer { host, port } => cli::commands::dev_server(host, port).await,
    }
}
