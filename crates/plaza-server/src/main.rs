use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use plaza_api::auth::{self, AppState, AppStateInner};
use plaza_api::error::ApiError;
use plaza_api::media::MediaStore;
use plaza_db::Database;
use plaza_server::app::build_app;
use plaza_types::validate;

/// Placeholder JWT secrets that MUST NOT survive into a release build.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Parser)]
#[command(name = "plaza", about = "Plaza social backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default when no subcommand is given).
    Serve,
    /// Create an active staff superuser and exit. Staff accounts are only
    /// ever minted here, never over HTTP registration.
    Createsuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plaza=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let db_path = std::env::var("PLAZA_DB_PATH").unwrap_or_else(|_| "plaza.db".into());
    let db = Database::open(&PathBuf::from(&db_path))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db).await,
        Command::Createsuperuser { email, password } => createsuperuser(&db, &email, &password),
    }
}

async fn serve(db: Database) -> anyhow::Result<()> {
    // Config
    let jwt_secret =
        std::env::var("PLAZA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    if !cfg!(debug_assertions)
        && (jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()))
    {
        eprintln!("FATAL: PLAZA_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("PLAZA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PLAZA_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let media_root: PathBuf = std::env::var("PLAZA_MEDIA_ROOT")
        .unwrap_or_else(|_| "./media".into())
        .into();
    let enforce_ownership = std::env::var("PLAZA_ENFORCE_OWNERSHIP")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let media = MediaStore::new(media_root).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        media,
        jwt_secret,
        enforce_ownership,
    });

    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Plaza server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn createsuperuser(db: &Database, email: &str, password: &str) -> anyhow::Result<()> {
    if let Err(errs) = validate::validate_credentials(Some(email), Some(password)) {
        print_field_errors(&errs);
        std::process::exit(1);
    }

    let email = validate::normalize_email(email.trim());
    match auth::create_account(db, &email, password, true, true) {
        Ok(user) => {
            println!("Superuser {} created (id {}).", user.email, user.id);
            Ok(())
        }
        Err(ApiError::Validation(errs)) => {
            print_field_errors(&errs);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn print_field_errors(errs: &validate::FieldErrors) {
    for (field, messages) in &errs.0 {
        eprintln!("{field}: {}", messages.join(" "));
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
