use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::TimeDelta;
use api::{AppState, JwtAuthenticator, router};
use clap::{Parser, Subcommand};
use progress_core::Clock;
use progress_core::model::UserId;
use services::{AppServices, TranslatorConfig, translator_from_config};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum ArgsError {
    #[error("invalid sqlite url: {raw} (expected sqlite::memory: or sqlite://<path>)")]
    InvalidDbUrl { raw: String },
}

#[derive(Parser)]
#[command(name = "progress-server")]
#[command(about = "Student progress tracking service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        #[arg(long, env = "PROGRESS_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// `sqlite::memory:`, `sqlite://<path>` or a bare file path
        #[arg(long, env = "PROGRESS_DB_URL", default_value = "sqlite://progress.sqlite3")]
        db: String,

        #[arg(long, env = "PROGRESS_JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,
    },
    /// Mint a bearer token for local testing
    Token {
        #[arg(long)]
        user: String,

        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,

        #[arg(long, env = "PROGRESS_JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,
    },
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

fn token_ttl(secs: i64) -> anyhow::Result<TimeDelta> {
    TimeDelta::try_seconds(secs).with_context(|| format!("--ttl-secs {secs} is out of range"))
}

async fn serve(bind: SocketAddr, db: &str, jwt_secret: &str) -> anyhow::Result<()> {
    let db_url = normalize_sqlite_url(db);
    prepare_sqlite_file(&db_url)?;

    let translator = translator_from_config(TranslatorConfig::from_env());
    let services = AppServices::new_sqlite(&db_url, Clock::default_clock(), translator)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    let auth = Arc::new(JwtAuthenticator::new(jwt_secret.as_bytes()));
    let app = router(AppState::new(services.progress(), auth));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, db = %db_url, "progress server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve {
            bind,
            db,
            jwt_secret,
        } => serve(bind, &db, &jwt_secret).await,
        Command::Token {
            user,
            ttl_secs,
            jwt_secret,
        } => {
            let auth = JwtAuthenticator::new(jwt_secret.as_bytes());
            let token = auth.issue(&UserId::new(user), token_ttl(ttl_secs)?)?;
            println!("{token}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_and_absolute_urls_pass_through() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/p.sqlite3"),
            "sqlite:///tmp/p.sqlite3"
        );
    }

    #[test]
    fn bare_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/p.sqlite3");
        assert!(url.starts_with("sqlite:///"), "{url}");
        assert!(url.ends_with("data/p.sqlite3"), "{url}");
    }

    #[test]
    fn prepare_rejects_foreign_urls() {
        assert!(prepare_sqlite_file("postgres://x").is_err());
        assert!(prepare_sqlite_file("sqlite://").is_err());
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
    }

    #[test]
    fn token_ttl_rejects_out_of_range_seconds() {
        assert_eq!(token_ttl(60).unwrap(), TimeDelta::minutes(1));
        assert!(token_ttl(i64::MAX).is_err());
    }

    #[test]
    fn cli_parses_token_command() {
        let cli = Cli::try_parse_from([
            "progress-server",
            "token",
            "--user",
            "student-1",
            "--jwt-secret",
            "s",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Token { ttl_secs: 3600, .. }
        ));
    }
}
