//! `quill` — command line client for the Quill blog platform.

mod config;
mod logging;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use config::Config;
use quill_api::{HttpClient, ReqwestClient};
use quill_routes::{NavigationEngine, NavigationOutcome, RouteGuard, RouteTable};
use quill_session::SessionStore;
use quill_storage::{create_storage, SessionVault};
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "quill", version, about = "Quill blog platform client")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = "QUILL_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the session
    Login {
        username: String,
        password: String,
    },
    /// Register a new account
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Clear the session everywhere
    Logout,
    /// Show the current session
    Status,
    /// Navigate to a route under the current session
    Visit { path: String },
    /// Change a user's role (admin only)
    SetRole { user_id: i64, role: String },
    /// Delete a user account (admin only)
    DeleteUser { user_id: i64 },
    /// Delete an article
    DeleteArticle { article_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    logging::init(&config.log_level);
    let api_url = config.api_url()?;
    debug!(api_url = %api_url, "Configuration loaded");

    let storage = Arc::new(create_storage()?);
    let vault = SessionVault::new(storage);
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new(
        api_url.as_str(),
        Some(Arc::new(vault.clone())),
    ));
    let store = Arc::new(SessionStore::new(http, vault));

    let guard = RouteGuard::new();
    guard.set_notice_handler(|message| eprintln!("notice: {message}"));
    let engine = Arc::new(NavigationEngine::new(RouteTable::default(), guard));
    store.set_navigator(engine.clone());

    // Pick up a persisted session before dispatching
    store.restore();

    match cli.command {
        Command::Login { username, password } => {
            let outcome = store.login(&username, &password).await;
            if !outcome.success {
                bail!(outcome
                    .message
                    .unwrap_or_else(|| "login failed".to_string()));
            }
            println!("logged in as {username}");
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let outcome = store.register(&username, &email, &password).await;
            if !outcome.success {
                bail!(outcome
                    .message
                    .unwrap_or_else(|| "registration failed".to_string()));
            }
            if store.is_logged_in() {
                println!("registered and logged in as {username}");
            } else {
                println!("registered; log in to continue");
            }
        }
        Command::Logout => {
            store.logout();
            println!("logged out");
        }
        Command::Status => {
            let session = store.snapshot();
            match session.user {
                Some(user) => println!("{} (id {}, role {})", user.username, user.id, user.role),
                None => println!("anonymous"),
            }
        }
        Command::Visit { path } => {
            let session = store.snapshot();
            match engine.navigate(&path, &session) {
                NavigationOutcome::Entered { route } => println!("entered {route}"),
                NavigationOutcome::RedirectedToLogin { return_to } => {
                    println!("redirected to /login (return to {return_to} after login)");
                }
                NavigationOutcome::RedirectedToHome => println!("redirected to /"),
                NavigationOutcome::NotFound => bail!("no route matches {path}"),
            }
        }
        Command::SetRole { user_id, role } => {
            store.update_user_role(user_id, &role).await?;
            println!("user {user_id} is now {role}");
        }
        Command::DeleteUser { user_id } => {
            store.delete_user(user_id).await?;
            println!("user {user_id} deleted");
        }
        Command::DeleteArticle { article_id } => {
            store.delete_article(article_id).await?;
            println!("article {article_id} deleted");
        }
    }

    Ok(())
}
