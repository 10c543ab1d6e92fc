use std::sync::Arc;

use dojo::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Dialog presenter
// ---------------------------------------------------------------------------

/// Maps a line typed at the prompt to a choice. Anything unrecognised
/// means "ask again".
fn parse_choice(line: &str) -> Option<Choice> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "refresh" => Some(Choice::Refresh),
        "l" | "logout" => Some(Choice::Logout),
        _ => None,
    }
}

/// Prompts on stdin every time a reauthentication dialog opens.
async fn present_dialogs(coordinator: Arc<ReauthCoordinator>) {
    let mut status = coordinator.watch();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while status.changed().await.is_ok() {
        let DialogStatus::Open { cycle } = *status.borrow_and_update() else {
            continue;
        };

        loop {
            let prompt = format!("[dialog {cycle}] session expired: [r]efresh or [l]ogout? ");
            if stdout.write_all(prompt.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                return;
            }
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                // stdin closed: nobody can answer, so log out.
                Ok(None) | Err(_) => {
                    let _ = coordinator.resolve_cycle(cycle, Choice::Logout);
                    return;
                }
            };
            if let Some(choice) = parse_choice(&line) {
                if let Err(error) = coordinator.resolve_cycle(cycle, choice) {
                    // Timed out while the user was typing; a newer dialog
                    // gets its own prompt.
                    tracing::debug!(cycle, %error, "answer for an expired dialog ignored");
                }
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Client bootstrap
// ---------------------------------------------------------------------------

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

async fn show(client: &DojoClient, path: &str) {
    match client.get_json::<serde_json::Value>(path).await {
        Ok(body) => println!("GET {path} -> {body}"),
        Err(error) => println!("GET {path} failed: {error}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let base_url = env_or("DOJO_API_URL", "http://127.0.0.1:3000/api");
    let session_file = env_or("DOJO_SESSION_FILE", "dojo-session.json");
    tracing::info!(%base_url, %session_file, "starting console session");

    let client = DojoClient::builder()
        .base_url(&base_url)
        .storage_path(session_file)
        .build()?;

    tokio::spawn(present_dialogs(Arc::clone(client.coordinator())));

    if let (Ok(email), Ok(password)) = (std::env::var("DOJO_EMAIL"), std::env::var("DOJO_PASSWORD")) {
        match client.login(&email, &password).await {
            Ok(profile) => {
                let name = profile.map(|p| p.name).unwrap_or_default();
                println!("logged in as {name} ({})", client.session().role());
            }
            Err(error) => println!("login failed: {error}"),
        }
    } else if client.session().is_authenticated() {
        println!("resuming saved session ({})", client.session().role());
    }

    show(&client, "/events").await;
    show(&client, "/registrations/me").await;
    show(&client, "/users/me").await;

    Ok(())
}
