mod api;
mod chat;
mod cli;
mod config;
mod errors;
mod llm_client;
mod models;
mod resume;
mod session;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::HttpAuthApi;
use crate::chat::{ChatClient, ChatMessage, Sender};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::models::user::NewUser;
use crate::resume::analyzer::AtsAnalyzer;
use crate::session::coordinator::AuthCoordinator;
use crate::session::store::{FileStore, MemoryStore, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Box<dyn SessionStore> = match &config.session_file {
        Some(path) => Box::new(FileStore::new(path.clone())),
        None => Box::new(MemoryStore::new()),
    };
    let auth_api = Arc::new(HttpAuthApi::new(&config.api_url, config.http_timeout_secs)?);
    let mut auth = AuthCoordinator::new(auth_api, store);

    match cli.command {
        Command::Login { email, password } => {
            if auth.login(&email, &password).await {
                let user = auth.user().expect("authenticated state holds a user");
                println!("Logged in as {} <{}>", user.name, user.email);
            } else {
                bail!(display_error(&auth));
            }
        }
        Command::Signup {
            email,
            password,
            name,
        } => {
            let name = name.unwrap_or_else(|| local_part(&email).to_string());
            let avatar = format!(
                "https://ui-avatars.com/api/?name={}",
                name.replace(' ', "+")
            );
            let form = NewUser {
                name,
                email,
                password,
                avatar: Some(avatar),
            };
            if auth.signup(&form).await {
                let user = auth.user().expect("authenticated state holds a user");
                println!("Account created; logged in as {}", user.email);
            } else {
                bail!(display_error(&auth));
            }
        }
        Command::Logout => {
            auth.logout().await;
            println!("Logged out");
        }
        Command::Whoami => {
            if auth.startup_revalidate().await {
                let user = auth.user().expect("authenticated state holds a user");
                println!("{} <{}> ({:?})", user.name, user.email, user.role);
            } else {
                println!("Not logged in");
            }
        }
        Command::Chat { message, image } => {
            let token = require_session(&mut auth).await?;
            let chat = ChatClient::new(&config.api_url, config.http_timeout_secs)?;

            let image = image.as_deref().map(encode_image).transpose()?;
            let sent = ChatMessage::now(Sender::User, message);
            match chat.send(&token, &sent.text, image.as_deref()).await {
                Ok(reply_text) => {
                    let reply = ChatMessage::now(Sender::Assistant, reply_text);
                    println!("{}", reply.text);
                }
                Err(e) => {
                    if e.invalidates_session() {
                        auth.session_rejected();
                    }
                    bail!(e);
                }
            }
        }
        Command::Analyze { resume, job } => {
            let api_key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| anyhow!("GEMINI_API_KEY is required for resume analysis"))?;

            let resume_text = crate::resume::extract_text(&resume)?;
            let job_description = std::fs::read_to_string(&job)
                .with_context(|| format!("failed to read job description {}", job.display()))?;

            let llm = LlmClient::new(api_key, config.http_timeout_secs)?;
            let report = AtsAnalyzer::new(llm).analyze(&resume_text, &job_description).await?;
            print_report(&report);
        }
    }

    Ok(())
}

/// Commands that need a token revalidate the persisted session first.
async fn require_session(auth: &mut AuthCoordinator) -> Result<String> {
    if !auth.startup_revalidate().await {
        bail!("Not logged in. Run `synq login` first.");
    }
    let token = auth.token().expect("authenticated state holds a token");
    Ok(token.to_string())
}

fn display_error(auth: &AuthCoordinator) -> String {
    auth.error().unwrap_or("Unknown error").to_string()
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Reads an image file and encodes it as the data URL the chat proxy expects.
fn encode_image(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image {}", path.display()))?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{mime};base64,{encoded}"))
}

fn print_report(report: &resume::analyzer::AtsReport) {
    println!("Match: {:.0}%", report.match_percentage);
    if !report.missing_keywords.is_empty() {
        println!("\nMissing keywords:");
        for keyword in &report.missing_keywords {
            println!("  - {keyword}");
        }
    }
    if !report.strengths.is_empty() {
        println!("\nStrengths:");
        for strength in &report.strengths {
            println!("  - {strength}");
        }
    }
    if !report.improvements.is_empty() {
        println!("\nImprovements:");
        for improvement in &report.improvements {
            println!("  - {improvement}");
        }
    }
    if !report.ats_summary.is_empty() {
        println!("\n{}", report.ats_summary);
    }
    info!("analysis complete");
}
