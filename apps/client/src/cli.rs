use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SynqTech client: authentication, chat, and resume analysis from the
/// command line.
#[derive(Debug, Parser)]
#[command(name = "synq", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with email and password.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account. Logs in when the backend issues a token.
    Signup {
        email: String,
        #[arg(long)]
        password: String,
        /// Display name; defaults to the local part of the email.
        #[arg(long)]
        name: Option<String>,
    },
    /// Log out and clear the persisted session.
    Logout,
    /// Revalidate the persisted token and print the profile.
    Whoami,
    /// Send one chat message and print the reply.
    Chat {
        message: String,
        /// Image to attach, sent as a base64 data URL.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Score a PDF resume against a job description file.
    Analyze {
        resume: PathBuf,
        #[arg(long)]
        job: PathBuf,
    },
}
