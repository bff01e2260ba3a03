//! Lawpal - legal-assistant chat server.
//!
//! Tracks each authenticated user's conversations and transient
//! notifications in memory, and forwards queries to an external answer
//! service.
//!
//! Architecture:
//! - Every API request is authenticated by a stateless bearer-token check
//! - A per-user chat orchestrator owns the conversation store and the
//!   notification queue
//! - The CLI can mint development tokens and act as a thin client

mod auth;
mod chat;
mod cli;
mod config;
mod models;
mod server;
mod state;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lawpal=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    execute(cli).await
}
