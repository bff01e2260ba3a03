//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_PORT, DEFAULT_UPSTREAM_TIMEOUT_SECS, DEFAULT_UPSTREAM_URL};

/// Lawpal - authenticated legal-assistant chat server
#[derive(Parser, Debug)]
#[command(name = "lawpal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Secret used to sign and verify tokens
    #[arg(long, env = "JWT_SECRET", global = true, hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the chat server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "LAWPAL_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// URL of the external answer service
        #[arg(long, env = "LAWPAL_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
        upstream_url: String,

        /// Seconds to wait for the answer service before giving up
        #[arg(long, env = "LAWPAL_UPSTREAM_TIMEOUT_SECS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS)]
        upstream_timeout_secs: u64,
    },

    /// Mint a development token for a user id
    Token {
        /// User id to embed in the token
        #[arg(long)]
        user_id: String,

        /// Hours until the token expires (omit for no expiry)
        #[arg(long)]
        ttl_hours: Option<i64>,
    },

    /// Ask a question in the active conversation of a running server
    Ask {
        #[command(flatten)]
        remote: Remote,

        /// Question to send
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },

    /// List conversations on a running server
    Conversations {
        #[command(flatten)]
        remote: Remote,
    },
}

/// How to reach a running server.
#[derive(clap::Args, Debug)]
pub struct Remote {
    /// Bearer token (see `lawpal token`)
    #[arg(long, env = "LAWPAL_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Base URL of the server
    #[arg(long, default_value = "http://127.0.0.1:3001")]
    pub server: String,
}
