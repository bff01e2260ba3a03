//! CLI command execution.
//!
//! `ask` and `conversations` are thin clients of a running server.

use anyhow::{bail, Context, Result};

use crate::auth::TokenVerifier;
use crate::chat::Submission;
use crate::config::{resolve_secret, ServerConfig};
use crate::server::{self, ConversationList};

use super::args::{Cli, Commands, Remote};

/// Execute the parsed command.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            port,
            upstream_url,
            upstream_timeout_secs,
        } => {
            let config = ServerConfig::new(port, upstream_url, upstream_timeout_secs, cli.jwt_secret);
            server::start_server(config).await
        }
        Commands::Token { user_id, ttl_hours } => {
            let verifier = TokenVerifier::new(&resolve_secret(cli.jwt_secret));
            let token = verifier.issue(&user_id, ttl_hours.map(chrono::Duration::hours))?;
            println!("{token}");
            Ok(())
        }
        Commands::Ask { remote, query } => {
            let query = query.join(" ");
            if query.trim().is_empty() {
                bail!("Query is required for ask command");
            }
            ask(&remote, &query).await
        }
        Commands::Conversations { remote } => list_conversations(&remote).await,
    }
}

/// Submit a query and print the reply.
async fn ask(remote: &Remote, query: &str) -> Result<()> {
    let url = format!("{}/api/chat", remote.server.trim_end_matches('/'));
    let resp = reqwest::Client::new()
        .post(&url)
        .bearer_auth(&remote.token)
        .json(&serde_json::json!({ "query": query }))
        .send()
        .await
        .context("Failed to reach lawpal server")?;

    if !resp.status().is_success() {
        bail!("Server returned {}: {}", resp.status(), error_message(resp).await);
    }

    let submission: Submission = resp.json().await.context("Failed to parse response")?;
    println!("{}", submission.reply.content);
    if submission.failed {
        bail!("The answer service did not respond");
    }
    Ok(())
}

/// Print every conversation, marking the active one.
async fn list_conversations(remote: &Remote) -> Result<()> {
    let url = format!("{}/api/conversations", remote.server.trim_end_matches('/'));
    let resp = reqwest::Client::new()
        .get(&url)
        .bearer_auth(&remote.token)
        .send()
        .await
        .context("Failed to reach lawpal server")?;

    if !resp.status().is_success() {
        bail!("Server returned {}: {}", resp.status(), error_message(resp).await);
    }

    let list: ConversationList = resp.json().await.context("Failed to parse conversations")?;
    for line in conversation_lines(&list) {
        println!("{line}");
    }
    Ok(())
}

fn conversation_lines(list: &ConversationList) -> Vec<String> {
    let mut lines = Vec::new();
    for conv in &list.conversations {
        let marker = if conv.id == list.active_id { "*" } else { " " };
        lines.push(format!(
            "{marker} {}  {}  ({} messages, {})",
            conv.id,
            conv.title,
            conv.messages.len(),
            conv.created_at.format("%Y-%m-%d %H:%M")
        ));
        if conv.awaiting_response {
            lines.push("    awaiting a reply".to_string());
        }
    }
    lines
}

async fn error_message(resp: reqwest::Response) -> String {
    resp.json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("message")
                .or_else(|| body.get("error"))
                .and_then(serde_json::Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| "no details".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationId, Message, SEED_GREETING};
    use crate::server::ConversationView;

    fn view(title: &str, awaiting_response: bool) -> ConversationView {
        ConversationView {
            id: ConversationId::generate(),
            title: title.to_string(),
            created_at: chrono::Utc::now(),
            messages: vec![Message::assistant(SEED_GREETING)],
            awaiting_response,
        }
    }

    #[test]
    fn lines_mark_active_and_awaiting_conversations() {
        let busy = view("Lease review", true);
        let idle = view("New Conversation 1", false);
        let list = ConversationList {
            active_id: idle.id,
            conversations: vec![busy, idle],
        };

        let lines = conversation_lines(&list);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("  "));
        assert!(lines[0].contains("Lease review"));
        assert_eq!(lines[1], "    awaiting a reply");
        assert!(lines[2].starts_with("* "));
        assert!(lines[2].contains("(1 messages,"));
    }
}
