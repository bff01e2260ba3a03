//! Session model produced by a successful token verification.

/// An authenticated caller.
///
/// Sessions are never stored server-side; one is built for each verified
/// request and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Identity claim carried by the token.
    pub user_id: String,
    /// The raw bearer token the identity was read from.
    pub token: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    /// Leading characters of the token, safe to put in logs.
    pub fn token_preview(&self) -> String {
        let head: String = self.token.chars().take(12).collect();
        format!("{head}...")
    }
}
