//! Axum middleware that gates protected routes on a verified bearer token.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::verifier::{AuthError, TokenVerifier};

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": self.to_string() })),
        )
            .into_response()
    }
}

/// Verify the request's `Authorization` header and attach the resulting
/// [`Session`](crate::models::Session) as a request extension.
///
/// Rejected requests never reach the inner handler.
pub async fn require_auth(
    State(verifier): State<Arc<TokenVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let header_present = header.is_some();
    let verified = verifier.verify_header(header);

    match verified {
        Ok(session) => {
            tracing::debug!(
                user_id = %session.user_id,
                token = %session.token_preview(),
                path = %req.uri().path(),
                "token verified"
            );
            req.extensions_mut().insert(session);
            Ok(next.run(req).await)
        }
        Err(err) => {
            tracing::info!(
                path = %req.uri().path(),
                header_present,
                reason = %err,
                "request rejected"
            );
            Err(err)
        }
    }
}
