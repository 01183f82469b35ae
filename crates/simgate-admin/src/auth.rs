// SPDX-FileCopyrightText: 2026 Simgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared-secret authentication for trigger routes.
//!
//! Accepted credentials (checked in order):
//! 1. `x-admin-secret: <secret>`
//! 2. `Authorization: Bearer <secret>`
//!
//! When no secret is configured, all requests are rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

pub const SECRET_HEADER: &str = "x-admin-secret";

#[derive(Clone, Default)]
pub struct AdminAuth {
    /// Expected shared secret. `None` rejects every request.
    pub shared_secret: Option<String>,
}

impl AdminAuth {
    pub fn new(shared_secret: Option<String>) -> Self {
        Self {
            shared_secret: shared_secret.filter(|s| !s.trim().is_empty()),
        }
    }

    fn accepts(&self, presented: &str) -> bool {
        match &self.shared_secret {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            None => false,
        }
    }
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth")
            .field(
                "shared_secret",
                &self.shared_secret.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn auth_middleware(
    State(auth): State<AdminAuth>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.shared_secret.is_none() {
        tracing::error!("admin surface has no shared secret configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let headers = request.headers();
    let header_secret = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let authorized = header_secret.is_some_and(|s| auth.accepts(s))
        || bearer.is_some_and(|s| auth.accepts(s));
    if authorized {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(path = %request.uri().path(), "admin request rejected");
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secret_counts_as_unset() {
        assert!(AdminAuth::new(Some("   ".into())).shared_secret.is_none());
        assert!(AdminAuth::new(None).shared_secret.is_none());
    }

    #[test]
    fn unset_secret_accepts_nothing() {
        let auth = AdminAuth::default();
        assert!(!auth.accepts(""));
        assert!(!auth.accepts("anything"));
    }

    #[test]
    fn compares_whole_secret() {
        let auth = AdminAuth::new(Some("s3cret".into()));
        assert!(auth.accepts("s3cret"));
        assert!(!auth.accepts("s3cre"));
        assert!(!auth.accepts("s3cret!"));
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", AdminAuth::new(Some("s3cret".into())));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[redacted]"));
    }
}
