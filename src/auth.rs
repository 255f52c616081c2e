// src/auth.rs
//! Admin access policy. Handlers only ever ask `authorize(token)`, so the
//! shared-secret scheme below can be swapped without touching them.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};

use crate::config::settings::AdminSettings;

pub trait AdminPolicy: Send + Sync {
    /// Whether a bearer token grants admin access.
    fn authorize(&self, token: &str) -> bool;
    /// Exchange operator credentials for a bearer token.
    fn login(&self, username: &str, password: &str) -> Option<String>;
}

pub type SharedPolicy = Arc<dyn AdminPolicy>;

/// One operator account and one static token, both from settings.
pub struct SharedSecretPolicy {
    username: String,
    password_digest: [u8; 32],
    token: String,
    token_digest: [u8; 32],
}

impl SharedSecretPolicy {
    pub fn new(settings: &AdminSettings) -> Self {
        Self {
            username: settings.username.clone(),
            password_digest: sha256(&settings.password),
            token: settings.token.clone(),
            token_digest: sha256(&settings.token),
        }
    }
}

impl AdminPolicy for SharedSecretPolicy {
    fn authorize(&self, token: &str) -> bool {
        !self.token.is_empty() && digests_match(&sha256(token), &self.token_digest)
    }

    fn login(&self, username: &str, password: &str) -> Option<String> {
        let user_ok = username == self.username;
        let pass_ok = digests_match(&sha256(password), &self.password_digest);
        (user_ok && pass_ok && !self.token.is_empty()).then(|| self.token.clone())
    }
}

fn sha256(s: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(s.as_bytes()));
    out
}

// Fixed-length, no early exit.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Token from `Authorization: Bearer <token>`; `None` if absent or another scheme.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}
