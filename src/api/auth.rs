use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};

use super::ApiError;

/// Admin capability check: a shared bearer token. Without a configured token
/// every admin request is refused.
#[derive(Clone, Default)]
pub struct AdminGuard {
    token_digest: Option<[u8; 32]>,
}

impl AdminGuard {
    pub fn new(token: Option<&str>) -> Self {
        let token_digest = token.filter(|t| !t.is_empty()).map(digest);
        Self { token_digest }
    }

    pub fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.token_digest else { return false };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|presented| digest(presented.trim()) == *expected)
    }

    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if self.is_admin(headers) { Ok(()) } else { Err(ApiError::Unauthorized) }
    }
}

impl std::fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGuard").field("enabled", &self.token_digest.is_some()).finish()
    }
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}
