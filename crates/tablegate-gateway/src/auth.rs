//! Shared-secret authentication and the table allow-list

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tablegate_core::problemdetails::Problem;
use tracing::debug;

use crate::error::GatewayError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Checks presented keys against the configured secret.
///
/// Only the SHA-256 digest of the secret is kept. Candidates are hashed too,
/// so the comparison always runs over 32 bytes whatever their length.
#[derive(Clone)]
pub struct ApiKeyVerifier {
    digest: [u8; 32],
}

impl ApiKeyVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    pub fn verify(&self, candidate: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        constant_time_eq(&self.digest, &candidate)
    }
}

impl fmt::Debug for ApiKeyVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKeyVerifier(<redacted>)")
    }
}

/// XOR-fold comparison with no early exit
fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Exact, case-sensitive set of exposed tables
#[derive(Debug, Clone)]
pub struct AllowList {
    ordered: Vec<String>,
    lookup: HashSet<String>,
}

impl AllowList {
    pub fn new(tables: impl IntoIterator<Item = String>) -> Self {
        let mut ordered = Vec::new();
        let mut lookup = HashSet::new();
        for table in tables {
            if lookup.insert(table.clone()) {
                ordered.push(table);
            }
        }
        Self { ordered, lookup }
    }

    pub fn contains(&self, table: &str) -> bool {
        self.lookup.contains(table)
    }

    /// `Ok` with the table name when exposed, otherwise a not-found error
    pub fn check<'a>(&self, table: &'a str) -> Result<&'a str, GatewayError> {
        if self.contains(table) {
            Ok(table)
        } else {
            debug!("Rejected request for table outside the allow-list: {}", table);
            Err(GatewayError::TableNotAllowed(table.to_string()))
        }
    }

    /// Tables in configured order
    pub fn tables(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Middleware guarding `/api/*`: rejects requests without a valid
/// `X-API-Key` before any handler runs
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|key| state.verifier.verify(key))
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        debug!(
            "Rejected unauthenticated request to {}",
            request.uri().path()
        );
        Problem::from(GatewayError::Unauthorized).into_response()
    }
}
