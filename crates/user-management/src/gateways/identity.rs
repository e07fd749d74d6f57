//! # Identity Provider Gateway
//!
//! Mirrors each user's `{roles, status}` as custom claims at the external identity
//! provider and mints short-lived custom sign-in tokens.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Custom claims as a JSON object.
pub type Claims = Map<String, Value>;

/// Claim names owned by the token format itself; callers may not set them.
pub const RESERVED_CLAIMS: &[&str] = &[
    "acr", "amr", "at_hash", "aud", "auth_time", "azp", "cnf", "c_hash", "exp", "firebase",
    "iat", "iss", "jti", "nbf", "nonce", "sub",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Claim name is reserved: {0}")]
    ReservedClaim(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Replace the custom claims of `external_id`.
    async fn set_claims(&self, external_id: &str, claims: &Claims) -> Result<(), ProviderError>;

    /// Mint a custom token for `uid` that expires after `ttl`.
    async fn mint_custom_token(
        &self,
        uid: &str,
        claims: Option<&Claims>,
        ttl: Duration,
    ) -> Result<String, ProviderError>;
}

/// Rejects any claim whose name is reserved.
pub fn check_reserved(claims: &Claims) -> Result<(), ProviderError> {
    match claims.keys().find(|name| RESERVED_CLAIMS.contains(&name.as_str())) {
        Some(name) => Err(ProviderError::ReservedClaim(name.clone())),
        None => Ok(()),
    }
}

/// Provider that keeps claims in memory and mints opaque unique tokens.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityProvider {
    claims: Arc<DashMap<String, Claims>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last claims written for `external_id`.
    pub fn claims_for(&self, external_id: &str) -> Option<Claims> {
        self.claims.get(external_id).map(|claims| claims.clone())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn set_claims(&self, external_id: &str, claims: &Claims) -> Result<(), ProviderError> {
        if external_id.trim().is_empty() {
            return Err(ProviderError::Rejected("external id is empty".to_string()));
        }
        check_reserved(claims)?;
        debug!(external_id, ?claims, "Setting custom claims");
        self.claims.insert(external_id.to_string(), claims.clone());
        Ok(())
    }

    async fn mint_custom_token(
        &self,
        uid: &str,
        claims: Option<&Claims>,
        ttl: Duration,
    ) -> Result<String, ProviderError> {
        if let Some(claims) = claims {
            check_reserved(claims)?;
        }
        debug!(uid, ttl_secs = ttl.as_secs(), "Minting custom token");
        Ok(format!("token_for_user_{uid}_{}", Uuid::new_v4().simple()))
    }
}
