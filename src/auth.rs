//! Opaque bearer tokens.
//!
//! A token is `wb_` followed by 32 random bytes in hex. Only its SHA-256 digest is
//! stored; a request is authenticated by hashing the presented token and looking
//! the digest up.

use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::aggregates::{Profile, Role};
use crate::store::Store;
use crate::Result;

pub const TOKEN_PREFIX: &str = "wb_";

pub fn generate_token() -> String {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    format!("{TOKEN_PREFIX}{}", hex::encode(secret))
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// A user resolved from a bearer token.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn has_role(&self, role: Role) -> bool { self.roles.contains(&role) }
    pub fn is_admin(&self) -> bool { self.has_role(Role::Admin) }
}

/// Resolves a presented token, `None` if it is unknown.
pub async fn authenticate(store: &dyn Store, token: &str) -> Result<Option<Identity>> {
    let Some(user_id) = store.user_for_token(&hash_token(token)).await? else { return Ok(None) };
    let roles = store.roles(user_id).await?;
    Ok(Some(Identity { user_id, roles }))
}

/// Creates the profile if needed, grants `role` and returns a fresh token.
pub async fn issue_token(store: &dyn Store, email: &str, full_name: Option<String>, role: Role) -> Result<(Profile, String)> {
    let profile = match store.find_profile_by_email(email).await? {
        Some(mut existing) => {
            if full_name.is_some() {
                existing.full_name = full_name;
                store.upsert_profile(&existing).await?;
            }
            existing
        }
        None => {
            let profile = Profile { id: Uuid::now_v7(), email: email.trim().to_lowercase(), full_name };
            store.upsert_profile(&profile).await?;
            profile
        }
    };
    store.grant_role(profile.id, Role::User).await?;
    if role != Role::User {
        store.grant_role(profile.id, role).await?;
    }

    let token = generate_token();
    store.insert_token(&hash_token(&token), profile.id).await?;
    tracing::info!(user_id = %profile.id, role = %role, "issued api token");
    Ok((profile, token))
}
