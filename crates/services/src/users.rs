//! # UserService
//!
//! The signed-in user's own profile.

use std::sync::Arc;

use domains::errors::{DomainError, Result};
use domains::models::{Requester, UserPatch, UserProfile};
use domains::ports::{PasswordHasher, UserRepo};
use serde::Deserialize;
use tracing::info;

use crate::validation::{normalize_email, Validator, MIN_PASSWORD_LEN};

/// Profile edits; absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct UserService {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepo>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    pub async fn profile(&self, requester: &Requester) -> Result<UserProfile> {
        self.users
            .find_user(requester.id)
            .await?
            .map(|u| UserProfile::from(&u))
            .ok_or_else(|| DomainError::not_found("User", requester.id))
    }

    pub async fn update_profile(
        &self,
        requester: &Requester,
        changes: ProfileChanges,
    ) -> Result<UserProfile> {
        let mut v = Validator::new();
        v.optional_required(changes.username.as_deref(), "username", "Username is required");
        if let Some(email) = &changes.email {
            v.email(email, "email", "Please include a valid email");
        }
        if let Some(password) = &changes.password {
            v.min_chars(
                password,
                MIN_PASSWORD_LEN,
                "password",
                "Password must be 6 or more characters",
            );
        }
        v.finish()?;

        let email = changes.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if let Some(other) = self.users.find_user_by_email(email).await? {
                if other.id != requester.id {
                    return Err(DomainError::InvalidRequest("Email is already in use".into()));
                }
            }
        }

        let password_hash = match &changes.password {
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };

        let patch = UserPatch {
            username: changes.username.map(|u| u.trim().to_string()),
            email,
            password_hash,
        };
        if patch.is_empty() {
            return self.profile(requester).await;
        }

        let user = self
            .users
            .update_user(requester.id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found("User", requester.id))?;

        info!(user_id = %user.id, "profile updated");
        Ok(UserProfile::from(&user))
    }
}
