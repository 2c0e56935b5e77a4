//! # AuthService
//!
//! Account registration, password login and bearer-token authentication.

use std::sync::Arc;

use domains::errors::{DomainError, Result};
use domains::models::{Requester, Role, User};
use domains::ports::{CredentialService, PasswordHasher, UserRepo};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::validation::{normalize_email, Validator, MIN_PASSWORD_LEN};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub email: String,
    pub password: Option<String>,
}

/// The account part of a login or signup answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SessionUser,
}

pub struct AuthService {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn PasswordHasher>,
    credentials: Arc<dyn CredentialService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        hasher: Arc<dyn PasswordHasher>,
        credentials: Arc<dyn CredentialService>,
    ) -> Self {
        Self {
            users,
            hasher,
            credentials,
        }
    }

    /// Registers a plain `user` account and signs it in.
    pub async fn signup(&self, input: SignupInput) -> Result<AuthResponse> {
        Validator::new()
            .required(&input.username, "username", "Username is required")
            .email(&input.email, "email", "Please include a valid email")
            .min_chars(
                &input.password,
                MIN_PASSWORD_LEN,
                "password",
                "Password must be 6 or more characters",
            )
            .finish()?;

        let email = normalize_email(&input.email);
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(DomainError::InvalidRequest("User already exists".into()));
        }

        let hash = self.hasher.hash(&input.password)?;
        let user = User::new(input.username.trim().to_string(), email, hash, Role::User);
        let user = self.users.create_user(user).await?;

        info!(user_id = %user.id, "account created");
        self.session_for(&user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse> {
        Validator::new()
            .email(&input.email, "email", "Please include a valid email")
            .check(input.password.is_some(), "password", "Password is required")
            .finish()?;

        let invalid = || DomainError::InvalidRequest("Invalid credentials".into());
        let password = input.password.unwrap_or_default();

        let user = self
            .users
            .find_user_by_email(&normalize_email(&input.email))
            .await?
            .ok_or_else(invalid)?;

        if !self.hasher.verify(&password, &user.password_hash) {
            warn!(user_id = %user.id, "failed login");
            return Err(invalid());
        }
        if user.is_banned {
            warn!(user_id = %user.id, "banned account attempted login");
            return Err(DomainError::Forbidden("Account is banned".into()));
        }

        info!(user_id = %user.id, "login");
        self.session_for(&user)
    }

    /// Verifies a bearer token and confirms the account is still usable.
    ///
    /// The returned role is the stored one, so a promotion applies to tokens
    /// issued before it.
    pub async fn authenticate(&self, token: &str) -> Result<Requester> {
        let claims = self.credentials.verify(token).inspect_err(|e| {
            warn!(error = %e, "rejected credential");
        })?;

        let user = self
            .users
            .find_user(claims.id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("User no longer exists".into()))?;

        if user.is_banned {
            return Err(DomainError::Forbidden("Account is banned".into()));
        }

        Ok(Requester {
            id: user.id,
            role: user.role,
        })
    }

    fn session_for(&self, user: &User) -> Result<AuthResponse> {
        let token = self.credentials.issue(&Requester {
            id: user.id,
            role: user.role,
        })?;

        Ok(AuthResponse {
            token,
            user: SessionUser {
                id: user.id,
                username: user.username.clone(),
                email: user.email.clone(),
                role: user.role,
            },
        })
    }
}
