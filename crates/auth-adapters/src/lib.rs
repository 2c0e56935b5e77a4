//! # auth-adapters
//!
//! Credential and password implementations of the `domains` ports.
//! `Argon2PasswordHasher` is always compiled; the JWT credential service sits
//! behind the `auth-jwt` feature.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2PasswordHasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtCredentialService;
