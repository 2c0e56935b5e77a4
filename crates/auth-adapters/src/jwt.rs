//! HS256 JSON Web Tokens carrying `{id, role}`.

use chrono::{DateTime, Duration, Utc};
use domains::errors::CredentialError;
use domains::models::{Requester, Role};
use domains::ports::CredentialService;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allowed clock skew when checking `exp`, in seconds.
const LEEWAY_SECS: u64 = 5;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: Uuid,
    role: Role,
    iat: i64,
    exp: i64,
}

pub struct JwtCredentialService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtCredentialService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issues a token as if it had been minted at `issued_at`.
    pub fn issue_at(&self, requester: &Requester, issued_at: DateTime<Utc>) -> anyhow::Result<String> {
        let claims = Claims {
            id: requester.id,
            role: requester.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

impl CredentialService for JwtCredentialService {
    fn issue(&self, requester: &Requester) -> anyhow::Result<String> {
        self.issue_at(requester, Utc::now())
    }

    fn verify(&self, token: &str) -> Result<Requester, CredentialError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => CredentialError::Expired,
                ErrorKind::InvalidSignature => CredentialError::InvalidSignature,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => CredentialError::Malformed,
                _ => CredentialError::Rejected(e.to_string()),
            }
        })?;

        Ok(Requester {
            id: data.claims.id,
            role: data.claims.role,
        })
    }
}
