//! # Mutation Policy
//!
//! One place that decides who may change a record. Every service calls
//! [`authorize_mutation`] before updating or deleting owned content, and
//! admin-only operations call [`require_admin`].

use uuid::Uuid;

use crate::errors::{DomainError, Result};
use crate::models::{Requester, Role};

/// Anything with a creating user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// Owner or admin.
pub fn can_mutate(owner_id: Uuid, requester: &Requester) -> bool {
    owner_id == requester.id || requester.role == Role::Admin
}

/// `Ok(())` when `requester` may update or delete a record owned by `owner_id`.
pub fn authorize_mutation(owner_id: Uuid, requester: &Requester) -> Result<()> {
    if can_mutate(owner_id, requester) {
        Ok(())
    } else {
        Err(DomainError::access_denied())
    }
}

/// Convenience over [`authorize_mutation`] for [`Owned`] records.
pub fn authorize_record<R: Owned + ?Sized>(record: &R, requester: &Requester) -> Result<()> {
    authorize_mutation(record.owner_id(), requester)
}

/// Admin routes have no ownership fallback.
pub fn require_admin(requester: &Requester) -> Result<()> {
    if requester.role == Role::Admin {
        Ok(())
    } else {
        Err(DomainError::access_denied())
    }
}
