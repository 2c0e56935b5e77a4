//! # AdminService
//!
//! Moderation: account listing and banning, forced content removal. Removal
//! reuses the content services, so cascades and media cleanup are identical
//! to an owner's delete.

use std::sync::Arc;

use domains::errors::{DomainError, Result};
use domains::models::{Requester, UserProfile};
use domains::policy::require_admin;
use domains::ports::UserRepo;
use tracing::info;
use uuid::Uuid;

use crate::problems::ProblemService;
use crate::solutions::SolutionService;

pub struct AdminService {
    users: Arc<dyn UserRepo>,
    problems: Arc<ProblemService>,
    solutions: Arc<SolutionService>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        problems: Arc<ProblemService>,
        solutions: Arc<SolutionService>,
    ) -> Self {
        Self {
            users,
            problems,
            solutions,
        }
    }

    pub async fn list_users(&self, requester: &Requester) -> Result<Vec<UserProfile>> {
        require_admin(requester)?;
        Ok(self
            .users
            .list_users()
            .await?
            .iter()
            .map(UserProfile::from)
            .collect())
    }

    pub async fn get_user(&self, requester: &Requester, id: Uuid) -> Result<UserProfile> {
        require_admin(requester)?;
        self.users
            .find_user(id)
            .await?
            .map(|u| UserProfile::from(&u))
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    pub async fn ban_user(&self, requester: &Requester, id: Uuid) -> Result<UserProfile> {
        require_admin(requester)?;
        let user = self
            .users
            .set_banned(id, true)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;

        info!(admin = %requester.id, user_id = %id, "user banned");
        Ok(UserProfile::from(&user))
    }

    pub async fn delete_problem(&self, requester: &Requester, id: Uuid) -> Result<()> {
        require_admin(requester)?;
        self.problems.delete(id, requester).await
    }

    pub async fn delete_solution(&self, requester: &Requester, id: Uuid) -> Result<()> {
        require_admin(requester)?;
        self.solutions.delete(id, requester).await
    }
}
