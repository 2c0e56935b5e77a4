//! Shared application state handed to every handler.

use std::sync::Arc;

use domains::ports::{
    CommentRepo, CredentialService, MediaStorage, PasswordHasher, ProblemRepo, SolutionRepo,
    UserRepo,
};
use services::{AdminService, AuthService, ProblemService, SolutionService, UserService};

/// Every adapter the services need. One store type usually fills all four
/// repository slots.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepo>,
    pub problems: Arc<dyn ProblemRepo>,
    pub solutions: Arc<dyn SolutionRepo>,
    pub comments: Arc<dyn CommentRepo>,
    pub media: Arc<dyn MediaStorage>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub credentials: Arc<dyn CredentialService>,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub problems: Arc<ProblemService>,
    pub solutions: Arc<SolutionService>,
    pub users: Arc<UserService>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(ports: Ports) -> Self {
        let problems = Arc::new(ProblemService::new(
            ports.problems.clone(),
            ports.solutions.clone(),
            ports.comments.clone(),
            ports.users.clone(),
            ports.media,
        ));
        let solutions = Arc::new(SolutionService::new(
            ports.problems,
            ports.solutions,
            ports.comments,
            ports.users.clone(),
        ));

        Self {
            auth: Arc::new(AuthService::new(
                ports.users.clone(),
                ports.hasher.clone(),
                ports.credentials,
            )),
            users: Arc::new(UserService::new(ports.users.clone(), ports.hasher)),
            admin: Arc::new(AdminService::new(
                ports.users,
                problems.clone(),
                solutions.clone(),
            )),
            problems,
            solutions,
        }
    }
}
