//! # services
//!
//! Application logic of civic-board. Each service orchestrates the `domains`
//! ports: validation first, then lookups, the ownership policy, and finally
//! the store mutation. Nothing here knows about HTTP.

pub mod admin;
pub mod auth;
pub mod media;
pub mod problems;
pub mod solutions;
mod support;
pub mod users;
pub mod validation;

pub use admin::AdminService;
pub use auth::{AuthResponse, AuthService, LoginInput, SessionUser, SignupInput};
pub use problems::{NewProblem, ProblemChanges, ProblemService};
pub use solutions::SolutionService;
pub use users::{ProfileChanges, UserService};
