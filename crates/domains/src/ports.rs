//! # Ports
//!
//! Any adapter must implement these traits to be used by the binary.
//! Store and media ports report infrastructure failures through
//! `anyhow::Result`; "not there" is `Ok(None)`, never an error.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::CredentialError;
use crate::models::{
    Comment, CommentParent, ImageAsset, Problem, ProblemPatch, Requester, Solution, Upload, User,
    UserPatch,
};
use crate::votes::VoteDirection;

/// Account persistence.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, user: User) -> anyhow::Result<User>;
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// `email` is matched case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Users for the given ids; unknown ids are skipped.
    async fn find_users(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;
    /// All users, oldest account first.
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> anyhow::Result<Option<User>>;
    async fn set_banned(&self, id: Uuid, banned: bool) -> anyhow::Result<Option<User>>;
}

/// Problem persistence.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ProblemRepo: Send + Sync {
    async fn create_problem(&self, problem: Problem) -> anyhow::Result<Problem>;
    async fn find_problem(&self, id: Uuid) -> anyhow::Result<Option<Problem>>;
    /// Newest first; restricted to one owner when `owner` is set.
    async fn list_problems(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Problem>>;
    async fn update_problem(&self, id: Uuid, patch: ProblemPatch) -> anyhow::Result<Option<Problem>>;
    async fn delete_problem(&self, id: Uuid) -> anyhow::Result<Option<Problem>>;
    /// Applies [`crate::votes::toggle_vote`] atomically with respect to other
    /// votes on the same record.
    async fn vote_problem(
        &self,
        id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<Problem>>;
}

/// Solution persistence.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait SolutionRepo: Send + Sync {
    async fn create_solution(&self, solution: Solution) -> anyhow::Result<Solution>;
    async fn find_solution(&self, id: Uuid) -> anyhow::Result<Option<Solution>>;
    /// Oldest first.
    async fn list_solutions(&self, problem_id: Uuid) -> anyhow::Result<Vec<Solution>>;
    async fn update_solution_text(&self, id: Uuid, text: String) -> anyhow::Result<Option<Solution>>;
    async fn delete_solution(&self, id: Uuid) -> anyhow::Result<Option<Solution>>;
    /// Removes every solution of a problem and returns them.
    async fn delete_solutions_for(&self, problem_id: Uuid) -> anyhow::Result<Vec<Solution>>;
    async fn vote_solution(
        &self,
        id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<Solution>>;
}

/// Comment persistence.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Stores `comment` and appends its id to the parent's comment list as one
    /// unit. Returns `None`, storing nothing, when the parent does not exist.
    async fn attach_comment(&self, comment: Comment) -> anyhow::Result<Option<Comment>>;
    /// Comments for the given ids, in the order of `ids`; unknown ids are skipped.
    async fn find_comments(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Comment>>;
    /// Returns the number of comments removed.
    async fn delete_comments_for(&self, parent: CommentParent) -> anyhow::Result<u64>;
}

/// Media host contract for image uploads.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Stores an already-validated image and returns its public URL and handle.
    async fn upload(&self, upload: Upload) -> anyhow::Result<ImageAsset>;
    /// Removes a previously uploaded asset. Unknown ids are not an error.
    async fn delete(&self, public_id: &str) -> anyhow::Result<()>;
}

/// Issues and verifies signed session tokens. Stateless.
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait CredentialService: Send + Sync {
    fn issue(&self, requester: &Requester) -> anyhow::Result<String>;
    fn verify(&self, token: &str) -> Result<Requester, CredentialError>;
}

/// One-way password hashing.
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> anyhow::Result<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}
