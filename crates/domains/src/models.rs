//! # Domain Models
//!
//! These structs represent the core entities of civic-board.
//! We use UUID v7 for time-ordered, globally unique identification.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::Owned;
use crate::votes::{Ballots, Votable};

/// Account role carried in every credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// The decoded `{id, role}` of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
}

/// A registered account. Never sent to clients as-is: see [`UserProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Stored lowercased; unique across accounts.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::now_v7(),
            username,
            email,
            password_hash,
            role,
            is_banned: false,
            created_at: Utc::now(),
        }
    }
}

/// Client-safe view of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_banned: user.is_banned,
            created_at: user.created_at,
        }
    }
}

/// Author reference embedded in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// A remotely hosted image plus the handle needed to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub url: String,
    pub public_id: String,
}

/// Raw file received from a client, before it reaches the media host.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub content_type: Option<mime::Mime>,
    pub file_name: Option<String>,
}

/// A reported civic issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub location: String,
    pub description: String,
    pub image: Option<ImageAsset>,
    /// Creator; immutable after creation.
    pub user_id: Uuid,
    #[serde(flatten)]
    pub ballots: Ballots,
    /// Comment ids in attachment order.
    #[serde(default)]
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    pub fn new(
        user_id: Uuid,
        location: String,
        description: String,
        image: Option<ImageAsset>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            location,
            description,
            image,
            user_id,
            ballots: Ballots::default(),
            comments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// A proposed fix for a [`Problem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub id: Uuid,
    pub text: String,
    pub problem_id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub ballots: Ballots,
    #[serde(default)]
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Solution {
    pub fn new(user_id: Uuid, problem_id: Uuid, text: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            text,
            problem_id,
            user_id,
            ballots: Ballots::default(),
            comments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// The single record a comment hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentParent {
    Problem(Uuid),
    Solution(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub user_id: Uuid,
    pub parent: CommentParent,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(user_id: Uuid, parent: CommentParent, text: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            text,
            user_id,
            parent,
            created_at: Utc::now(),
        }
    }
}

impl Votable for Problem {
    fn ballots(&self) -> &Ballots {
        &self.ballots
    }
    fn ballots_mut(&mut self) -> &mut Ballots {
        &mut self.ballots
    }
}

impl Votable for Solution {
    fn ballots(&self) -> &Ballots {
        &self.ballots
    }
    fn ballots_mut(&mut self) -> &mut Ballots {
        &mut self.ballots
    }
}

impl Owned for Problem {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for Solution {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// A problem as returned to clients: author populated, comments optionally expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemView {
    #[serde(flatten)]
    pub problem: Problem,
    pub author: Option<UserSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_thread: Option<Vec<Comment>>,
}

/// A solution as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionView {
    #[serde(flatten)]
    pub solution: Solution,
    pub author: Option<UserSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_thread: Option<Vec<Comment>>,
}

/// Fields a problem owner may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProblemPatch {
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageAsset>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl ProblemPatch {
    pub fn apply(self, problem: &mut Problem) {
        if let Some(location) = self.location {
            problem.location = location;
        }
        if let Some(description) = self.description {
            problem.description = description;
        }
        if let Some(image) = self.image {
            problem.image = Some(image);
        }
    }
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password_hash.is_none()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
    }
}
