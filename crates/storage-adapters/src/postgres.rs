//! # Postgres content store
//!
//! Each record is kept as a JSONB document alongside the handful of columns we
//! filter or sort on. Read-modify-write operations (votes, patches, comment
//! attachment) run in a transaction holding a `FOR UPDATE` row lock, so two
//! concurrent votes on the same record cannot overwrite each other.

use anyhow::Context;
use async_trait::async_trait;
use domains::models::{
    Comment, CommentParent, Problem, ProblemPatch, Role, Solution, User, UserPatch,
};
use domains::ports::{CommentRepo, ProblemRepo, SolutionRepo, UserRepo};
use domains::votes::{toggle_vote, VoteDirection};
use tracing::debug;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;

pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("connecting to postgres")?;
        Ok(Self { pool })
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("running migrations")?;
        Ok(())
    }

    /// Changes an account's role. Not part of the ports: only the seed tool
    /// promotes accounts.
    pub async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let doc = sqlx::query_scalar::<_, Json<User>>(
            "UPDATE users SET doc = jsonb_set(doc, '{role}', to_jsonb($2::text)) \
             WHERE id = $1 RETURNING doc",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|Json(u)| u))
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parent_columns(parent: CommentParent) -> (&'static str, Uuid) {
    match parent {
        CommentParent::Problem(id) => ("problem", id),
        CommentParent::Solution(id) => ("solution", id),
    }
}

#[async_trait]
impl UserRepo for PgContentStore {
    async fn create_user(&self, user: User) -> anyhow::Result<User> {
        sqlx::query("INSERT INTO users (id, email, created_at, doc) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(email_key(&user.email))
            .bind(user.created_at)
            .bind(Json(&user))
            .execute(&self.pool)
            .await
            .context("inserting user")?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let doc = sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(u)| u))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let doc = sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE email = $1")
            .bind(email_key(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(u)| u))
    }

    async fn find_users(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let docs = sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(docs.into_iter().map(|Json(u)| u).collect())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let docs = sqlx::query_scalar::<_, Json<User>>(
            "SELECT doc FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(u)| u).collect())
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> anyhow::Result<Option<User>> {
        let mut tx = self.pool.begin().await?;

        let Some(Json(mut user)) =
            sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        patch.apply(&mut user);
        sqlx::query("UPDATE users SET email = $2, doc = $3 WHERE id = $1")
            .bind(id)
            .bind(email_key(&user.email))
            .bind(Json(&user))
            .execute(&mut *tx)
            .await
            .context("updating user")?;

        tx.commit().await?;
        Ok(Some(user))
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> anyhow::Result<Option<User>> {
        let doc = sqlx::query_scalar::<_, Json<User>>(
            "UPDATE users SET doc = jsonb_set(doc, '{is_banned}', to_jsonb($2::boolean)) \
             WHERE id = $1 RETURNING doc",
        )
        .bind(id)
        .bind(banned)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|Json(u)| u))
    }
}

#[async_trait]
impl ProblemRepo for PgContentStore {
    async fn create_problem(&self, problem: Problem) -> anyhow::Result<Problem> {
        sqlx::query("INSERT INTO problems (id, user_id, created_at, doc) VALUES ($1, $2, $3, $4)")
            .bind(problem.id)
            .bind(problem.user_id)
            .bind(problem.created_at)
            .bind(Json(&problem))
            .execute(&self.pool)
            .await
            .context("inserting problem")?;
        Ok(problem)
    }

    async fn find_problem(&self, id: Uuid) -> anyhow::Result<Option<Problem>> {
        let doc = sqlx::query_scalar::<_, Json<Problem>>("SELECT doc FROM problems WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(p)| p))
    }

    async fn list_problems(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Problem>> {
        let docs = sqlx::query_scalar::<_, Json<Problem>>(
            "SELECT doc FROM problems WHERE ($1::uuid IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(p)| p).collect())
    }

    async fn update_problem(&self, id: Uuid, patch: ProblemPatch) -> anyhow::Result<Option<Problem>> {
        let mut tx = self.pool.begin().await?;

        let Some(Json(mut problem)) = sqlx::query_scalar::<_, Json<Problem>>(
            "SELECT doc FROM problems WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        patch.apply(&mut problem);
        sqlx::query("UPDATE problems SET doc = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&problem))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(problem))
    }

    async fn delete_problem(&self, id: Uuid) -> anyhow::Result<Option<Problem>> {
        let doc = sqlx::query_scalar::<_, Json<Problem>>(
            "DELETE FROM problems WHERE id = $1 RETURNING doc",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|Json(p)| p))
    }

    async fn vote_problem(
        &self,
        id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<Problem>> {
        let mut tx = self.pool.begin().await?;

        let Some(Json(mut problem)) = sqlx::query_scalar::<_, Json<Problem>>(
            "SELECT doc FROM problems WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let outcome = toggle_vote(&mut problem, user_id, direction);
        debug!(problem_id = %id, %user_id, ?outcome, "vote applied");
        sqlx::query("UPDATE problems SET doc = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&problem))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(problem))
    }
}

#[async_trait]
impl SolutionRepo for PgContentStore {
    async fn create_solution(&self, solution: Solution) -> anyhow::Result<Solution> {
        sqlx::query(
            "INSERT INTO solutions (id, problem_id, user_id, created_at, doc) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(solution.id)
        .bind(solution.problem_id)
        .bind(solution.user_id)
        .bind(solution.created_at)
        .bind(Json(&solution))
        .execute(&self.pool)
        .await
        .context("inserting solution")?;
        Ok(solution)
    }

    async fn find_solution(&self, id: Uuid) -> anyhow::Result<Option<Solution>> {
        let doc = sqlx::query_scalar::<_, Json<Solution>>("SELECT doc FROM solutions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(s)| s))
    }

    async fn list_solutions(&self, problem_id: Uuid) -> anyhow::Result<Vec<Solution>> {
        let docs = sqlx::query_scalar::<_, Json<Solution>>(
            "SELECT doc FROM solutions WHERE problem_id = $1 ORDER BY created_at, id",
        )
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(s)| s).collect())
    }

    async fn update_solution_text(&self, id: Uuid, text: String) -> anyhow::Result<Option<Solution>> {
        let doc = sqlx::query_scalar::<_, Json<Solution>>(
            "UPDATE solutions SET doc = jsonb_set(doc, '{text}', to_jsonb($2::text)) \
             WHERE id = $1 RETURNING doc",
        )
        .bind(id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|Json(s)| s))
    }

    async fn delete_solution(&self, id: Uuid) -> anyhow::Result<Option<Solution>> {
        let doc = sqlx::query_scalar::<_, Json<Solution>>(
            "DELETE FROM solutions WHERE id = $1 RETURNING doc",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc.map(|Json(s)| s))
    }

    async fn delete_solutions_for(&self, problem_id: Uuid) -> anyhow::Result<Vec<Solution>> {
        let docs = sqlx::query_scalar::<_, Json<Solution>>(
            "DELETE FROM solutions WHERE problem_id = $1 RETURNING doc",
        )
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(s)| s).collect())
    }

    async fn vote_solution(
        &self,
        id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<Solution>> {
        let mut tx = self.pool.begin().await?;

        let Some(Json(mut solution)) = sqlx::query_scalar::<_, Json<Solution>>(
            "SELECT doc FROM solutions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        let outcome = toggle_vote(&mut solution, user_id, direction);
        debug!(solution_id = %id, %user_id, ?outcome, "vote applied");
        sqlx::query("UPDATE solutions SET doc = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&solution))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(solution))
    }
}

#[async_trait]
impl CommentRepo for PgContentStore {
    async fn attach_comment(&self, comment: Comment) -> anyhow::Result<Option<Comment>> {
        let (kind, parent_id) = parent_columns(comment.parent);
        let table = match comment.parent {
            CommentParent::Problem(_) => "problems",
            CommentParent::Solution(_) => "solutions",
        };

        let mut tx = self.pool.begin().await?;

        // Locking the parent row first serialises attachment with votes and edits.
        let Some(Json(mut parent)) = sqlx::query_scalar::<_, Json<serde_json::Value>>(&format!(
            "SELECT doc FROM {table} WHERE id = $1 FOR UPDATE"
        ))
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO comments (id, parent_kind, parent_id, created_at, doc) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(kind)
        .bind(parent_id)
        .bind(comment.created_at)
        .bind(Json(&comment))
        .execute(&mut *tx)
        .await
        .context("inserting comment")?;

        match parent.get_mut("comments").and_then(|c| c.as_array_mut()) {
            Some(ids) => ids.push(serde_json::json!(comment.id)),
            None => parent["comments"] = serde_json::json!([comment.id]),
        }

        sqlx::query(&format!("UPDATE {table} SET doc = $2 WHERE id = $1"))
            .bind(parent_id)
            .bind(Json(&parent))
            .execute(&mut *tx)
            .await
            .context("linking comment to parent")?;

        tx.commit().await?;
        Ok(Some(comment))
    }

    async fn find_comments(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Comment>> {
        let docs = sqlx::query_scalar::<_, Json<Comment>>(
            "SELECT doc FROM comments WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        // Restore the caller's ordering.
        let mut by_id: std::collections::HashMap<Uuid, Comment> =
            docs.into_iter().map(|Json(c)| (c.id, c)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn delete_comments_for(&self, parent: CommentParent) -> anyhow::Result<u64> {
        let (kind, parent_id) = parent_columns(parent);
        let result = sqlx::query("DELETE FROM comments WHERE parent_kind = $1 AND parent_id = $2")
            .bind(kind)
            .bind(parent_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
