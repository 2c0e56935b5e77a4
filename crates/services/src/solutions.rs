//! # SolutionService
//!
//! Proposed fixes attached to a problem. Same ownership rules as problems;
//! removing a solution also removes its comments.

use std::sync::Arc;

use domains::errors::{DomainError, Result};
use domains::models::{Comment, CommentParent, Requester, Solution, SolutionView};
use domains::ports::{CommentRepo, ProblemRepo, SolutionRepo, UserRepo};
use domains::votes::VoteDirection;
use tracing::info;
use uuid::Uuid;

use crate::support::{author_index, authorize, comment_threads};
use crate::validation::Validator;

const KIND: &str = "Solution";

pub struct SolutionService {
    problems: Arc<dyn ProblemRepo>,
    solutions: Arc<dyn SolutionRepo>,
    comments: Arc<dyn CommentRepo>,
    users: Arc<dyn UserRepo>,
}

impl SolutionService {
    pub fn new(
        problems: Arc<dyn ProblemRepo>,
        solutions: Arc<dyn SolutionRepo>,
        comments: Arc<dyn CommentRepo>,
        users: Arc<dyn UserRepo>,
    ) -> Self {
        Self {
            problems,
            solutions,
            comments,
            users,
        }
    }

    pub async fn suggest(
        &self,
        problem_id: Uuid,
        requester: &Requester,
        text: &str,
    ) -> Result<Solution> {
        Validator::new()
            .required(text, "text", "Text is required")
            .finish()?;

        if self.problems.find_problem(problem_id).await?.is_none() {
            return Err(DomainError::not_found("Problem", problem_id));
        }

        let solution = self
            .solutions
            .create_solution(Solution::new(
                requester.id,
                problem_id,
                text.trim().to_string(),
            ))
            .await?;

        info!(solution_id = %solution.id, problem_id = %problem_id, "solution suggested");
        Ok(solution)
    }

    /// `text = None` is accepted and changes nothing.
    pub async fn update(
        &self,
        id: Uuid,
        requester: &Requester,
        text: Option<&str>,
    ) -> Result<Solution> {
        Validator::new()
            .optional_required(text, "text", "Text is required")
            .finish()?;

        let existing = self.find(id).await?;
        authorize(&existing, requester, "update solution")?;

        let Some(text) = text else {
            return Ok(existing);
        };

        let updated = self
            .solutions
            .update_solution_text(id, text.trim().to_string())
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))?;

        info!(solution_id = %id, user_id = %requester.id, "solution updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, requester: &Requester) -> Result<()> {
        let solution = self.find(id).await?;
        authorize(&solution, requester, "delete solution")?;

        self.solutions
            .delete_solution(id)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))?;
        let comments = self
            .comments
            .delete_comments_for(CommentParent::Solution(id))
            .await?;

        info!(solution_id = %id, user_id = %requester.id, comments, "solution deleted");
        Ok(())
    }

    /// Solutions of a problem, oldest first, with authors and comment threads.
    /// An unknown problem simply has none.
    pub async fn list_for_problem(&self, problem_id: Uuid) -> Result<Vec<SolutionView>> {
        let solutions = self.solutions.list_solutions(problem_id).await?;

        let authors = author_index(self.users.as_ref(), solutions.iter().map(|s| s.user_id)).await?;
        let lists: Vec<&[Uuid]> = solutions.iter().map(|s| s.comments.as_slice()).collect();
        let threads = comment_threads(self.comments.as_ref(), &lists).await?;

        Ok(solutions
            .into_iter()
            .zip(threads)
            .map(|(solution, thread)| SolutionView {
                author: authors.get(&solution.user_id).cloned(),
                comment_thread: Some(thread),
                solution,
            })
            .collect())
    }

    pub async fn vote(
        &self,
        id: Uuid,
        requester: &Requester,
        direction: VoteDirection,
    ) -> Result<Solution> {
        self.solutions
            .vote_solution(id, requester.id, direction)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))
    }

    pub async fn comment(&self, id: Uuid, requester: &Requester, text: &str) -> Result<Comment> {
        Validator::new()
            .required(text, "text", "Text is required")
            .finish()?;

        let comment = Comment::new(
            requester.id,
            CommentParent::Solution(id),
            text.trim().to_string(),
        );
        self.comments
            .attach_comment(comment)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))
    }

    async fn find(&self, id: Uuid) -> Result<Solution> {
        self.solutions
            .find_solution(id)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))
    }
}
