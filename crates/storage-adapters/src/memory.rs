//! # In-memory content store
//!
//! `DashMap`-backed implementation of every store port. Used for local
//! development (`database.backend = "memory"`) and by the test suites.
//!
//! Lock order when two maps are touched: parent record first, then comments.

use anyhow::bail;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::models::{
    Comment, CommentParent, Problem, ProblemPatch, Solution, User, UserPatch,
};
use domains::ports::{CommentRepo, ProblemRepo, SolutionRepo, UserRepo};
use domains::votes::{toggle_vote, VoteDirection};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<Uuid, User>,
    /// Lowercased email → user id; enforces uniqueness.
    emails: DashMap<String, Uuid>,
    problems: DashMap<Uuid, Problem>,
    solutions: DashMap<Uuid, Solution>,
    comments: DashMap<Uuid, Comment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl UserRepo for InMemoryStore {
    async fn create_user(&self, user: User) -> anyhow::Result<User> {
        match self.emails.entry(email_key(&user.email)) {
            Entry::Occupied(_) => bail!("email {} is already registered", user.email),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let id = match self.emails.get(&email_key(email)) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_users(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.clone()))
            .collect())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> anyhow::Result<Option<User>> {
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(new_email) = patch.email.as_deref() {
            let (old_key, new_key) = (email_key(&user.email), email_key(new_email));
            if old_key != new_key {
                match self.emails.entry(new_key) {
                    Entry::Occupied(_) => bail!("email {new_email} is already registered"),
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                }
                self.emails.remove(&old_key);
            }
        }

        patch.apply(&mut user);
        Ok(Some(user.clone()))
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> anyhow::Result<Option<User>> {
        Ok(self.users.get_mut(&id).map(|mut u| {
            u.is_banned = banned;
            u.clone()
        }))
    }
}

#[async_trait]
impl ProblemRepo for InMemoryStore {
    async fn create_problem(&self, problem: Problem) -> anyhow::Result<Problem> {
        self.problems.insert(problem.id, problem.clone());
        Ok(problem)
    }

    async fn find_problem(&self, id: Uuid) -> anyhow::Result<Option<Problem>> {
        Ok(self.problems.get(&id).map(|p| p.clone()))
    }

    async fn list_problems(&self, owner: Option<Uuid>) -> anyhow::Result<Vec<Problem>> {
        let mut problems: Vec<Problem> = self
            .problems
            .iter()
            .filter(|p| owner.map_or(true, |o| p.user_id == o))
            .map(|p| p.clone())
            .collect();
        problems.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(problems)
    }

    async fn update_problem(&self, id: Uuid, patch: ProblemPatch) -> anyhow::Result<Option<Problem>> {
        Ok(self.problems.get_mut(&id).map(|mut p| {
            patch.apply(&mut p);
            p.clone()
        }))
    }

    async fn delete_problem(&self, id: Uuid) -> anyhow::Result<Option<Problem>> {
        Ok(self.problems.remove(&id).map(|(_, p)| p))
    }

    async fn vote_problem(
        &self,
        id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<Problem>> {
        Ok(self.problems.get_mut(&id).map(|mut p| {
            let outcome = toggle_vote(&mut *p, user_id, direction);
            debug!(problem_id = %id, %user_id, ?outcome, "vote applied");
            p.clone()
        }))
    }
}

#[async_trait]
impl SolutionRepo for InMemoryStore {
    async fn create_solution(&self, solution: Solution) -> anyhow::Result<Solution> {
        self.solutions.insert(solution.id, solution.clone());
        Ok(solution)
    }

    async fn find_solution(&self, id: Uuid) -> anyhow::Result<Option<Solution>> {
        Ok(self.solutions.get(&id).map(|s| s.clone()))
    }

    async fn list_solutions(&self, problem_id: Uuid) -> anyhow::Result<Vec<Solution>> {
        let mut solutions: Vec<Solution> = self
            .solutions
            .iter()
            .filter(|s| s.problem_id == problem_id)
            .map(|s| s.clone())
            .collect();
        solutions.sort_by_key(|s| (s.created_at, s.id));
        Ok(solutions)
    }

    async fn update_solution_text(&self, id: Uuid, text: String) -> anyhow::Result<Option<Solution>> {
        Ok(self.solutions.get_mut(&id).map(|mut s| {
            s.text = text;
            s.clone()
        }))
    }

    async fn delete_solution(&self, id: Uuid) -> anyhow::Result<Option<Solution>> {
        Ok(self.solutions.remove(&id).map(|(_, s)| s))
    }

    async fn delete_solutions_for(&self, problem_id: Uuid) -> anyhow::Result<Vec<Solution>> {
        let ids: Vec<Uuid> = self
            .solutions
            .iter()
            .filter(|s| s.problem_id == problem_id)
            .map(|s| s.id)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.solutions.remove(&id).map(|(_, s)| s))
            .collect())
    }

    async fn vote_solution(
        &self,
        id: Uuid,
        user_id: Uuid,
        direction: VoteDirection,
    ) -> anyhow::Result<Option<Solution>> {
        Ok(self.solutions.get_mut(&id).map(|mut s| {
            let outcome = toggle_vote(&mut *s, user_id, direction);
            debug!(solution_id = %id, %user_id, ?outcome, "vote applied");
            s.clone()
        }))
    }
}

#[async_trait]
impl CommentRepo for InMemoryStore {
    async fn attach_comment(&self, comment: Comment) -> anyhow::Result<Option<Comment>> {
        // The parent guard stays alive until the comment is stored.
        match comment.parent {
            CommentParent::Problem(id) => {
                let Some(mut parent) = self.problems.get_mut(&id) else {
                    return Ok(None);
                };
                self.comments.insert(comment.id, comment.clone());
                parent.comments.push(comment.id);
            }
            CommentParent::Solution(id) => {
                let Some(mut parent) = self.solutions.get_mut(&id) else {
                    return Ok(None);
                };
                self.comments.insert(comment.id, comment.clone());
                parent.comments.push(comment.id);
            }
        }
        Ok(Some(comment))
    }

    async fn find_comments(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Comment>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.comments.get(id).map(|c| c.clone()))
            .collect())
    }

    async fn delete_comments_for(&self, parent: CommentParent) -> anyhow::Result<u64> {
        let before = self.comments.len();
        self.comments.retain(|_, c| c.parent != parent);
        Ok(before.saturating_sub(self.comments.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::models::Role;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User::new("someone".into(), email.into(), "hash".into(), Role::User)
    }

    #[tokio::test]
    async fn email_uniqueness_is_case_insensitive() {
        let store = InMemoryStore::new();
        store.create_user(user("ana@example.com")).await.unwrap();
        assert!(store.create_user(user("ANA@example.com")).await.is_err());

        let found = store.find_user_by_email("Ana@Example.com").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn changing_email_releases_the_old_one() {
        let store = InMemoryStore::new();
        let ana = store.create_user(user("ana@example.com")).await.unwrap();
        let patch = UserPatch {
            email: Some("ana@civic.test".into()),
            ..Default::default()
        };
        store.update_user(ana.id, patch).await.unwrap().unwrap();

        assert!(store.find_user_by_email("ana@example.com").await.unwrap().is_none());
        store.create_user(user("ana@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn problems_list_newest_first_and_filter_by_owner() {
        let store = InMemoryStore::new();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let first = store
            .create_problem(Problem::new(a, "1st Ave".into(), "Broken light".into(), None))
            .await
            .unwrap();
        let second = store
            .create_problem(Problem::new(b, "2nd Ave".into(), "Flooding".into(), None))
            .await
            .unwrap();

        let all = store.list_problems(None).await.unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let mine = store.list_problems(Some(a)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first.id);
    }

    #[tokio::test]
    async fn attach_to_missing_parent_stores_nothing() {
        let store = InMemoryStore::new();
        let orphan = Comment::new(Uuid::now_v7(), CommentParent::Problem(Uuid::now_v7()), "hi".into());
        let id = orphan.id;

        assert!(store.attach_comment(orphan).await.unwrap().is_none());
        assert!(store.find_comments(&[id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn attach_appends_to_parent_in_order() {
        let store = InMemoryStore::new();
        let p = store
            .create_problem(Problem::new(Uuid::now_v7(), "Main St".into(), "Graffiti".into(), None))
            .await
            .unwrap();
        let parent = CommentParent::Problem(p.id);
        let c1 = store
            .attach_comment(Comment::new(Uuid::now_v7(), parent, "first".into()))
            .await
            .unwrap()
            .unwrap();
        let c2 = store
            .attach_comment(Comment::new(Uuid::now_v7(), parent, "second".into()))
            .await
            .unwrap()
            .unwrap();

        let stored = store.find_problem(p.id).await.unwrap().unwrap();
        assert_eq!(stored.comments, vec![c1.id, c2.id]);

        let thread = store.find_comments(&stored.comments).await.unwrap();
        assert_eq!(thread.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(), ["first", "second"]);

        assert_eq!(store.delete_comments_for(parent).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_votes_are_not_lost() {
        let store = Arc::new(InMemoryStore::new());
        let p = store
            .create_problem(Problem::new(Uuid::now_v7(), "Oak Rd".into(), "Pothole".into(), None))
            .await
            .unwrap();

        let pid = p.id;
        let voters: Vec<Uuid> = (0..32).map(|_| Uuid::now_v7()).collect();
        let mut handles = Vec::new();
        for voter in voters.clone() {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.vote_problem(pid, voter, VoteDirection::Up).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let stored = store.find_problem(pid).await.unwrap().unwrap();
        assert_eq!(stored.ballots.upvotes.len(), voters.len());
        assert!(voters.iter().all(|v| stored.ballots.upvotes.contains(*v)));
    }

    #[tokio::test]
    async fn deleting_solutions_for_a_problem_leaves_others() {
        let store = InMemoryStore::new();
        let (p1, p2) = (Uuid::now_v7(), Uuid::now_v7());
        let owner = Uuid::now_v7();
        store.create_solution(Solution::new(owner, p1, "a".into())).await.unwrap();
        store.create_solution(Solution::new(owner, p1, "b".into())).await.unwrap();
        let keep = store.create_solution(Solution::new(owner, p2, "c".into())).await.unwrap();

        assert_eq!(store.delete_solutions_for(p1).await.unwrap().len(), 2);
        assert!(store.find_solution(keep.id).await.unwrap().is_some());
    }
}
