//! # ProblemService
//!
//! Reported issues: creation with an optional photo, owner/admin edits and
//! removal, listings with authors populated, votes and comments.
//!
//! Removing a problem removes its image from the media host, then the record,
//! then every solution of the problem and every comment on either.

use std::sync::Arc;

use domains::errors::{DomainError, Result};
use domains::models::{
    Comment, CommentParent, ImageAsset, Problem, ProblemPatch, ProblemView, Requester, Upload,
};
use domains::ports::{CommentRepo, MediaStorage, ProblemRepo, SolutionRepo, UserRepo};
use domains::votes::VoteDirection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::media::validate_image;
use crate::support::{author_index, authorize, comment_threads};
use crate::validation::Validator;

const KIND: &str = "Problem";

#[derive(Debug, Default)]
pub struct NewProblem {
    pub location: String,
    pub description: String,
    pub image: Option<Upload>,
}

/// `None` leaves a field as it is.
#[derive(Debug, Default)]
pub struct ProblemChanges {
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<Upload>,
}

pub struct ProblemService {
    problems: Arc<dyn ProblemRepo>,
    solutions: Arc<dyn SolutionRepo>,
    comments: Arc<dyn CommentRepo>,
    users: Arc<dyn UserRepo>,
    media: Arc<dyn MediaStorage>,
}

impl ProblemService {
    pub fn new(
        problems: Arc<dyn ProblemRepo>,
        solutions: Arc<dyn SolutionRepo>,
        comments: Arc<dyn CommentRepo>,
        users: Arc<dyn UserRepo>,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        Self {
            problems,
            solutions,
            comments,
            users,
            media,
        }
    }

    pub async fn create(&self, requester: &Requester, input: NewProblem) -> Result<Problem> {
        Validator::new()
            .required(&input.location, "location", "Location is required")
            .required(&input.description, "description", "Description is required")
            .finish()?;
        if let Some(upload) = &input.image {
            validate_image(upload)?;
        }

        let image = match input.image {
            Some(upload) => Some(self.media.upload(upload).await?),
            None => None,
        };

        let problem = Problem::new(
            requester.id,
            input.location.trim().to_string(),
            input.description.trim().to_string(),
            image.clone(),
        );
        let problem = match self.problems.create_problem(problem).await {
            Ok(p) => p,
            Err(err) => {
                self.discard(image.as_ref()).await;
                return Err(err.into());
            }
        };

        info!(problem_id = %problem.id, user_id = %requester.id, "problem reported");
        Ok(problem)
    }

    pub async fn update(
        &self,
        id: Uuid,
        requester: &Requester,
        changes: ProblemChanges,
    ) -> Result<Problem> {
        Validator::new()
            .optional_required(changes.location.as_deref(), "location", "Location is required")
            .optional_required(
                changes.description.as_deref(),
                "description",
                "Description is required",
            )
            .finish()?;
        if let Some(upload) = &changes.image {
            validate_image(upload)?;
        }

        let existing = self.find(id).await?;
        authorize(&existing, requester, "update problem")?;

        let new_image = match changes.image {
            Some(upload) => Some(self.media.upload(upload).await?),
            None => None,
        };

        let patch = ProblemPatch {
            location: changes.location.map(|s| s.trim().to_string()),
            description: changes.description.map(|s| s.trim().to_string()),
            image: new_image.clone(),
        };

        let updated = match self.problems.update_problem(id, patch).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                self.discard(new_image.as_ref()).await;
                return Err(DomainError::not_found(KIND, id));
            }
            Err(err) => {
                self.discard(new_image.as_ref()).await;
                return Err(err.into());
            }
        };

        // The record now points at the new image; the old one is garbage.
        if new_image.is_some() {
            self.discard(existing.image.as_ref()).await;
        }

        info!(problem_id = %id, user_id = %requester.id, "problem updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, requester: &Requester) -> Result<()> {
        let problem = self.find(id).await?;
        authorize(&problem, requester, "delete problem")?;

        if let Some(image) = &problem.image {
            self.media.delete(&image.public_id).await?;
        }

        self.problems
            .delete_problem(id)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))?;

        let solutions = self.solutions.delete_solutions_for(id).await?;
        let mut removed_comments = self
            .comments
            .delete_comments_for(CommentParent::Problem(id))
            .await?;
        for solution in &solutions {
            removed_comments += self
                .comments
                .delete_comments_for(CommentParent::Solution(solution.id))
                .await?;
        }

        info!(
            problem_id = %id,
            user_id = %requester.id,
            solutions = solutions.len(),
            comments = removed_comments,
            "problem deleted"
        );
        Ok(())
    }

    /// Every problem, newest first.
    pub async fn list(&self) -> Result<Vec<ProblemView>> {
        let problems = self.problems.list_problems(None).await?;
        self.with_authors(problems).await
    }

    /// The requester's own problems, newest first.
    pub async fn list_mine(&self, requester: &Requester) -> Result<Vec<ProblemView>> {
        let problems = self.problems.list_problems(Some(requester.id)).await?;
        self.with_authors(problems).await
    }

    /// One problem with its author and comment thread.
    pub async fn get(&self, id: Uuid) -> Result<ProblemView> {
        let problem = self.find(id).await?;
        let authors = author_index(self.users.as_ref(), [problem.user_id]).await?;
        let thread = comment_threads(self.comments.as_ref(), &[problem.comments.as_slice()])
            .await?
            .pop()
            .unwrap_or_default();

        Ok(ProblemView {
            author: authors.get(&problem.user_id).cloned(),
            comment_thread: Some(thread),
            problem,
        })
    }

    pub async fn vote(
        &self,
        id: Uuid,
        requester: &Requester,
        direction: VoteDirection,
    ) -> Result<Problem> {
        self.problems
            .vote_problem(id, requester.id, direction)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))
    }

    pub async fn comment(&self, id: Uuid, requester: &Requester, text: &str) -> Result<Comment> {
        Validator::new()
            .required(text, "text", "Text is required")
            .finish()?;

        let comment = Comment::new(
            requester.id,
            CommentParent::Problem(id),
            text.trim().to_string(),
        );
        self.comments
            .attach_comment(comment)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))
    }

    async fn find(&self, id: Uuid) -> Result<Problem> {
        self.problems
            .find_problem(id)
            .await?
            .ok_or_else(|| DomainError::not_found(KIND, id))
    }

    async fn with_authors(&self, problems: Vec<Problem>) -> Result<Vec<ProblemView>> {
        let authors = author_index(self.users.as_ref(), problems.iter().map(|p| p.user_id)).await?;
        Ok(problems
            .into_iter()
            .map(|problem| ProblemView {
                author: authors.get(&problem.user_id).cloned(),
                comment_thread: None,
                problem,
            })
            .collect())
    }

    /// Best-effort removal of an asset the store no longer references.
    async fn discard(&self, asset: Option<&ImageAsset>) {
        if let Some(asset) = asset {
            if let Err(err) = self.media.delete(&asset.public_id).await {
                warn!(public_id = %asset.public_id, error = %err, "could not remove stale image");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use domains::models::{Role, Solution, User};
    use domains::ports::{MockMediaStorage, MockProblemRepo};
    use storage_adapters::InMemoryStore;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn png() -> Upload {
        Upload {
            bytes: Bytes::from_static(PNG),
            content_type: Some(mime::IMAGE_PNG),
            file_name: Some("hole.png".into()),
        }
    }

    fn asset(n: u32) -> ImageAsset {
        ImageAsset {
            url: format!("https://img.example/{n}.png"),
            public_id: format!("img-{n}"),
        }
    }

    fn service(store: &Arc<InMemoryStore>, media: MockMediaStorage) -> ProblemService {
        ProblemService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(media),
        )
    }

    async fn member(store: &InMemoryStore, name: &str, role: Role) -> Requester {
        let user = User::new(name.into(), format!("{name}@example.com"), "h".into(), role);
        let user = store.create_user(user).await.unwrap();
        Requester { id: user.id, role }
    }

    fn report(location: &str) -> NewProblem {
        NewProblem {
            location: location.into(),
            description: "Water main leaking".into(),
            image: None,
        }
    }

    #[tokio::test]
    async fn create_validates_text_fields() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(&store, MockMediaStorage::new());
        let alice = member(&store, "alice", Role::User).await;

        let err = svc
            .create(&alice, NewProblem::default())
            .await
            .unwrap_err();
        match err {
            DomainError::Validation(fields) => {
                let msgs: Vec<_> = fields.iter().map(|f| f.message.as_str()).collect();
                assert_eq!(msgs, ["Location is required", "Description is required"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_uploads_the_image() {
        let store = Arc::new(InMemoryStore::new());
        let mut media = MockMediaStorage::new();
        media.expect_upload().times(1).returning(|_| Ok(asset(1)));
        let svc = service(&store, media);
        let alice = member(&store, "alice", Role::User).await;

        let mut input = report("5th & Main");
        input.image = Some(png());
        let problem = svc.create(&alice, input).await.unwrap();
        assert_eq!(problem.image, Some(asset(1)));
        assert_eq!(problem.user_id, alice.id);
    }

    #[tokio::test]
    async fn non_images_never_reach_the_media_host() {
        let store = Arc::new(InMemoryStore::new());
        let mut media = MockMediaStorage::new();
        media.expect_upload().never();
        let svc = service(&store, media);
        let alice = member(&store, "alice", Role::User).await;

        let mut input = report("5th & Main");
        input.image = Some(Upload {
            bytes: Bytes::from_static(b"%PDF-1.7"),
            content_type: Some("application/pdf".parse().unwrap()),
            file_name: Some("doc.pdf".into()),
        });
        let err = svc.create(&alice, input).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref f) if f[0].field == "image"));
    }

    #[tokio::test]
    async fn stranger_cannot_delete_but_admin_can() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(&store, MockMediaStorage::new());
        let alice = member(&store, "alice", Role::User).await;
        let bob = member(&store, "bob", Role::User).await;
        let admin = member(&store, "root", Role::Admin).await;

        let problem = svc.create(&alice, report("Elm St")).await.unwrap();

        let err = svc.delete(problem.id, &bob).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(store.find_problem(problem.id).await.unwrap().is_some());

        svc.delete(problem.id, &admin).await.unwrap();
        assert!(store.find_problem(problem.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_problem_is_not_found_before_authorization() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(&store, MockMediaStorage::new());
        let bob = member(&store, "bob", Role::User).await;

        let err = svc.delete(Uuid::now_v7(), &bob).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "Problem", .. }));
    }

    #[tokio::test]
    async fn delete_cascades_to_solutions_comments_and_image() {
        let store = Arc::new(InMemoryStore::new());
        let mut media = MockMediaStorage::new();
        media.expect_upload().returning(|_| Ok(asset(7)));
        media
            .expect_delete()
            .withf(|id| id == "img-7")
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(&store, media);
        let alice = member(&store, "alice", Role::User).await;

        let mut input = report("Oak Ave");
        input.image = Some(png());
        let problem = svc.create(&alice, input).await.unwrap();
        let on_problem = svc.comment(problem.id, &alice, "seen it too").await.unwrap();

        let solution = store
            .create_solution(Solution::new(alice.id, problem.id, "patch it".into()))
            .await
            .unwrap();
        let on_solution = Comment::new(alice.id, CommentParent::Solution(solution.id), "+1".into());
        store.attach_comment(on_solution.clone()).await.unwrap().unwrap();

        svc.delete(problem.id, &alice).await.unwrap();

        assert!(store.find_solution(solution.id).await.unwrap().is_none());
        assert!(store
            .find_comments(&[on_problem.id, on_solution.id])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn media_failure_aborts_delete() {
        let store = Arc::new(InMemoryStore::new());
        let mut media = MockMediaStorage::new();
        media.expect_upload().returning(|_| Ok(asset(3)));
        media
            .expect_delete()
            .returning(|_| Err(anyhow::anyhow!("media host unavailable")));
        let svc = service(&store, media);
        let alice = member(&store, "alice", Role::User).await;

        let mut input = report("Birch Rd");
        input.image = Some(png());
        let problem = svc.create(&alice, input).await.unwrap();

        let err = svc.delete(problem.id, &alice).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
        assert!(store.find_problem(problem.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_replaces_image_and_discards_the_old_one() {
        let store = Arc::new(InMemoryStore::new());
        let mut media = MockMediaStorage::new();
        let mut seq = mockall::Sequence::new();
        media
            .expect_upload()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(asset(1)));
        media
            .expect_upload()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(asset(2)));
        media
            .expect_delete()
            .withf(|id| id == "img-1")
            .times(1)
            .returning(|_| Ok(()));
        let svc = service(&store, media);
        let alice = member(&store, "alice", Role::User).await;

        let mut input = report("Pine St");
        input.image = Some(png());
        let problem = svc.create(&alice, input).await.unwrap();

        let updated = svc
            .update(
                problem.id,
                &alice,
                ProblemChanges {
                    description: Some("Now flooding".into()),
                    image: Some(png()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.image, Some(asset(2)));
        assert_eq!(updated.description, "Now flooding");
        assert_eq!(updated.location, "Pine St");
    }

    #[tokio::test]
    async fn update_rejects_blank_fields() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(&store, MockMediaStorage::new());
        let alice = member(&store, "alice", Role::User).await;
        let problem = svc.create(&alice, report("Pine St")).await.unwrap();

        let err = svc
            .update(
                problem.id,
                &alice,
                ProblemChanges {
                    location: Some("   ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref f) if f[0].field == "location"));
    }

    #[tokio::test]
    async fn stranger_update_is_denied_without_touching_the_store() {
        let owner = Uuid::now_v7();
        let existing = Problem::new(owner, "Cedar Ln".into(), "Broken light".into(), None);
        let id = existing.id;

        let mut problems = MockProblemRepo::new();
        problems
            .expect_find_problem()
            .returning(move |_| Ok(Some(existing.clone())));
        problems.expect_update_problem().never();

        let store = Arc::new(InMemoryStore::new());
        let svc = ProblemService::new(
            Arc::new(problems),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MockMediaStorage::new()),
        );

        let stranger = Requester {
            id: Uuid::now_v7(),
            role: Role::User,
        };
        let err = svc
            .update(
                id,
                &stranger,
                ProblemChanges {
                    location: Some("elsewhere".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(ref m) if m == "Access denied"));
    }

    #[tokio::test]
    async fn listings_populate_authors_and_detail_adds_the_thread() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(&store, MockMediaStorage::new());
        let alice = member(&store, "alice", Role::User).await;
        let bob = member(&store, "bob", Role::User).await;

        let first = svc.create(&alice, report("First")).await.unwrap();
        let second = svc.create(&bob, report("Second")).await.unwrap();
        svc.comment(first.id, &bob, "one").await.unwrap();
        svc.comment(first.id, &alice, "two").await.unwrap();

        let all = svc.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].problem.id, second.id);
        assert_eq!(all[0].author.as_ref().unwrap().username, "bob");
        assert!(all[0].comment_thread.is_none());

        let mine = svc.list_mine(&alice).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].problem.id, first.id);

        let detail = svc.get(first.id).await.unwrap();
        let texts: Vec<_> = detail
            .comment_thread
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(detail.author.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn votes_toggle_and_flip() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(&store, MockMediaStorage::new());
        let alice = member(&store, "alice", Role::User).await;
        let bob = member(&store, "bob", Role::User).await;
        let problem = svc.create(&alice, report("Ash St")).await.unwrap();

        let p = svc.vote(problem.id, &bob, VoteDirection::Up).await.unwrap();
        assert!(p.ballots.upvotes.contains(bob.id));

        let p = svc.vote(problem.id, &bob, VoteDirection::Down).await.unwrap();
        assert!(!p.ballots.upvotes.contains(bob.id));
        assert!(p.ballots.downvotes.contains(bob.id));

        let p = svc.vote(problem.id, &bob, VoteDirection::Down).await.unwrap();
        assert!(p.ballots.downvotes.is_empty());

        let err = svc
            .vote(Uuid::now_v7(), &bob, VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn comment_on_missing_problem_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(&store, MockMediaStorage::new());
        let alice = member(&store, "alice", Role::User).await;

        let err = svc
            .comment(Uuid::now_v7(), &alice, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "Problem", .. }));

        let err = svc.comment(Uuid::now_v7(), &alice, " ").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
