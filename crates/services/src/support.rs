//! Helpers shared by the content services: author lookup, comment threads
//! and logged authorization.

use std::collections::HashMap;

use domains::errors::Result;
use domains::models::{Comment, Requester, UserSummary};
use domains::policy::{self, Owned};
use domains::ports::{CommentRepo, UserRepo};
use tracing::warn;
use uuid::Uuid;

/// `{id → summary}` for every distinct id in `ids`.
pub(crate) async fn author_index(
    users: &dyn UserRepo,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserSummary>> {
    let mut wanted: Vec<Uuid> = ids.into_iter().collect();
    wanted.sort_unstable();
    wanted.dedup();
    if wanted.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(users
        .find_users(&wanted)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect())
}

/// Loads every comment referenced by `lists` in one call, then splits them
/// back per list, preserving attachment order.
pub(crate) async fn comment_threads(
    comments: &dyn CommentRepo,
    lists: &[&[Uuid]],
) -> Result<Vec<Vec<Comment>>> {
    let all: Vec<Uuid> = lists.iter().flat_map(|ids| ids.iter().copied()).collect();
    let mut by_id: HashMap<Uuid, Comment> = if all.is_empty() {
        HashMap::new()
    } else {
        comments
            .find_comments(&all)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    Ok(lists
        .iter()
        .map(|ids| ids.iter().filter_map(|id| by_id.remove(id)).collect())
        .collect())
}

/// [`policy::authorize_record`] plus a warning line on denial.
pub(crate) fn authorize<R: Owned>(
    record: &R,
    requester: &Requester,
    action: &'static str,
) -> Result<()> {
    policy::authorize_record(record, requester).inspect_err(|_| {
        warn!(
            requester = %requester.id,
            owner = %record.owner_id(),
            action,
            "mutation denied"
        );
    })
}
