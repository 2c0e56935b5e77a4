//! # Vote Toggling
//!
//! Problems and solutions carry an up-set and a down-set of user ids.
//! A user sits in at most one of them: voting the same way twice withdraws
//! the vote, voting the other way flips it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which way a ballot is cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// What a toggle did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The user had no vote; one was added.
    Cast,
    /// The user repeated their vote; it was removed.
    Withdrawn,
    /// The user had voted the other way; the vote moved sides.
    Flipped,
}

/// Insertion-ordered, duplicate-free set of voter ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteSet(Vec<Uuid>);

impl VoteSet {
    pub fn contains(&self, user_id: Uuid) -> bool {
        self.0.contains(&user_id)
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, user_id: Uuid) -> bool {
        if self.contains(user_id) {
            return false;
        }
        self.0.push(user_id);
        true
    }

    /// Returns `false` if the id was absent.
    pub fn remove(&mut self, user_id: Uuid) -> bool {
        let before = self.0.len();
        self.0.retain(|id| *id != user_id);
        self.0.len() != before
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.0.iter()
    }
}

/// The pair of vote sets embedded in every votable record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballots {
    #[serde(default)]
    pub upvotes: VoteSet,
    #[serde(default)]
    pub downvotes: VoteSet,
}

impl Ballots {
    fn side_mut(&mut self, direction: VoteDirection) -> &mut VoteSet {
        match direction {
            VoteDirection::Up => &mut self.upvotes,
            VoteDirection::Down => &mut self.downvotes,
        }
    }

    /// Applies one vote request from `user_id`.
    pub fn toggle(&mut self, user_id: Uuid, direction: VoteDirection) -> VoteOutcome {
        if self.side_mut(direction).remove(user_id) {
            return VoteOutcome::Withdrawn;
        }
        self.side_mut(direction).insert(user_id);
        if self.side_mut(direction.opposite()).remove(user_id) {
            VoteOutcome::Flipped
        } else {
            VoteOutcome::Cast
        }
    }
}

/// Records that can be voted on.
pub trait Votable {
    fn ballots(&self) -> &Ballots;
    fn ballots_mut(&mut self) -> &mut Ballots;
}

/// Toggles `user_id`'s vote on `record`. Cannot fail.
pub fn toggle_vote<R: Votable + ?Sized>(
    record: &mut R,
    user_id: Uuid,
    direction: VoteDirection,
) -> VoteOutcome {
    record.ballots_mut().toggle(user_id, direction)
}
