//! Deciding who may change a post.
//!
//! Requests state which user they act for in their body; nothing binds that
//! claim to a credential. Anyone who knows a user's id can act as that user.
//! The decision sits behind [`AuthorizationCheck`] so a session-derived
//! identity can replace [`ClaimedIdentity`] without touching the services.

use crate::model::{Id, post::Post, user::UserMarker};
use std::fmt::Debug;

/// The user id a request claims to act for, exactly as it was sent.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// `None` if the claim is missing or empty.
    #[must_use]
    pub fn new(claim: Option<String>) -> Option<Self> {
        claim.filter(|claim| !claim.is_empty()).map(Self)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl From<Id<UserMarker>> for CallerIdentity {
    fn from(value: Id<UserMarker>) -> Self {
        Self(value.to_string())
    }
}

pub trait AuthorizationCheck: Debug + Send + Sync {
    /// Whether `caller` may edit or delete `post`.
    fn may_modify(&self, post: &Post, caller: &CallerIdentity) -> bool;
}

/// Trusts the caller's claim and compares it with the post's author.
///
/// The claim must be spelled exactly as the author id is serialized, so `"+12"`
/// or `"012"` do not stand in for author `12`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ClaimedIdentity;

impl AuthorizationCheck for ClaimedIdentity {
    fn may_modify(&self, post: &Post, caller: &CallerIdentity) -> bool {
        caller.get() == post.author_id.to_string()
    }
}
