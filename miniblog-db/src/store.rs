//! The narrow interface the services use to reach the document store.

use crate::client::Result;
use async_trait::async_trait;
use miniblog_common::model::{
    Id,
    post::{CreatePost, PageWindow, Post, PostContent, PostFilter, PostMarker},
    user::{Account, CreateAccount, Email, User, UserMarker},
};
use std::fmt::Debug;

#[async_trait]
pub trait PostRepository: Debug + Send + Sync {
    /// Stores a new post, assigning its id and creation time.
    async fn insert_post(&self, post: &CreatePost) -> Result<Post>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// Matching posts, newest first, restricted to `window`.
    async fn fetch_posts(&self, filter: &PostFilter, window: PageWindow) -> Result<Vec<Post>>;

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64>;

    /// Replaces the editable content. `None` if the post does not exist.
    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>>;

    /// Whether a post was removed.
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository: Debug + Send + Sync {
    /// Fails with [`DbError::UniqueViolation`](crate::DbError::UniqueViolation)
    /// if the email is taken.
    async fn insert_account(&self, account: &CreateAccount) -> Result<Account>;

    async fn fetch_account_by_email(&self, email: &Email) -> Result<Option<Account>>;

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;
}
