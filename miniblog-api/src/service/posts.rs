use axum::http::StatusCode;
use miniblog_common::model::{
    Id,
    auth::{AuthorizationCheck, CallerIdentity},
    post::{
        CreatePost, PageWindow, Post, PostDraft, PostEdit, PostListParams, PostMarker, PostPage,
        PostRemoval, PostValidationError,
    },
};
use miniblog_db::{DbError, PostRepository};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum PostAction {
    Edit,
    Delete,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Validation(#[from] PostValidationError),
    #[error("Post with id {0} was not found.")]
    NotFound(Id<PostMarker>),
    #[error("Caller {caller} may not {action:?} post {post_id}")]
    Forbidden {
        post_id: Id<PostMarker>,
        caller: String,
        action: PostAction,
    },
    #[error(transparent)]
    Database(#[from] DbError),
}

impl PostError {
    pub fn status(&self) -> StatusCode {
        match self {
            PostError::Validation(_) => StatusCode::BAD_REQUEST,
            PostError::NotFound(_) => StatusCode::NOT_FOUND,
            PostError::Forbidden { .. } => StatusCode::FORBIDDEN,
            PostError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the caller gets to see.
    pub fn message(&self) -> String {
        match self {
            PostError::Validation(err) => err.to_string(),
            PostError::NotFound(_) => "Post not found".to_owned(),
            PostError::Forbidden {
                action: PostAction::Edit,
                ..
            } => "You can only edit your own posts".to_owned(),
            PostError::Forbidden {
                action: PostAction::Delete,
                ..
            } => "You can only delete your own posts".to_owned(),
            PostError::Database(_) => "Server Error".to_owned(),
        }
    }
}

/// Listing, creating, editing and deleting posts.
#[derive(Clone, Debug)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    authorization: Arc<dyn AuthorizationCheck>,
}

impl PostService {
    #[must_use]
    pub fn new(posts: Arc<dyn PostRepository>, authorization: Arc<dyn AuthorizationCheck>) -> Self {
        Self {
            posts,
            authorization,
        }
    }

    pub async fn list(&self, params: &PostListParams) -> Result<PostPage, PostError> {
        let listing = params.resolve();

        let Some(filter) = listing.filter else {
            debug!(?params, "Author filter cannot match, returning an empty page");
            return Ok(PostPage {
                posts: Vec::new(),
                total_pages: 0,
                current_page: listing.page,
            });
        };

        let window = PageWindow::for_page(listing.page, listing.limit);
        let (posts, count) = tokio::try_join!(
            self.posts.fetch_posts(&filter, window),
            self.posts.count_posts(&filter),
        )?;

        Ok(PostPage {
            posts,
            total_pages: count.div_ceil(listing.limit),
            current_page: listing.page,
        })
    }

    pub async fn get(&self, post_id: Id<PostMarker>) -> Result<Post, PostError> {
        self.posts
            .fetch_post(post_id)
            .await?
            .ok_or(PostError::NotFound(post_id))
    }

    pub async fn create(&self, draft: PostDraft) -> Result<Post, PostError> {
        let post = CreatePost::try_from(draft)?;
        let post = self.posts.insert_post(&post).await?;

        info!(post_id = %post.id, author_id = %post.author_id, "Created post");
        Ok(post)
    }

    pub async fn update(&self, post_id: Id<PostMarker>, edit: PostEdit) -> Result<Post, PostError> {
        let (content, caller) = edit.validate()?;
        self.authorize(post_id, &caller, PostAction::Edit).await?;

        let post = self
            .posts
            .update_post(post_id, &content)
            .await?
            .ok_or(PostError::NotFound(post_id))?;

        info!(%post_id, "Updated post");
        Ok(post)
    }

    pub async fn delete(
        &self,
        post_id: Id<PostMarker>,
        removal: PostRemoval,
    ) -> Result<(), PostError> {
        let caller = removal.validate()?;
        self.authorize(post_id, &caller, PostAction::Delete).await?;

        if !self.posts.delete_post(post_id).await? {
            return Err(PostError::NotFound(post_id));
        }

        info!(%post_id, "Deleted post");
        Ok(())
    }

    async fn authorize(
        &self,
        post_id: Id<PostMarker>,
        caller: &CallerIdentity,
        action: PostAction,
    ) -> Result<(), PostError> {
        let post = self.get(post_id).await?;

        if !self.authorization.may_modify(&post, caller) {
            warn!(%post_id, caller = caller.get(), ?action, "Rejected change by non-author");
            return Err(PostError::Forbidden {
                post_id,
                caller: caller.get().to_owned(),
                action,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::service::posts::{PostAction, PostError, PostService};
    use miniblog_common::model::{
        Id,
        auth::ClaimedIdentity,
        post::{Post, PostDraft, PostEdit, PostListParams, PostRemoval, PostValidationError},
        user::UserMarker,
    };
    use miniblog_db::MemoryStore;
    use std::sync::Arc;

    const ALICE: u64 = 101;
    const BOB: u64 = 202;

    fn service() -> PostService {
        PostService::new(Arc::new(MemoryStore::default()), Arc::new(ClaimedIdentity))
    }

    fn draft(title: &str, author: &str, author_id: u64) -> PostDraft {
        PostDraft {
            title: Some(title.to_owned()),
            content: Some(format!("All about {title}")),
            author: Some(author.to_owned()),
            author_id: Some(author_id.to_string()),
            image_url: None,
        }
    }

    fn edit(title: &str, caller: u64) -> PostEdit {
        PostEdit {
            title: Some(title.to_owned()),
            content: Some("Edited".to_owned()),
            author: Some("Pen Name".to_owned()),
            user_id: Some(caller.to_string()),
            image_url: Some("https://example.com/cover.png".to_owned()),
        }
    }

    fn removal(caller: u64) -> PostRemoval {
        PostRemoval {
            user_id: Some(caller.to_string()),
        }
    }

    fn listing(pairs: &[(&str, &str)]) -> PostListParams {
        let mut params = PostListParams::default();
        for (key, value) in pairs {
            let value = Some((*value).to_owned());
            match *key {
                "page" => params.page = value,
                "limit" => params.limit = value,
                "search" => params.search = value,
                "authorId" => params.author_id = value,
                "excludeAuthorId" => params.exclude_author_id = value,
                _ => panic!("unknown key {key}"),
            }
        }
        params
    }

    fn titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|post| post.content.title.as_str()).collect()
    }

    #[tokio::test]
    async fn created_post_round_trips() {
        let service = service();

        let created = service.create(draft("Hello", "Alice", ALICE)).await.unwrap();
        let fetched = service.get(created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.content.title, "Hello");
        assert_eq!(fetched.content.content, "All about Hello");
        assert_eq!(fetched.content.author, "Alice");
        assert_eq!(fetched.author_id, Id::<UserMarker>::from(ALICE));
        assert_eq!(fetched.content.image_url, None);
    }

    #[tokio::test]
    async fn create_requires_all_fields() {
        let service = service();

        for broken in [
            PostDraft {
                title: None,
                ..draft("x", "Alice", ALICE)
            },
            PostDraft {
                content: Some(String::new()),
                ..draft("x", "Alice", ALICE)
            },
            PostDraft {
                author: None,
                ..draft("x", "Alice", ALICE)
            },
            PostDraft {
                author_id: None,
                ..draft("x", "Alice", ALICE)
            },
        ] {
            let err = service.create(broken).await.unwrap_err();
            assert!(matches!(
                err,
                PostError::Validation(PostValidationError::MissingCreateFields)
            ));
        }
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let service = service();

        assert!(matches!(
            service.get(Id::from(5)).await,
            Err(PostError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn pages_respect_limit_and_total() {
        let service = service();
        for index in 0..7 {
            service
                .create(draft(&format!("post {index}"), "Alice", ALICE))
                .await
                .unwrap();
        }

        let first = service.list(&listing(&[("limit", "3")])).await.unwrap();
        assert_eq!(titles(&first.posts), ["post 6", "post 5", "post 4"]);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.current_page, 1);

        let last = service
            .list(&listing(&[("page", "3"), ("limit", "3")]))
            .await
            .unwrap();
        assert_eq!(titles(&last.posts), ["post 0"]);

        let beyond = service
            .list(&listing(&[("page", "9"), ("limit", "3")]))
            .await
            .unwrap();
        assert!(beyond.posts.is_empty());
        assert_eq!(beyond.total_pages, 3);
        assert_eq!(beyond.current_page, 9);
    }

    #[tokio::test]
    async fn default_page_size_is_five() {
        let service = service();
        for index in 0..6 {
            service
                .create(draft(&format!("post {index}"), "Alice", ALICE))
                .await
                .unwrap();
        }

        let page = service
            .list(&listing(&[("page", "zero"), ("limit", "-3")]))
            .await
            .unwrap();
        assert_eq!(page.posts.len(), 5);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.current_page, 1);
    }

    #[tokio::test]
    async fn author_filters() {
        let service = service();
        service.create(draft("A", "Alice", ALICE)).await.unwrap();
        service.create(draft("B", "Bob", BOB)).await.unwrap();

        let alice = ALICE.to_string();
        let bob = BOB.to_string();

        let others = service
            .list(&listing(&[("excludeAuthorId", alice.as_str())]))
            .await
            .unwrap();
        assert_eq!(titles(&others.posts), ["B"]);
        assert_eq!(others.total_pages, 1);

        let own = service
            .list(&listing(&[("authorId", alice.as_str()), ("excludeAuthorId", alice.as_str())]))
            .await
            .unwrap();
        assert_eq!(titles(&own.posts), ["A"]);

        let bobs = service.list(&listing(&[("authorId", bob.as_str())])).await.unwrap();
        assert_eq!(titles(&bobs.posts), ["B"]);

        let nobody = service
            .list(&listing(&[("authorId", "not-an-id")]))
            .await
            .unwrap();
        assert!(nobody.posts.is_empty());
        assert_eq!(nobody.total_pages, 0);
    }

    #[tokio::test]
    async fn search_covers_author_names() {
        let service = service();
        service
            .create(draft("Sourdough basics", "Alice", ALICE))
            .await
            .unwrap();
        service.create(draft("Trail running", "Bob", BOB)).await.unwrap();

        let by_author = service.list(&listing(&[("search", "bOB")])).await.unwrap();
        assert_eq!(titles(&by_author.posts), ["Trail running"]);
        assert_eq!(by_author.total_pages, 1);

        let by_title = service.list(&listing(&[("search", "dough")])).await.unwrap();
        assert_eq!(titles(&by_title.posts), ["Sourdough basics"]);

        let nothing = service.list(&listing(&[("search", "kayak")])).await.unwrap();
        assert!(nothing.posts.is_empty());
        assert_eq!(nothing.total_pages, 0);
    }

    #[tokio::test]
    async fn owner_update_is_idempotent() {
        let service = service();
        let post = service.create(draft("Draft", "Alice", ALICE)).await.unwrap();

        let once = service.update(post.id, edit("Final", ALICE)).await.unwrap();
        let twice = service.update(post.id, edit("Final", ALICE)).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.content.title, "Final");
        assert_eq!(twice.content.author, "Pen Name");
        assert_eq!(twice.author_id, post.author_id);
        assert_eq!(twice.created_at, post.created_at);
    }

    #[tokio::test]
    async fn update_without_image_clears_it() {
        let service = service();
        let post = service.create(draft("Draft", "Alice", ALICE)).await.unwrap();
        service.update(post.id, edit("With image", ALICE)).await.unwrap();

        let without_image = PostEdit {
            image_url: None,
            ..edit("Without image", ALICE)
        };
        let updated = service.update(post.id, without_image).await.unwrap();

        assert_eq!(updated.content.image_url, None);
    }

    #[tokio::test]
    async fn non_owner_cannot_change_post() {
        let service = service();
        let post = service.create(draft("Mine", "Alice", ALICE)).await.unwrap();

        let err = service.update(post.id, edit("Hijacked", BOB)).await.unwrap_err();
        assert!(matches!(
            err,
            PostError::Forbidden {
                action: PostAction::Edit,
                ..
            }
        ));

        let err = service.delete(post.id, removal(BOB)).await.unwrap_err();
        assert!(matches!(
            err,
            PostError::Forbidden {
                action: PostAction::Delete,
                ..
            }
        ));

        let malformed = PostRemoval {
            user_id: Some("alice".to_owned()),
        };
        assert!(matches!(
            service.delete(post.id, malformed).await,
            Err(PostError::Forbidden { .. })
        ));

        assert_eq!(service.get(post.id).await.unwrap(), post);
    }

    #[tokio::test]
    async fn validation_comes_before_lookup() {
        let service = service();

        let incomplete = PostEdit {
            user_id: None,
            ..edit("x", ALICE)
        };
        assert!(matches!(
            service.update(Id::from(1), incomplete).await,
            Err(PostError::Validation(PostValidationError::MissingUpdateFields))
        ));

        assert!(matches!(
            service.delete(Id::from(1), PostRemoval::default()).await,
            Err(PostError::Validation(PostValidationError::MissingCaller))
        ));

        assert!(matches!(
            service.update(Id::from(1), edit("x", ALICE)).await,
            Err(PostError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(Id::from(1), removal(ALICE)).await,
            Err(PostError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn owner_can_delete() {
        let service = service();
        let post = service.create(draft("Short lived", "Alice", ALICE)).await.unwrap();

        service.delete(post.id, removal(ALICE)).await.unwrap();

        assert!(matches!(
            service.get(post.id).await,
            Err(PostError::NotFound(_))
        ));
    }
}
