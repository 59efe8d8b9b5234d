//! In-process store for tests and local development. Nothing survives a restart.

use crate::{
    client::{DbError, Result},
    store::{PostRepository, UserRepository},
};
use async_trait::async_trait;
use miniblog_common::{
    model::{
        Id, MiniblogSnowflakeGenerator,
        post::{CreatePost, PageWindow, Post, PostContent, PostFilter, PostMarker},
        user::{Account, CreateAccount, Email, User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
};
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    snowflake_generator: MiniblogSnowflakeGenerator,
    /// In insertion order.
    posts: Vec<Post>,
    accounts: Vec<Account>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                snowflake_generator: MiniblogSnowflakeGenerator::new(worker_id, process_id),
                ..MemoryState::default()
            }),
        }
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: &CreatePost) -> Result<Post> {
        let mut state = self.state.write().await;

        let post = Post {
            id: state.snowflake_generator.generate()?.into(),
            content: post.content.clone(),
            author_id: post.author_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(post.clone());

        Ok(post)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.state.read().await;

        Ok(state.posts.iter().find(|post| post.id == post_id).cloned())
    }

    async fn fetch_posts(&self, filter: &PostFilter, window: PageWindow) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        // Newest insertion first, so equal timestamps keep that order after the stable sort.
        let mut posts: Vec<&Post> = state
            .posts
            .iter()
            .rev()
            .filter(|post| filter.matches(post))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(posts
            .into_iter()
            .skip(to_usize(window.offset))
            .take(to_usize(window.limit))
            .cloned()
            .collect())
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        let state = self.state.read().await;

        let count = state.posts.iter().filter(|post| filter.matches(post)).count();
        Ok(count as u64)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let mut state = self.state.write().await;

        let Some(post) = state.posts.iter_mut().find(|post| post.id == post_id) else {
            return Ok(None);
        };
        post.content = content.clone();

        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut state = self.state.write().await;

        let before = state.posts.len();
        state.posts.retain(|post| post.id != post_id);

        Ok(state.posts.len() < before)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_account(&self, account: &CreateAccount) -> Result<Account> {
        let mut state = self.state.write().await;

        if state
            .accounts
            .iter()
            .any(|existing| existing.user.email == account.email)
        {
            return Err(DbError::UniqueViolation);
        }

        let account = Account {
            user: User {
                id: state.snowflake_generator.generate()?.into(),
                email: account.email.clone(),
                name: account.name.clone(),
            },
            password: account.password.clone(),
        };
        state.accounts.push(account.clone());

        Ok(account)
    }

    async fn fetch_account_by_email(&self, email: &Email) -> Result<Option<Account>> {
        let state = self.state.read().await;

        Ok(state
            .accounts
            .iter()
            .find(|account| &account.user.email == email)
            .cloned())
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let state = self.state.read().await;

        Ok(state
            .accounts
            .iter()
            .find(|account| account.user.id == user_id)
            .map(|account| account.user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::DbError,
        memory::MemoryStore,
        store::{PostRepository, UserRepository},
    };
    use miniblog_common::model::{
        Id,
        post::{AuthorFilter, CreatePost, PageWindow, PostContent, PostFilter},
        user::{CreateAccount, Email, Password, UserName},
    };

    fn create_post(title: &str, author: &str, author_id: u64) -> CreatePost {
        CreatePost {
            author_id: Id::from(author_id),
            content: PostContent {
                title: title.to_owned(),
                content: format!("{title} body"),
                author: author.to_owned(),
                image_url: None,
            },
        }
    }

    fn create_account(email: &str) -> CreateAccount {
        CreateAccount {
            email: Email::new(email.to_owned()).unwrap(),
            name: UserName::new("Ada").unwrap(),
            password: Password::new("secret1".to_owned()),
        }
    }

    #[tokio::test]
    async fn posts_come_back_newest_first() {
        let store = MemoryStore::default();
        for title in ["first", "second", "third"] {
            store.insert_post(&create_post(title, "Ada", 1)).await.unwrap();
        }

        let posts = store
            .fetch_posts(&PostFilter::default(), PageWindow::for_page(1, 10))
            .await
            .unwrap();
        let titles: Vec<_> = posts.iter().map(|post| post.content.title.as_str()).collect();

        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn window_skips_and_limits() {
        let store = MemoryStore::default();
        for index in 0..7 {
            store
                .insert_post(&create_post(&format!("post {index}"), "Ada", 1))
                .await
                .unwrap();
        }
        let filter = PostFilter::default();

        let second_page = store
            .fetch_posts(&filter, PageWindow::for_page(2, 3))
            .await
            .unwrap();
        let titles: Vec<_> = second_page
            .iter()
            .map(|post| post.content.title.as_str())
            .collect();
        assert_eq!(titles, ["post 3", "post 2", "post 1"]);

        let beyond = store
            .fetch_posts(&filter, PageWindow::for_page(4, 3))
            .await
            .unwrap();
        assert!(beyond.is_empty());
        assert_eq!(store.count_posts(&filter).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn filters_by_author_and_search() {
        let store = MemoryStore::default();
        store.insert_post(&create_post("Gardening", "Ada", 1)).await.unwrap();
        store.insert_post(&create_post("Cooking", "Grace", 2)).await.unwrap();
        store.insert_post(&create_post("Baking", "Ada", 1)).await.unwrap();

        let only_ada = PostFilter {
            search: None,
            author: AuthorFilter::Only(Id::from(1)),
        };
        assert_eq!(store.count_posts(&only_ada).await.unwrap(), 2);

        let not_ada = PostFilter {
            search: None,
            author: AuthorFilter::Excluding(Id::from(1)),
        };
        assert_eq!(store.count_posts(&not_ada).await.unwrap(), 1);

        let grace_by_name = PostFilter {
            search: Some("grace".to_owned()),
            author: AuthorFilter::Any,
        };
        let posts = store
            .fetch_posts(&grace_by_name, PageWindow::for_page(1, 5))
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].content.title, "Cooking");
    }

    #[tokio::test]
    async fn update_keeps_identity_fields() {
        let store = MemoryStore::default();
        let post = store.insert_post(&create_post("Old", "Ada", 1)).await.unwrap();

        let content = PostContent {
            title: "New".to_owned(),
            content: "New body".to_owned(),
            author: "Pen Name".to_owned(),
            image_url: Some("https://example.com/a.png".to_owned()),
        };
        let updated = store.update_post(post.id, &content).await.unwrap().unwrap();

        assert_eq!(updated.content, content);
        assert_eq!(updated.author_id, post.author_id);
        assert_eq!(updated.created_at, post.created_at);
        assert_eq!(store.fetch_post(post.id).await.unwrap(), Some(updated));

        assert_eq!(store.update_post(Id::from(1), &content).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_removal() {
        let store = MemoryStore::default();
        let post = store.insert_post(&create_post("Gone", "Ada", 1)).await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(!store.delete_post(post.id).await.unwrap());
        assert_eq!(store.fetch_post(post.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn emails_are_unique() {
        let store = MemoryStore::default();
        let account = store
            .insert_account(&create_account("ada@gmail.com"))
            .await
            .unwrap();

        assert!(matches!(
            store.insert_account(&create_account("ada@gmail.com")).await,
            Err(DbError::UniqueViolation)
        ));

        let found = store
            .fetch_account_by_email(&account.user.email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, account);
        assert_eq!(
            store.fetch_user(account.user.id).await.unwrap(),
            Some(account.user)
        );
    }
}
