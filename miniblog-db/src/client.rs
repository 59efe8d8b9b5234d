use crate::{
    record::{AccountRecord, PostRecord, UserRecord},
    store::{PostRepository, UserRepository},
};
use async_trait::async_trait;
use miniblog_common::{
    model::{
        Id, MiniblogSnowflake, MiniblogSnowflakeGenerator, ModelValidationError,
        post::{AuthorFilter, CreatePost, PageWindow, Post, PostContent, PostFilter, PostMarker},
        user::{Account, CreateAccount, Email, User, UserMarker},
    },
    snowflake::{ProcessId, SnowflakeTimestampError, WorkerId},
};
use sqlx::{PgPool, migrate::MigrateError, postgres::PgPoolOptions, query, query_as, query_scalar};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    IdGeneration(#[from] SnowflakeTimestampError),
    #[error("A unique constraint was violated")]
    UniqueViolation,
    #[error("Migrating the database failed: {0}")]
    Migrate(#[from] MigrateError),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::Database(err) if err.is_unique_violation() => DbError::UniqueViolation,
            _ => DbError::Sqlx(value),
        }
    }
}

/// PostgreSQL backed store.
#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<MiniblogSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(MiniblogSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Waits for checked out connections to be returned, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn next_snowflake(&self) -> Result<MiniblogSnowflake> {
        Ok(self.snowflake_generator.lock().await.generate()?)
    }
}

fn author_bounds(author: AuthorFilter) -> (Option<i64>, Option<i64>) {
    let raw = |id: Id<UserMarker>| id.snowflake().get().cast_signed();

    match author {
        AuthorFilter::Any => (None, None),
        AuthorFilter::Only(id) => (Some(raw(id)), None),
        AuthorFilter::Excluding(id) => (None, Some(raw(id))),
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl PostRepository for DbClient {
    async fn insert_post(&self, post: &CreatePost) -> Result<Post> {
        let post_snowflake = self.next_snowflake().await?;

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts
                (post_snowflake, title, content, author, author_snowflake, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                post_snowflake, title, content, author, author_snowflake, image_url, created_at
            ",
        )
        .bind(post_snowflake.get().cast_signed())
        .bind(&post.content.title)
        .bind(&post.content.content)
        .bind(&post.content.author)
        .bind(post.author_id.snowflake().get().cast_signed())
        .bind(post.content.image_url.as_deref())
        .fetch_one(&self.pool)
        .await?;

        debug!(post_id = record.post_snowflake, "Inserted post");
        Ok(record.into())
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                post_snowflake, title, content, author, author_snowflake, image_url, created_at
            FROM
                posts.posts
            WHERE
                post_snowflake = $1
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    async fn fetch_posts(&self, filter: &PostFilter, window: PageWindow) -> Result<Vec<Post>> {
        let (only_author, excluded_author) = author_bounds(filter.author);

        let records = query_as::<_, PostRecord>(
            "
            SELECT
                post_snowflake, title, content, author, author_snowflake, image_url, created_at
            FROM
                posts.posts
            WHERE
                ($1::text IS NULL
                    OR strpos(lower(title), lower($1)) > 0
                    OR strpos(lower(author), lower($1)) > 0)
                AND ($2::bigint IS NULL OR author_snowflake = $2)
                AND ($3::bigint IS NULL OR author_snowflake <> $3)
            ORDER BY
                created_at DESC, post_snowflake DESC
            LIMIT $4 OFFSET $5
            ",
        )
        .bind(filter.search.as_deref())
        .bind(only_author)
        .bind(excluded_author)
        .bind(saturating_i64(window.limit))
        .bind(saturating_i64(window.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Post::from).collect())
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        let (only_author, excluded_author) = author_bounds(filter.author);

        let count = query_scalar::<_, i64>(
            "
            SELECT
                COUNT(*)
            FROM
                posts.posts
            WHERE
                ($1::text IS NULL
                    OR strpos(lower(title), lower($1)) > 0
                    OR strpos(lower(author), lower($1)) > 0)
                AND ($2::bigint IS NULL OR author_snowflake = $2)
                AND ($3::bigint IS NULL OR author_snowflake <> $3)
            ",
        )
        .bind(filter.search.as_deref())
        .bind(only_author)
        .bind(excluded_author)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.cast_unsigned())
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            UPDATE posts.posts
            SET
                title = $2, content = $3, author = $4, image_url = $5
            WHERE
                post_snowflake = $1
            RETURNING
                post_snowflake, title, content, author, author_snowflake, image_url, created_at
            ",
        )
        .bind(post_id.snowflake().get().cast_signed())
        .bind(&content.title)
        .bind(&content.content)
        .bind(&content.author)
        .bind(content.image_url.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::from))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for DbClient {
    async fn insert_account(&self, account: &CreateAccount) -> Result<Account> {
        let user_snowflake = self.next_snowflake().await?;

        let record = query_as::<_, AccountRecord>(
            "
            INSERT INTO users.users (user_snowflake, email, name, password)
            VALUES ($1, $2, $3, $4)
            RETURNING user_snowflake, email, name, password
            ",
        )
        .bind(user_snowflake.get().cast_signed())
        .bind(account.email.get())
        .bind(account.name.get())
        .bind(account.password.get())
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = record.user_snowflake, "Inserted account");
        Ok(Account::try_from(record)?)
    }

    async fn fetch_account_by_email(&self, email: &Email) -> Result<Option<Account>> {
        let record = query_as::<_, AccountRecord>(
            "
            SELECT
                user_snowflake, email, name, password
            FROM
                users.users
            WHERE
                email = $1
            ",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        let account = record.map(Account::try_from).transpose()?;
        Ok(account)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                user_snowflake, email, name
            FROM
                users.users
            WHERE
                user_snowflake = $1
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{author_bounds, saturating_i64};
    use miniblog_common::model::{Id, post::AuthorFilter};

    #[test]
    fn author_filter_binds() {
        assert_eq!(author_bounds(AuthorFilter::Any), (None, None));
        assert_eq!(author_bounds(AuthorFilter::Only(Id::from(4))), (Some(4), None));
        assert_eq!(
            author_bounds(AuthorFilter::Excluding(Id::from(4))),
            (None, Some(4))
        );
    }

    #[test]
    fn window_values_saturate() {
        assert_eq!(saturating_i64(10), 10);
        assert_eq!(saturating_i64(u64::MAX), i64::MAX);
    }
}
