use miniblog_common::model::{
    ModelValidationError,
    post::{Post, PostContent},
    user::{Account, Email, Password, User, UserName},
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub email: String,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct AccountRecord {
    pub user_snowflake: i64,
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub content: String,
    pub author: String,
    pub author_snowflake: i64,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_snowflake.cast_unsigned().into(),
            email: Email::new(value.email)?,
            name: UserName::new(&value.name)?,
        })
    }
}

impl TryFrom<AccountRecord> for Account {
    type Error = ModelValidationError;

    fn try_from(value: AccountRecord) -> Result<Self, Self::Error> {
        let user = User::try_from(UserRecord {
            user_snowflake: value.user_snowflake,
            email: value.email,
            name: value.name,
        })?;

        Ok(Self {
            user,
            password: Password::new(value.password),
        })
    }
}

impl From<PostRecord> for Post {
    fn from(value: PostRecord) -> Self {
        Self {
            id: value.post_snowflake.cast_unsigned().into(),
            content: PostContent {
                title: value.title,
                content: value.content,
                author: value.author,
                image_url: value.image_url,
            },
            author_id: value.author_snowflake.cast_unsigned().into(),
            created_at: value.created_at,
        }
    }
}
