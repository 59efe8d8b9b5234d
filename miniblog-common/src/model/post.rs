use crate::model::{
    Id,
    auth::CallerIdentity,
    user::UserMarker,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_LIMIT: u64 = 5;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", alias = "id")]
    pub id: Id<PostMarker>,
    #[serde(flatten)]
    pub content: PostContent,
    pub author_id: Id<UserMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The part of a post its owner may change.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostContent {
    pub title: String,
    pub content: String,
    /// Display name, chosen by the caller and not tied to the account name.
    pub author: String,
    pub image_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CreatePost {
    pub author_id: Id<UserMarker>,
    pub content: PostContent,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub enum AuthorFilter {
    #[default]
    Any,
    Only(Id<UserMarker>),
    Excluding(Id<UserMarker>),
}

impl AuthorFilter {
    #[must_use]
    pub fn matches(self, author_id: Id<UserMarker>) -> bool {
        match self {
            AuthorFilter::Any => true,
            AuthorFilter::Only(id) => author_id == id,
            AuthorFilter::Excluding(id) => author_id != id,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostFilter {
    /// Case-insensitive substring of either the title or the author.
    pub search: Option<String>,
    pub author: AuthorFilter,
}

impl PostFilter {
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        if !self.author.matches(post.author_id) {
            return false;
        }

        self.search.as_deref().is_none_or(|search| {
            let search = search.to_lowercase();
            post.content.title.to_lowercase().contains(&search)
                || post.content.author.to_lowercase().contains(&search)
        })
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// `page` and `limit` are both at least 1.
    #[must_use]
    pub fn for_page(page: u64, limit: u64) -> Self {
        Self {
            offset: (page - 1).saturating_mul(limit),
            limit,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_pages: u64,
    pub current_page: u64,
}

/// Listing parameters as they arrive in the query string.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub author_id: Option<String>,
    pub exclude_author_id: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostListing {
    pub page: u64,
    pub limit: u64,
    /// `None` when nothing can match, such as for a malformed author id or a
    /// search term containing NUL, which no stored post can contain.
    pub filter: Option<PostFilter>,
}

impl PostListParams {
    #[must_use]
    pub fn resolve(&self) -> PostListing {
        let page = self
            .page
            .as_deref()
            .and_then(parse_positive_int)
            .unwrap_or(DEFAULT_PAGE);
        let limit = self
            .limit
            .as_deref()
            .and_then(parse_positive_int)
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        let search = self.search.clone().filter(|search| !search.is_empty());

        let author = match (
            non_empty(self.author_id.as_deref()),
            non_empty(self.exclude_author_id.as_deref()),
        ) {
            (Some(author_id), _) => match author_id.parse() {
                Ok(id) => Some(AuthorFilter::Only(id)),
                Err(_) => None,
            },
            (None, Some(excluded)) => Some(
                excluded
                    .parse()
                    .map_or(AuthorFilter::Any, AuthorFilter::Excluding),
            ),
            (None, None) => Some(AuthorFilter::Any),
        };

        let filter = author
            .filter(|_| !search.as_deref().is_some_and(|search| search.contains('\0')))
            .map(|author| PostFilter { search, author });

        PostListing {
            page,
            limit,
            filter,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Reads the leading integer of `input` the lenient way browsers parse numbers
/// out of query strings: leading whitespace and a sign are allowed and anything
/// after the digits is ignored. Returns `None` unless the result is positive.
#[must_use]
pub fn parse_positive_int(input: &str) -> Option<u64> {
    let input = input.trim_start();
    let (negative, digits) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let digits_len = digits.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let value = digits[..digits_len].bytes().fold(0u64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(u64::from(digit - b'0'))
    });

    (!negative && value > 0).then_some(value)
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum PostValidationError {
    #[error("Please enter all fields including authorId")]
    MissingCreateFields,
    #[error("Please enter all fields including userId")]
    MissingUpdateFields,
    #[error("User ID is required")]
    MissingCaller,
    #[error("authorId is not a valid user id")]
    MalformedAuthorId,
    #[error("Post fields may not contain NUL characters")]
    NulCharacter,
}

/// Body of a post creation request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub author_id: Option<String>,
    pub image_url: Option<String>,
}

/// Body of a post update request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEdit {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub user_id: Option<String>,
    pub image_url: Option<String>,
}

/// Body of a post deletion request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRemoval {
    pub user_id: Option<String>,
}

impl PostContent {
    /// Builds the content from raw request fields. Title, author and image URL
    /// are trimmed; an empty image URL becomes `None`. Returns `None` if any
    /// required field ends up empty.
    #[must_use]
    pub fn from_fields(
        title: Option<&str>,
        content: Option<&str>,
        author: Option<&str>,
        image_url: Option<&str>,
    ) -> Option<Self> {
        let title = title.map(str::trim).filter(|title| !title.is_empty())?;
        let content = content.filter(|content| !content.is_empty())?;
        let author = author.map(str::trim).filter(|author| !author.is_empty())?;
        let image_url = image_url
            .map(str::trim)
            .filter(|image_url| !image_url.is_empty());

        Some(Self {
            title: title.to_owned(),
            content: content.to_owned(),
            author: author.to_owned(),
            image_url: image_url.map(str::to_owned),
        })
    }

    /// Text columns cannot store NUL, so such content is refused up front.
    fn reject_nul(self) -> Result<Self, PostValidationError> {
        let fields = [
            Some(self.title.as_str()),
            Some(self.content.as_str()),
            Some(self.author.as_str()),
            self.image_url.as_deref(),
        ];

        if fields.into_iter().flatten().any(|field| field.contains('\0')) {
            Err(PostValidationError::NulCharacter)
        } else {
            Ok(self)
        }
    }
}

impl TryFrom<PostDraft> for CreatePost {
    type Error = PostValidationError;

    fn try_from(draft: PostDraft) -> Result<Self, Self::Error> {
        let content = PostContent::from_fields(
            draft.title.as_deref(),
            draft.content.as_deref(),
            draft.author.as_deref(),
            draft.image_url.as_deref(),
        )
        .ok_or(PostValidationError::MissingCreateFields)?
        .reject_nul()?;

        let author_id = non_empty(draft.author_id.as_deref())
            .ok_or(PostValidationError::MissingCreateFields)?
            .parse()
            .map_err(|_| PostValidationError::MalformedAuthorId)?;

        Ok(Self { author_id, content })
    }
}

impl PostEdit {
    pub fn validate(self) -> Result<(PostContent, CallerIdentity), PostValidationError> {
        let content = PostContent::from_fields(
            self.title.as_deref(),
            self.content.as_deref(),
            self.author.as_deref(),
            self.image_url.as_deref(),
        )
        .ok_or(PostValidationError::MissingUpdateFields)?
        .reject_nul()?;
        let caller =
            CallerIdentity::new(self.user_id).ok_or(PostValidationError::MissingUpdateFields)?;

        Ok((content, caller))
    }
}

impl PostRemoval {
    pub fn validate(self) -> Result<CallerIdentity, PostValidationError> {
        CallerIdentity::new(self.user_id).ok_or(PostValidationError::MissingCaller)
    }
}
