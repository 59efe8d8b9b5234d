use axum::http::StatusCode;
use miniblog_common::model::{
    Id,
    user::{CreateAccount, Email, LoginRequest, Password, User, UserMarker, UserName},
};
use miniblog_db::{DbError, UserRepository};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Only Gmail addresses are allowed")]
    InvalidEmail,
    #[error("Name is required for new users")]
    MissingName,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error(transparent)]
    Database(#[from] DbError),
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::InvalidEmail
            | AccountError::MissingName
            | AccountError::PasswordTooShort
            | AccountError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AccountError::InvalidPassword => StatusCode::UNAUTHORIZED,
            AccountError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            AccountError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AccountError::UserByIdNotFound(_) => "User not found".to_owned(),
            AccountError::Database(_) => "Server error".to_owned(),
            other => other.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Login {
    Existing(User),
    Registered(User),
}

impl Login {
    #[must_use]
    pub fn into_user(self) -> User {
        match self {
            Login::Existing(user) | Login::Registered(user) => user,
        }
    }
}

/// Login-or-register and profile lookups.
#[derive(Clone, Debug)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Logs into the account for `email`, creating it first if it does not exist.
    pub async fn login(&self, request: LoginRequest) -> Result<Login, AccountError> {
        let email = Email::new(request.email.unwrap_or_default())
            .map_err(|_| AccountError::InvalidEmail)?;
        let password = Password::new(request.password.unwrap_or_default());

        if let Some(account) = self.users.fetch_account_by_email(&email).await? {
            return if account.password == password {
                info!(user_id = %account.user.id, "Logged in");
                Ok(Login::Existing(account.user))
            } else {
                Err(AccountError::InvalidPassword)
            };
        }

        let name = request
            .name
            .as_deref()
            .and_then(|name| UserName::new(name).ok())
            .ok_or(AccountError::MissingName)?;
        if !password.is_long_enough() {
            return Err(AccountError::PasswordTooShort);
        }

        let account = CreateAccount {
            email,
            name,
            password,
        };
        let account = self
            .users
            .insert_account(&account)
            .await
            .map_err(|err| match err {
                DbError::UniqueViolation => AccountError::DuplicateEmail,
                err => AccountError::Database(err),
            })?;

        info!(user_id = %account.user.id, "Registered account");
        Ok(Login::Registered(account.user))
    }

    pub async fn profile(&self, user_id: Id<UserMarker>) -> Result<User, AccountError> {
        self.users
            .fetch_user(user_id)
            .await?
            .ok_or(AccountError::UserByIdNotFound(user_id))
    }
}
