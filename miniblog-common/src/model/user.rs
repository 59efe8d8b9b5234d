use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const EMAIL_DOMAIN: &str = "@gmail.com";
pub const PASSWORD_MIN_LEN: usize = 6;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// The public view of an account. Never carries the password.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub email: Email,
    pub name: UserName,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Account {
    pub user: User,
    pub password: Password,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateAccount {
    pub email: Email,
    pub name: UserName,
    pub password: Password,
}

/// An address of the form `local@gmail.com` where the local part is non-empty
/// and contains neither whitespace nor `@`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Only Gmail addresses are allowed: {0}")]
pub struct InvalidEmailError(String);

impl Email {
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let valid = email.strip_suffix(EMAIL_DOMAIN).is_some_and(|local| {
            !local.is_empty() && !local.chars().any(|c| c == '@' || c.is_whitespace())
        });

        if valid {
            Ok(Self(email))
        } else {
            Err(InvalidEmailError(email))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user name is empty")]
pub struct InvalidUserNameError;

impl UserName {
    /// Trims surrounding whitespace and rejects names that end up empty.
    pub fn new(name: &str) -> Result<Self, InvalidUserNameError> {
        let name = name.trim();
        if name.is_empty() {
            Err(InvalidUserNameError)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for UserName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserName::new(&inner)
            .map_err(|_| Error::invalid_value(Unexpected::Str(&inner), &"UserName"))
    }
}

/// Stored and compared verbatim.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(password: String) -> Self {
        Self(password)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    /// The minimum length counts characters, not bytes.
    #[must_use]
    pub fn is_long_enough(&self) -> bool {
        self.0.chars().count() >= PASSWORD_MIN_LEN
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}

/// Body of a login request. `name` is only needed when the email is new.
#[derive(Clone, Eq, PartialEq, Default, Hash, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl Debug for LoginRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .field("name", &self.name)
            .finish()
    }
}
