pub mod accounts;
pub mod posts;

pub use accounts::{AccountError, AccountService, Login};
pub use posts::{PostError, PostService};
