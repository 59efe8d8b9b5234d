pub mod client;
pub mod memory;
mod record;
pub mod store;

pub use client::{DbClient, DbError, Result};
pub use memory::MemoryStore;
pub use store::{PostRepository, UserRepository};
