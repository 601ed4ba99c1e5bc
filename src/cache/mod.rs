//! Temporary storage for large request-body parts.
//!
//! Each [`Session`](crate::server::Session) owns one [`CacheManager`]. Items it
//! hands out are plain handles to files the manager owns; clearing the manager
//! deletes every file it created, so a handler holding on to a [`CacheItem`]
//! past the end of its request cycle only finds a missing file.

mod error;
mod item;
mod manager;

pub use error::CacheError;
pub use item::CacheItem;
pub use manager::CacheManager;
