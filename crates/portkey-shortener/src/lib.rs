//! Shortening service: code allocation, link creation, owner-gated
//! update/delete, and reverse search.
//!
//! The service wraps a `LinkRepository` and a `RedirectCache`. The store
//! is the authority for short-code uniqueness; the cache is advisory and
//! only ever invalidated or populated after the store write committed.

pub mod allocator;
pub mod error;
pub mod service;
pub mod shortener;

pub use allocator::CodeAllocator;
pub use error::ShortenError;
pub use service::ShortenerService;
pub use shortener::{ShortenParams, Shortener};
