//! Core types and traits for the Portkey URL shortener.
//!
//! This crate provides the domain model and the trait seams shared by the
//! shortener, redirector, sweeper and analytics services. Implementations
//! of the storage and cache contracts live in `portkey-storage` and
//! `portkey-cache`.

pub mod cache;
pub mod error;
pub mod link;
pub mod notify;
pub mod repository;
pub mod shortcode;
pub mod user;
pub mod visit;

pub use cache::{CacheTtls, CachedLink, DayCount, RedirectCache, SearchEntry};
pub use error::{CacheError, CoreError, NotifyError, StorageError};
pub use link::{ArchiveReason, ArchiveRecord, Link, LinkPatch, NewLink};
pub use notify::{LogNotifier, Notifier};
pub use repository::LinkRepository;
pub use shortcode::ShortCode;
pub use user::{Role, User, UserDirectory};
pub use visit::{day_bucket, hour_bucket, NewVisit, VisitRecord};
