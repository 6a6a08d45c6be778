//! Redirect resolution for `GET /{short_code}`.
//!
//! [`RedirectorService`] runs the request-time state machine: cache probe,
//! authoritative store lookup, expiry check, atomic visit recording, and
//! populate-on-miss. The cache accelerates nothing but the response; every
//! request still reads and writes the store, so the system stays correct
//! with the cache degraded or absent.

pub mod error;
pub mod redirector;
pub mod service;

pub use error::RedirectError;
pub use redirector::{Redirect, Redirector, VisitContext};
pub use service::RedirectorService;
