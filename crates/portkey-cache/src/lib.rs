//! Redirect-cache implementations.
//!
//! [`RedisRedirectCache`] is the shared cache for multi-process
//! deployments; [`MokaRedirectCache`] keeps the same contract in process
//! memory for single-node setups and tests. Both are advisory: callers
//! absorb every error as a miss, and correctness never depends on them.

pub mod moka;
pub mod redis;

pub use crate::moka::MokaRedirectCache;
pub use crate::redis::RedisRedirectCache;
