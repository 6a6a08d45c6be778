//! Link store implementations.
//!
//! [`InMemoryRepository`] backs tests and single-node development;
//! [`MySqlRepository`] is the durable backend. Both implement
//! `portkey_core::LinkRepository` with the same transactional semantics:
//! visit recording and archive-and-delete are atomic, and short-code
//! uniqueness is enforced at insert time, not by pre-checks.

pub mod memory;
pub mod mysql;
pub mod users;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use users::{InMemoryUserDirectory, MySqlUserDirectory};
