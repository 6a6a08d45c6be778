//! Background expiration and archival.
//!
//! The [`Sweeper`] runs on its own timer, independent of request traffic.
//! Each tick warns owners of links expiring soon, renews or archives
//! lapsed links, and archives links that have gone unused. One bad row
//! never stops a pass, and a failed pass never stops the loop.

pub mod config;
pub mod sweeper;

pub use config::SweeperConfig;
pub use sweeper::{SweepReport, Sweeper};
