//! Microsoft SQL Server driver.
//!
//! - [`MssqlConnector`]: [`Connector`](crate::core::traits::Connector) over Tiberius
//! - [`TiberiusConnectionManager`]: bb8 connection manager

mod connector;

pub use connector::{MssqlConnector, TiberiusConnectionManager};
