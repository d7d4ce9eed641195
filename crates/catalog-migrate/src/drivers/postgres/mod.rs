//! PostgreSQL driver.
//!
//! - [`PostgresConnector`]: [`Connector`](crate::core::traits::Connector) over
//!   tokio-postgres with a deadpool pool

mod connector;

pub use connector::PostgresConnector;
