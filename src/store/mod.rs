//! Relational store: row models, the PlatformStore trait and its backends.

pub mod models;
pub mod postgres;
pub mod traits;

pub use models::*;
pub use postgres::PgStore;
pub use traits::PlatformStore;

#[cfg(test)]
pub(crate) mod mock;
