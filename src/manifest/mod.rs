//! Desired-state manifest document: models, upsert semantics and the
//! document store.

pub mod models;
pub mod store;

pub use models::*;
pub use store::ManifestStore;
