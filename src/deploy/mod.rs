//! Desired-state reconciliation and pipeline dispatch.

pub mod dispatch;
pub mod service;

pub use dispatch::{DispatchAction, DispatchEmitter, DispatchPayload};
pub use service::DeployService;
