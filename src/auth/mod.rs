//! Authentication module — password login + JWT
//!
//! Provides:
//! - JWT token encoding/decoding (`jwt` submodule)
//! - Bearer-token middleware (`middleware` submodule)
//! - `AuthUser` handler extractor (`extractor` submodule)

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use extractor::AuthUser;
pub use jwt::{decode_jwt, encode_jwt, Claims};
pub use middleware::require_auth;
