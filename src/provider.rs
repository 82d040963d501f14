//! Identity-provider metadata (authority) and error classification strategy.
//!
//! `authority` locates the Azure AD token endpoint for a tenant. `strategy` defines
//! [`ProviderStrategy`], an HTTP-client-agnostic hook that maps OAuth error responses into
//! the crate's error taxonomy.

pub mod authority;
pub mod strategy;

pub use authority::*;
pub use strategy::*;
