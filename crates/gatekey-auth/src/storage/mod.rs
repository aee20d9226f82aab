//! Storage traits for authentication data.
//!
//! This module defines storage interfaces for:
//!
//! - Principals and their credentials
//! - Issued refresh tokens
//! - One-time verification codes
//!
//! # Implementations
//!
//! - [`memory`] - in-process storage for tests and single-node development
//! - `gatekey-auth-postgres` - PostgreSQL storage backend

pub mod memory;
pub mod refresh_token;
pub mod user;
pub mod verification;

pub use memory::MemoryStore;
pub use refresh_token::{RefreshTokenStorage, hash_refresh_token};
pub use user::UserStorage;
pub use verification::VerificationCodeStorage;
