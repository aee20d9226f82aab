//! One-time verification codes for email confirmation and password reset.

pub mod code;
pub mod manager;

pub use code::{CodeGenerator, NumericCodes, UuidCodes, generator_from_config};
pub use manager::VerificationCodeManager;
