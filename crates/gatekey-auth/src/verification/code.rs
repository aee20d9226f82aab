//! Verification code generators.

use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::config::{CodeFormat, VerificationConfig};
use crate::types::CodeType;

/// Produces fresh verification codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, code_type: CodeType) -> String;
}

/// Random decimal codes of a fixed length, leading zeros allowed.
#[derive(Debug, Clone, Copy)]
pub struct NumericCodes {
    length: usize,
}

impl NumericCodes {
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl CodeGenerator for NumericCodes {
    fn generate(&self, _code_type: CodeType) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// Random UUID v4 codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodes;

impl CodeGenerator for UuidCodes {
    fn generate(&self, _code_type: CodeType) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Generator selected by `verification.code_format`.
#[must_use]
pub fn generator_from_config(config: &VerificationConfig) -> Arc<dyn CodeGenerator> {
    match config.code_format {
        CodeFormat::Numeric => Arc::new(NumericCodes::new(config.code_length)),
        CodeFormat::Uuid => Arc::new(UuidCodes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_codes() {
        let generator = NumericCodes::new(6);
        for _ in 0..50 {
            let code = generator.generate(CodeType::EmailConfirm);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_uuid_codes() {
        let code = UuidCodes.generate(CodeType::PasswordReset);
        assert!(Uuid::parse_str(&code).is_ok());
    }

    #[test]
    fn test_generator_from_config() {
        let config = VerificationConfig {
            code_length: 8,
            ..Default::default()
        };
        assert_eq!(
            generator_from_config(&config)
                .generate(CodeType::EmailConfirm)
                .len(),
            8
        );
    }
}
