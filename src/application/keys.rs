use uuid::Uuid;

use crate::domain::TransferKey;

/// Source of fresh transfer-key candidates.
///
/// Uniqueness is enforced by the store; a generator only has to make
/// collisions unlikely.
pub trait TransferKeyGenerator: Send + Sync {
    fn generate(&self) -> TransferKey;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeyGenerator;

impl TransferKeyGenerator for UuidKeyGenerator {
    fn generate(&self) -> TransferKey {
        TransferKey::new(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_keys_differ() {
        let generator = UuidKeyGenerator;
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }
}
