//! Store-facing helpers for `uuid::Uuid`
//!
//! The store persists UUIDs as 16 raw bytes. Clients also exchange them in
//! standard base64 (24 characters, padded).

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

/// Extra encodings for `Uuid`
pub trait UuidExt: Sized {
    /// Standard padded base64 of the 16 bytes
    fn to_base64(&self) -> String;

    /// Parse the output of [`UuidExt::to_base64`]
    fn from_base64(encoded: &str) -> Result<Self>;
}

impl UuidExt for Uuid {
    fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }

    fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::InvalidInput(format!("invalid base64 uuid: {}", e)))?;
        Uuid::from_slice(&bytes)
            .map_err(|e| Error::InvalidInput(format!("invalid uuid length: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip() {
        let id = Uuid::new_v4();
        let text = id.to_base64();
        assert_eq!(text.len(), 24);
        assert_eq!(Uuid::from_base64(&text).unwrap(), id);
    }

    #[test]
    fn test_base64_known_value() {
        let id = Uuid::parse_str("18de7916-7f84-11ec-a8a3-0242ac120002").unwrap();
        assert_eq!(id.to_base64(), "GN55Fn+EEeyoowJCrBIAAg==");
    }

    #[test]
    fn test_from_base64_rejects_wrong_length() {
        assert!(Uuid::from_base64("AAAA").is_err());
        assert!(Uuid::from_base64("not base64!").is_err());
    }
}
