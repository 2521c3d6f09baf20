//! Pluggable secret decoding for plugin instance config (§4.A, §5).
//!
//! Plugin instances store config as a JSON blob; fields a [`crate::Plugin`]
//! (defined in `switchyard-core`) declares sensitive are run through a
//! [`SecretDecoder`] before the handler ever sees them, so ingress never
//! depends on a specific secret-management backend.

use thiserror::Error;

/// Errors a [`SecretDecoder`] can return.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The stored ciphertext could not be decoded.
    #[error("malformed secret value: {0}")]
    Malformed(String),
}

/// Convenience alias for secret decoding.
pub type SecretResult<T> = Result<T, SecretError>;

/// Decodes a single plugin-config field value that has been marked
/// sensitive. Implementations are expected to be cheap and side-effect
/// free; a KMS-backed implementation should cache decrypted values for the
/// lifetime of the process rather than round-tripping per call.
pub trait SecretDecoder: Send + Sync {
    /// Decode one stored field value into its plaintext form.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Malformed`] if the stored value is not in
    /// the format this decoder expects.
    fn decode(&self, field_name: &str, stored_value: &str) -> SecretResult<String>;
}

/// The default decoder: stored values are plain base64, no external key
/// material involved. Suitable for local development and for secrets that
/// are merely obfuscated rather than encrypted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Decoder;

impl SecretDecoder for Base64Decoder {
    fn decode(&self, field_name: &str, stored_value: &str) -> SecretResult<String> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(stored_value)
            .map_err(|e| SecretError::Malformed(format!("{field_name}: {e}")))?;
        String::from_utf8(bytes).map_err(|e| SecretError::Malformed(format!("{field_name}: {e}")))
    }
}

/// A decoder that returns the stored value unchanged, for tests that don't
/// want to base64-encode their fixture config.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDecoder;

impl SecretDecoder for NoopDecoder {
    fn decode(&self, _field_name: &str, stored_value: &str) -> SecretResult<String> {
        Ok(stored_value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_decoder_round_trips() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode("shh");
        let decoded = Base64Decoder.decode("token", &encoded).unwrap();
        assert_eq!(decoded, "shh");
    }

    #[test]
    fn base64_decoder_rejects_malformed_input() {
        assert!(Base64Decoder.decode("token", "not valid base64!!").is_err());
    }

    #[test]
    fn noop_decoder_passes_through() {
        assert_eq!(NoopDecoder.decode("token", "raw-value").unwrap(), "raw-value");
    }
}
