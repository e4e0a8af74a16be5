//! Conversion of published key entries into RSA verification keys.
//!
//! Resolution is pure: it reads a [`KeySet`] snapshot and never touches the
//! network.

use crate::auth::error::AuthError;
use crate::auth::jwks::{KeyEntry, KeySet};
use common::jwt::{decode_rsa_exponent, decode_rsa_modulus};
use jsonwebtoken::{Algorithm, DecodingKey};

/// RSA public key decoded from a JWK.
///
/// The modulus is the minimal big-endian encoding (no leading zero bytes),
/// which is the form the verifier backend requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: Vec<u8>,
    exponent: u32,
}

impl RsaPublicKey {
    /// Decode an entry's modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnusableKey` if the entry is not an RSA key, is
    /// declared for another algorithm, or has undecodable components.
    pub fn from_entry(entry: &KeyEntry) -> Result<Self, AuthError> {
        if entry.kty != "RSA" {
            tracing::warn!(target: "gw.auth.jwks", kid = %entry.kid, kty = %entry.kty, "Key is not an RSA key");
            return Err(AuthError::UnusableKey(entry.kid.clone()));
        }

        // Cognito always sets alg; an absent alg is accepted
        if !entry.alg.is_empty() && entry.alg != "RS256" {
            tracing::warn!(target: "gw.auth.jwks", kid = %entry.kid, alg = %entry.alg, "Key is published for another algorithm");
            return Err(AuthError::UnusableKey(entry.kid.clone()));
        }

        let modulus = decode_rsa_modulus(&entry.n).map_err(|e| {
            tracing::warn!(target: "gw.auth.jwks", kid = %entry.kid, error = %e, "Invalid RSA modulus");
            AuthError::UnusableKey(entry.kid.clone())
        })?;
        let exponent = decode_rsa_exponent(&entry.e).map_err(|e| {
            tracing::warn!(target: "gw.auth.jwks", kid = %entry.kid, error = %e, "Invalid RSA exponent");
            AuthError::UnusableKey(entry.kid.clone())
        })?;

        Ok(Self { modulus, exponent })
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Minimal big-endian bytes of the exponent.
    fn exponent_bytes(&self) -> Vec<u8> {
        self.exponent
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect()
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_rsa_raw_components(&self.modulus, &self.exponent_bytes())
    }

    /// Check an RS256 signature (base64url) over `message`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SignatureInvalid` if the signature does not match
    /// or cannot be decoded.
    pub fn verify_rs256(&self, message: &[u8], signature_b64: &str) -> Result<(), AuthError> {
        match jsonwebtoken::crypto::verify(
            signature_b64,
            message,
            &self.decoding_key(),
            Algorithm::RS256,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::SignatureInvalid),
            Err(e) => {
                tracing::debug!(target: "gw.auth.jwt", error = %e, "Signature verification error");
                Err(AuthError::SignatureInvalid)
            }
        }
    }
}

/// Find the entry for `kid` and decode it.
///
/// # Errors
///
/// - `KeyNotFound` - No entry has this key ID
/// - `UnusableKey` - The entry exists but cannot verify RS256
pub fn resolve(key_set: &KeySet, kid: &str) -> Result<RsaPublicKey, AuthError> {
    let entry = key_set.get(kid).ok_or_else(|| {
        tracing::debug!(target: "gw.auth.jwks", kid = %kid, known_kids = ?key_set.kids(), "Key not found in JWKS");
        AuthError::KeyNotFound(kid.to_string())
    })?;

    RsaPublicKey::from_entry(entry)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn rsa_entry(kid: &str, n: &[u8], e: &str) -> KeyEntry {
        KeyEntry {
            kid: kid.to_string(),
            alg: "RS256".to_string(),
            kty: "RSA".to_string(),
            n: URL_SAFE_NO_PAD.encode(n),
            e: e.to_string(),
            key_use: Some("sig".to_string()),
        }
    }

    #[test]
    fn test_from_entry_decodes_components() {
        let entry = rsa_entry("abc", &[0x00, 0xC3, 0x01, 0x02], "AQAB");

        let key = RsaPublicKey::from_entry(&entry).unwrap();

        assert_eq!(key.modulus(), &[0xC3, 0x01, 0x02]);
        assert_eq!(key.exponent(), 65537);
        assert_eq!(key.exponent_bytes(), vec![0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_single_byte_exponent() {
        // e = 3
        let entry = rsa_entry("abc", &[0xC3], "Aw");

        let key = RsaPublicKey::from_entry(&entry).unwrap();

        assert_eq!(key.exponent(), 3);
        assert_eq!(key.exponent_bytes(), vec![0x03]);
    }

    #[test]
    fn test_padded_exponent_is_normalized() {
        // e = 65537 encoded as four bytes with a leading zero
        let entry = rsa_entry("abc", &[0xC3], &URL_SAFE_NO_PAD.encode([0x00, 0x01, 0x00, 0x01]));

        let key = RsaPublicKey::from_entry(&entry).unwrap();

        assert_eq!(key.exponent(), 65537);
        assert_eq!(key.exponent_bytes(), vec![0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_from_entry_rejects_non_rsa() {
        let mut entry = rsa_entry("abc", &[0xC3], "AQAB");
        entry.kty = "EC".to_string();

        assert_eq!(
            RsaPublicKey::from_entry(&entry),
            Err(AuthError::UnusableKey("abc".to_string()))
        );
    }

    #[test]
    fn test_from_entry_rejects_other_algorithm() {
        let mut entry = rsa_entry("abc", &[0xC3], "AQAB");
        entry.alg = "RS512".to_string();

        assert_eq!(
            RsaPublicKey::from_entry(&entry),
            Err(AuthError::UnusableKey("abc".to_string()))
        );
    }

    #[test]
    fn test_from_entry_accepts_missing_algorithm() {
        let mut entry = rsa_entry("abc", &[0xC3], "AQAB");
        entry.alg = String::new();

        assert!(RsaPublicKey::from_entry(&entry).is_ok());
    }

    #[test]
    fn test_from_entry_rejects_bad_components() {
        let mut entry = rsa_entry("abc", &[0xC3], "AQAB");
        entry.n = "not base64!".to_string();
        assert!(matches!(
            RsaPublicKey::from_entry(&entry),
            Err(AuthError::UnusableKey(_))
        ));

        let mut entry = rsa_entry("abc", &[0xC3], "AQAB");
        entry.e = URL_SAFE_NO_PAD.encode([0x01, 0x00, 0x00, 0x00, 0x01]);
        assert!(matches!(
            RsaPublicKey::from_entry(&entry),
            Err(AuthError::UnusableKey(_))
        ));

        let mut entry = rsa_entry("abc", &[0xC3], "AQAB");
        entry.n = String::new();
        assert!(matches!(
            RsaPublicKey::from_entry(&entry),
            Err(AuthError::UnusableKey(_))
        ));
    }

    #[test]
    fn test_resolve_unknown_kid() {
        let key_set = KeySet::new(vec![rsa_entry("abc", &[0xC3], "AQAB")]);

        assert_eq!(
            resolve(&key_set, "xyz"),
            Err(AuthError::KeyNotFound("xyz".to_string()))
        );
    }

    #[test]
    fn test_resolve_known_kid() {
        let key_set = KeySet::new(vec![
            rsa_entry("abc", &[0xC3], "AQAB"),
            rsa_entry("def", &[0xD4], "AQAB"),
        ]);

        let key = resolve(&key_set, "def").unwrap();
        assert_eq!(key.modulus(), &[0xD4]);
    }

    #[test]
    fn test_verify_rejects_garbage_signature() {
        let key = RsaPublicKey::from_entry(&rsa_entry("abc", &[0xC3; 256], "AQAB")).unwrap();

        assert_eq!(
            key.verify_rs256(b"header.payload", "c2lnbmF0dXJl"),
            Err(AuthError::SignatureInvalid)
        );
    }
}
