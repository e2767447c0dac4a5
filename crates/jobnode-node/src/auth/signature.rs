//! Ed25519 signature helpers.
//!
//! Signers are identified by their hex-encoded 32-byte public key and sign
//! the agreed message; signatures travel as standard base64.

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use super::AuthError;

/// Verify `signature_b64` over `message` for the key `signer_hex`.
pub fn verify_signature(signer_hex: &str, message: &[u8], signature_b64: &str) -> Result<(), AuthError> {
    let key_bytes = hex::decode(signer_hex)
        .map_err(|e| AuthError::Malformed(format!("signer is not hex: {e}")))?;
    let key_bytes: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
        AuthError::Malformed(format!("signer must be 32 bytes, found {}", key_bytes.len()))
    })?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| AuthError::Malformed("signer is not an ed25519 public key".to_string()))?;

    let sig_bytes = STANDARD
        .decode(signature_b64)
        .map_err(|e| AuthError::Malformed(format!("signature is not base64: {e}")))?;
    let signature = Signature::from_slice(&sig_bytes).map_err(|_| {
        AuthError::Malformed(format!("signature must be 64 bytes, found {}", sig_bytes.len()))
    })?;

    key.verify(message, &signature)
        .map_err(|_| AuthError::InvalidSignature)
}

/// Sign `message` and encode the signature as base64.
pub fn sign_message(key: &SigningKey, message: &[u8]) -> String {
    STANDARD.encode(key.sign(message).to_bytes())
}

/// Hex form of a public key, as used for signer addresses.
pub fn public_key_hex(key: &VerifyingKey) -> String {
    hex::encode(key.to_bytes())
}
