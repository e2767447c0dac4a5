//! Startup check of the node's credential file.

use std::path::Path;

use ed25519_dalek::SigningKey;
use tracing::{debug, error};

use jobnode_core::wallet::quarantine;

use crate::auth::public_key_hex;
use crate::config::NodeConfig;
use crate::error::NodeError;

/// Read a keypair file (JSON array of 64 bytes: secret then public) and
/// return the hex public key.
pub fn load_public_key(path: &Path) -> Result<String, NodeError> {
    let raw = std::fs::read_to_string(path)?;
    let bytes: Vec<u8> =
        serde_json::from_str(&raw).map_err(|e| NodeError::Wallet(e.to_string()))?;
    let keypair: [u8; 64] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| NodeError::Wallet(format!("expected 64 key bytes, got {}", b.len())))?;
    let key = SigningKey::from_keypair_bytes(&keypair).map_err(|e| NodeError::Wallet(e.to_string()))?;
    Ok(public_key_hex(&key.verifying_key()))
}

/// Refuse to start with a compromised wallet.
///
/// A wallet whose public key is listed in `compromised_keys` is renamed
/// aside and the check fails. Returns the wallet's public key when one is
/// configured.
pub fn check_wallet(config: &NodeConfig) -> Result<Option<String>, NodeError> {
    let Some(path) = config.wallet_path.as_deref() else {
        return Ok(None);
    };

    let public_key = load_public_key(path)?;
    let compromised = config
        .compromised_keys
        .iter()
        .any(|key| key.eq_ignore_ascii_case(&public_key));
    if compromised {
        error!(public_key = %public_key, "wallet is compromised");
        quarantine(path)?;
        return Err(NodeError::WalletCompromised(public_key));
    }

    debug!(public_key = %public_key, "wallet checked");
    Ok(Some(public_key))
}
