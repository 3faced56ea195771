// ABOUTME: Private key loading from PEM files.
// ABOUTME: Accepts RSA keys in PKCS#1 or PKCS#8 encoding and converts them for russh.

use crate::error::{Error, Result};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding, PrivateKeyInfo};
use russh::keys::ssh_key;
use std::path::Path;

const ED25519_OID: &str = "1.3.101.112";
const ED448_OID: &str = "1.3.101.113";
const EC_PUBLIC_KEY_OID: &str = "1.2.840.10045.2.1";
const DSA_OID: &str = "1.2.840.10040.4.1";

/// Load an RSA private key from the first PEM block of `path`.
///
/// The legacy PKCS#1 encoding is tried first, then PKCS#8. A PKCS#8 key for
/// any algorithm other than RSA is rejected with `UnsupportedKeyType`.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey> {
    let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    parse_private_key(&data)
}

/// Parse an RSA private key from PEM text.
pub fn parse_private_key(data: &[u8]) -> Result<RsaPrivateKey> {
    let block = first_pem_block(data)?;
    let der = block.contents();

    if let Ok(key) = RsaPrivateKey::from_pkcs1_der(der) {
        return Ok(key);
    }

    let info = PrivateKeyInfo::try_from(der).map_err(|e| {
        Error::Format(format!(
            "{} block is neither PKCS#1 nor PKCS#8: {}",
            block.tag(),
            e
        ))
    })?;

    if info.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
        return Err(Error::UnsupportedKeyType(algorithm_name(
            &info.algorithm.oid.to_string(),
        )));
    }

    RsaPrivateKey::from_pkcs8_der(der).map_err(|e| Error::Format(format!("bad RSA key: {}", e)))
}

/// Convert an RSA key into the transport's private key type.
pub fn to_ssh_key(key: &RsaPrivateKey) -> Result<ssh_key::PrivateKey> {
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| Error::Format(format!("failed to encode RSA key: {}", e)))?;
    russh::keys::decode_secret_key(&pem, None)
        .map_err(|e| Error::Format(format!("key not usable for SSH: {}", e)))
}

fn first_pem_block(data: &[u8]) -> Result<pem::Pem> {
    let blocks = pem::parse_many(data)
        .map_err(|e| Error::Format(format!("failed to decode PEM block: {}", e)))?;
    blocks
        .into_iter()
        .next()
        .ok_or_else(|| Error::Format("failed to decode PEM block".to_string()))
}

fn algorithm_name(oid: &str) -> String {
    match oid {
        ED25519_OID => "Ed25519".to_string(),
        ED448_OID => "Ed448".to_string(),
        EC_PUBLIC_KEY_OID => "ECDSA".to_string(),
        DSA_OID => "DSA".to_string(),
        other => format!("algorithm {}", other),
    }
}
