//! RSA public-key password encryption for the `caching_sha2_password` and
//! `sha256_password` full-auth path (spec 4.3).
//!
//! When the connection isn't secured by TLS, the server either sends its RSA
//! public key directly (`sha256_password`) or expects the client to request
//! it with a single `0x02` byte (`caching_sha2_password`). Either way the
//! password is XOR-masked by the seed, padded, and encrypted under the
//! server's public key before being sent back.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPublicKey};
use sha1::Sha1;

use crate::error::{protocol_err, Error};

/// A process-wide, read-mostly cache of parsed RSA public keys, keyed by
/// whatever the caller uses to identify a server (typically `host:port`).
///
/// Injected into a connection rather than a bare `static` so tests can use a
/// private instance; [`RsaPublicKeyCache::shared`] gives the default,
/// process-wide instance used by real connections.
#[derive(Clone, Default)]
pub(crate) struct RsaPublicKeyCache {
    inner: Arc<RwLock<HashMap<String, Arc<RsaPublicKey>>>>,
}

impl RsaPublicKeyCache {
    pub(crate) fn shared() -> Self {
        use std::sync::OnceLock;
        static SHARED: OnceLock<RsaPublicKeyCache> = OnceLock::new();
        SHARED.get_or_init(Self::default).clone()
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<RsaPublicKey>> {
        self.inner.read().unwrap().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: String, pem: &[u8]) -> Result<Arc<RsaPublicKey>, Error> {
        let parsed = Arc::new(parse_public_key_pem(pem)?);
        self.inner.write().unwrap().insert(key, parsed.clone());
        Ok(parsed)
    }
}

fn parse_public_key_pem(pem: &[u8]) -> Result<RsaPublicKey, Error> {
    let pem = std::str::from_utf8(pem)
        .map_err(|e| protocol_err!("RSA public key is not valid UTF-8 PEM: {}", e))?;

    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| protocol_err!("failed to parse RSA public key PEM: {}", e))
}

/// `password || 0x00`, XOR-masked byte-for-byte by a repeating `seed`.
fn mask(password: &str, seed: &[u8]) -> Vec<u8> {
    let mut bytes = password.as_bytes().to_vec();
    bytes.push(0);

    for (i, b) in bytes.iter_mut().enumerate() {
        *b ^= seed[i % seed.len()];
    }

    bytes
}

/// Encrypt under OAEP (SHA1 MGF), used by `caching_sha2_password`'s full-auth
/// path on MySQL 8.0.5+.
pub(crate) fn encrypt_oaep(password: &str, seed: &[u8], key: &RsaPublicKey) -> Result<Vec<u8>, Error> {
    let masked = mask(password, seed);
    key.encrypt(&mut OsRng, Oaep::new::<Sha1>(), &masked)
        .map_err(|e| protocol_err!("RSA OAEP encryption failed: {}", e))
}

/// Encrypt under PKCS#1 v1.5 padding, used by `sha256_password`.
pub(crate) fn encrypt_pkcs1v15(password: &str, seed: &[u8], key: &RsaPublicKey) -> Result<Vec<u8>, Error> {
    let masked = mask(password, seed);
    key.encrypt(&mut OsRng, Pkcs1v15Encrypt, &masked)
        .map_err(|e| protocol_err!("RSA PKCS1v1.5 encryption failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_appends_nul_and_is_reversible() {
        let seed = b"01234567890123456789";
        let masked = mask("hunter2", seed);
        assert_eq!(masked.len(), "hunter2".len() + 1);

        let recovered: Vec<u8> = masked
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ seed[i % seed.len()])
            .collect();
        assert_eq!(&recovered[..recovered.len() - 1], b"hunter2");
        assert_eq!(recovered.last(), Some(&0));
    }

    #[test]
    fn cache_round_trips() {
        let cache = RsaPublicKeyCache::default();
        assert!(cache.get("db:3306").is_none());
    }
}
