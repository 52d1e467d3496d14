//! Authentication plugin scrambles (spec 4.3).
//!
//! Each plugin turns a password and a server-chosen seed into the bytes sent
//! back as the auth response. The RSA full-auth path (`caching_sha2_password`
//! and `sha256_password` without TLS) lives in [`rsa`] since it additionally
//! needs a public key fetched from the server.

pub(crate) mod rsa;

use digest::Digest;
use sha1::Sha1;
use sha2::Sha256;

pub(crate) use self::rsa::RsaPublicKeyCache;

/// The authentication plugin negotiated for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlugin {
    MySqlNativePassword,
    CachingSha2Password,
    Sha256Password,
}

impl AuthPlugin {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::MySqlNativePassword => "mysql_native_password",
            Self::CachingSha2Password => "caching_sha2_password",
            Self::Sha256Password => "sha256_password",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "mysql_native_password" => Self::MySqlNativePassword,
            "caching_sha2_password" => Self::CachingSha2Password,
            "sha256_password" => Self::Sha256Password,
            _ => return None,
        })
    }

    /// `true` if this plugin may need a round-trip to the server beyond the
    /// initial scramble (RSA key fetch for a full-auth exchange).
    pub(crate) fn may_require_full_auth(self) -> bool {
        matches!(self, Self::CachingSha2Password | Self::Sha256Password)
    }

    /// The initial auth response sent in the handshake response packet.
    ///
    /// For `sha256_password` without a cached key the correct initial
    /// response is empty, which forces the server to start the RSA exchange;
    /// `caching_sha2_password` always attempts the fast-auth path first.
    pub(crate) fn initial_response(self, password: &str, seed: &[u8]) -> Vec<u8> {
        match self {
            Self::MySqlNativePassword => scramble_sha1(password, seed),
            Self::CachingSha2Password => scramble_sha256(password, seed),
            Self::Sha256Password => Vec::new(),
        }
    }
}

/// `SHA1(password) XOR SHA1(seed || SHA1(SHA1(password)))`.
///
/// Empty password yields an empty token (spec 4.3, invariant 4).
pub(crate) fn scramble_sha1(password: &str, seed: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let seed = strip_trailing_nul(seed);

    let stage1 = Sha1::digest(password.as_bytes());
    let stage2 = Sha1::digest(stage1);

    let mut ctx = Sha1::new();
    ctx.update(seed);
    ctx.update(stage2);
    let stage3 = ctx.finalize();

    xor(&stage1, &stage3)
}

/// `SHA256(password) XOR SHA256(SHA256(SHA256(password)) || seed)`.
pub(crate) fn scramble_sha256(password: &str, seed: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let seed = strip_trailing_nul(seed);

    let stage1 = Sha256::digest(password.as_bytes());
    let stage2 = Sha256::digest(stage1);

    let mut ctx = Sha256::new();
    ctx.update(stage2);
    ctx.update(seed);
    let stage3 = ctx.finalize();

    xor(&stage1, &stage3)
}

fn strip_trailing_nul(seed: &[u8]) -> &[u8] {
    match seed.split_last() {
        Some((0, rest)) => rest,
        _ => seed,
    }
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_yields_empty_token() {
        assert!(scramble_sha1("", &[0u8; 20]).is_empty());
        assert!(scramble_sha256("", &[0u8; 20]).is_empty());
    }

    #[test]
    fn native_password_token_is_twenty_bytes() {
        let token = scramble_sha1("hunter2", b"01234567890123456789");
        assert_eq!(token.len(), 20);
    }

    #[test]
    fn caching_sha2_token_is_thirty_two_bytes() {
        let token = scramble_sha256("hunter2", b"01234567890123456789");
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn native_password_is_deterministic() {
        let seed = b"01234567890123456789";
        assert_eq!(scramble_sha1("hunter2", seed), scramble_sha1("hunter2", seed));
        assert_ne!(scramble_sha1("hunter2", seed), scramble_sha1("other", seed));
    }

    #[test]
    fn strips_trailing_nul_from_seed() {
        let seed = b"01234567890123456789";
        let mut with_nul = seed.to_vec();
        with_nul.push(0);

        assert_eq!(scramble_sha1("hunter2", seed), scramble_sha1("hunter2", &with_nul));
        assert_eq!(scramble_sha256("hunter2", seed), scramble_sha256("hunter2", &with_nul));
    }
}
