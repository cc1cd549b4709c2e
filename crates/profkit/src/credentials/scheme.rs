use sha2::{Digest, Sha256};
use std::fmt;

use super::sha512_crypt::{CryptError, sha512_crypt};

/// Salt used by the demo store when none is configured
pub const DEFAULT_SALT: &str = "$6$ZmBkxkRFj03LQOvr";

/// One-way transform applied to passwords before storage and comparison
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PasswordScheme {
    /// glibc `$6$` crypt (5000 rounds of SHA-512 by default)
    #[default]
    #[value(name = "sha512-crypt")]
    Sha512Crypt,
    /// Hex SHA-256 of password followed by salt
    Sha256,
}

impl PasswordScheme {
    pub const ALL: [PasswordScheme; 2] = [PasswordScheme::Sha512Crypt, PasswordScheme::Sha256];

    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordScheme::Sha512Crypt => "sha512-crypt",
            PasswordScheme::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode `plaintext` under `scheme` with `salt`. Deterministic.
pub fn encode(scheme: PasswordScheme, plaintext: &str, salt: &str) -> Result<String, CryptError> {
    match scheme {
        PasswordScheme::Sha512Crypt => sha512_crypt(plaintext, salt),
        PasswordScheme::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(plaintext.as_bytes());
            hasher.update(salt.as_bytes());
            Ok(hex::encode(hasher.finalize()))
        }
    }
}

/// A scheme bound to its salt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordEncoder {
    scheme: PasswordScheme,
    salt: String,
}

impl PasswordEncoder {
    pub fn new(scheme: PasswordScheme, salt: impl Into<String>) -> Self {
        Self {
            scheme,
            salt: salt.into(),
        }
    }

    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn encode(&self, plaintext: &str) -> Result<String, CryptError> {
        encode(self.scheme, plaintext, &self.salt)
    }
}

impl Default for PasswordEncoder {
    fn default() -> Self {
        Self::new(PasswordScheme::default(), DEFAULT_SALT)
    }
}
