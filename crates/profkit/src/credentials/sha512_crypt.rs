//! SHA-512 based `crypt(3)` (`$6$` settings), compatible with glibc.

use sha2::{Digest, Sha512};
use thiserror::Error;

const PREFIX: &str = "$6$";
const ROUNDS_PREFIX: &str = "rounds=";

pub const ROUNDS_DEFAULT: u32 = 5000;
pub const ROUNDS_MIN: u32 = 1000;
pub const ROUNDS_MAX: u32 = 999_999_999;

/// Salt characters beyond this are ignored
const SALT_LEN_MAX: usize = 16;

const ALPHABET: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Byte order in which the final digest is base64-encoded, three bytes at a time
const PERMUTATION: [(usize, usize, usize); 21] = [
    (0, 21, 42),
    (22, 43, 1),
    (44, 2, 23),
    (3, 24, 45),
    (25, 46, 4),
    (47, 5, 26),
    (6, 27, 48),
    (28, 49, 7),
    (50, 8, 29),
    (9, 30, 51),
    (31, 52, 10),
    (53, 11, 32),
    (12, 33, 54),
    (34, 55, 13),
    (56, 14, 35),
    (15, 36, 57),
    (37, 58, 16),
    (59, 17, 38),
    (18, 39, 60),
    (40, 61, 19),
    (62, 20, 41),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptError {
    #[error("unsupported crypt setting '{0}' (expected `$6$[rounds=N$]salt`)")]
    UnsupportedSetting(String),

    #[error("invalid rounds value '{0}'")]
    InvalidRounds(String),
}

/// Parsed `$6$[rounds=N$]salt[$...]` setting
struct Setting<'a> {
    salt: &'a [u8],
    rounds: u32,
    custom_rounds: bool,
}

fn parse_setting(setting: &str) -> Result<Setting<'_>, CryptError> {
    let rest = setting
        .strip_prefix(PREFIX)
        .ok_or_else(|| CryptError::UnsupportedSetting(setting.to_string()))?;

    let (rounds, custom_rounds, rest) = match rest.strip_prefix(ROUNDS_PREFIX) {
        Some(field) => {
            let (digits, tail) = field
                .split_once('$')
                .ok_or_else(|| CryptError::InvalidRounds(field.to_string()))?;
            let requested: u64 = digits
                .parse()
                .map_err(|_| CryptError::InvalidRounds(digits.to_string()))?;
            let rounds = requested.clamp(ROUNDS_MIN as u64, ROUNDS_MAX as u64) as u32;
            (rounds, true, tail)
        }
        None => (ROUNDS_DEFAULT, false, rest),
    };

    // Salt runs to the next '$' (a full hash may be passed back in as the setting)
    let salt = rest.split('$').next().unwrap_or_default().as_bytes();
    let salt = &salt[..salt.len().min(SALT_LEN_MAX)];

    Ok(Setting {
        salt,
        rounds,
        custom_rounds,
    })
}

fn finish(hasher: Sha512) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// `digest` repeated and truncated to exactly `len` bytes
fn repeat_to_len(digest: &[u8; 64], len: usize) -> Vec<u8> {
    digest.iter().copied().cycle().take(len).collect()
}

fn push_b64(out: &mut String, b2: u8, b1: u8, b0: u8, n: usize) {
    let mut w = ((b2 as u32) << 16) | ((b1 as u32) << 8) | b0 as u32;
    for _ in 0..n {
        out.push(ALPHABET[(w & 0x3f) as usize] as char);
        w >>= 6;
    }
}

/// Hash `password` under a `$6$` setting, returning the full crypt string
/// (`$6$[rounds=N$]salt$hash`).
pub fn sha512_crypt(password: &str, setting: &str) -> Result<String, CryptError> {
    let Setting {
        salt,
        rounds,
        custom_rounds,
    } = parse_setting(setting)?;
    let key = password.as_bytes();

    let mut hasher = Sha512::new();
    hasher.update(key);
    hasher.update(salt);
    hasher.update(key);
    let alternate = finish(hasher);

    let mut hasher = Sha512::new();
    hasher.update(key);
    hasher.update(salt);
    hasher.update(repeat_to_len(&alternate, key.len()));
    let mut n = key.len();
    while n > 0 {
        if n & 1 != 0 {
            hasher.update(alternate);
        } else {
            hasher.update(key);
        }
        n >>= 1;
    }
    let mut digest = finish(hasher);

    let mut hasher = Sha512::new();
    for _ in 0..key.len() {
        hasher.update(key);
    }
    let p_bytes = repeat_to_len(&finish(hasher), key.len());

    let mut hasher = Sha512::new();
    for _ in 0..16 + digest[0] as usize {
        hasher.update(salt);
    }
    let s_bytes = repeat_to_len(&finish(hasher), salt.len());

    for round in 0..rounds {
        let mut hasher = Sha512::new();
        if round % 2 == 1 {
            hasher.update(&p_bytes);
        } else {
            hasher.update(digest);
        }
        if round % 3 != 0 {
            hasher.update(&s_bytes);
        }
        if round % 7 != 0 {
            hasher.update(&p_bytes);
        }
        if round % 2 == 1 {
            hasher.update(digest);
        } else {
            hasher.update(&p_bytes);
        }
        digest = finish(hasher);
    }

    let mut out = String::with_capacity(PREFIX.len() + 32 + salt.len() + 1 + 86);
    out.push_str(PREFIX);
    if custom_rounds {
        out.push_str(&format!("{ROUNDS_PREFIX}{rounds}$"));
    }
    out.push_str(&String::from_utf8_lossy(salt));
    out.push('$');
    for (a, b, c) in PERMUTATION {
        push_b64(&mut out, digest[a], digest[b], digest[c], 4);
    }
    push_b64(&mut out, 0, 0, digest[63], 2);

    Ok(out)
}
