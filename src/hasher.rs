//! Fixed-width digests used to bound key segment length.
//!
//! The digest is non-cryptographic in intent: it hides the length and raw
//! characters of a project name or business parameter, nothing more. Distinct
//! inputs may collide.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Width of the digest folded into namespace and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestWidth {
    /// CRC32 as 8 uppercase hex characters, zero padded. Checksums with a
    /// leading zero nibble differ from unpadded `%X` renderings.
    #[default]
    Crc32,
    /// First 8 bytes of SHA-256 as 16 uppercase hex characters.
    Wide64,
}

impl FromStr for DigestWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crc32" => Ok(DigestWidth::Crc32),
            "wide64" => Ok(DigestWidth::Wide64),
            other => Err(format!("unknown digest width '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher {
    width: DigestWidth,
}

impl Hasher {
    pub fn new(width: DigestWidth) -> Self {
        Self { width }
    }

    /// Digest `input` into its "secret code" form.
    pub fn hash(&self, input: &str) -> String {
        match self.width {
            DigestWidth::Crc32 => format!("{:08X}", crc32fast::hash(input.as_bytes())),
            DigestWidth::Wide64 => {
                let digest = Sha256::digest(input.as_bytes());
                hex::encode_upper(&digest[..8])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = Hasher::default();
        assert_eq!(hasher.hash("qzone"), hasher.hash("qzone"));

        let wide = Hasher::new(DigestWidth::Wide64);
        assert_eq!(wide.hash("email:x@y.com:1:20"), wide.hash("email:x@y.com:1:20"));
    }

    #[test]
    fn test_crc32_known_value() {
        // CRC32("hello") = 0x3610A686
        assert_eq!(Hasher::default().hash("hello"), "3610A686");
        // CRC32("") = 0, leading zeros are kept
        assert_eq!(Hasher::default().hash(""), "00000000");
    }

    #[test]
    fn test_digest_is_fixed_width_uppercase_hex() {
        for width in [DigestWidth::Crc32, DigestWidth::Wide64] {
            let hasher = Hasher::new(width);
            let expected_len = match width {
                DigestWidth::Crc32 => 8,
                DigestWidth::Wide64 => 16,
            };
            let long = "x".repeat(4096);
            for input in ["", "a", "qzone.user.info", long.as_str()] {
                let code = hasher.hash(input);
                assert_eq!(code.len(), expected_len, "width {:?} input {:?}", width, input);
                assert!(code
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
            }
        }
    }

    #[test]
    fn test_digest_width_from_str() {
        assert_eq!("crc32".parse::<DigestWidth>(), Ok(DigestWidth::Crc32));
        assert_eq!(" Wide64 ".parse::<DigestWidth>(), Ok(DigestWidth::Wide64));
        assert!("md5".parse::<DigestWidth>().is_err());
    }
}
