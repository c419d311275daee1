//! Account addresses.
//!
//! An address is the base32 form (RFC 4648 alphabet, no padding) of the
//! 32-byte public key followed by the last 4 bytes of its SHA-512/256 digest.

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KEY_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;

/// Length of the textual form of an address.
pub const ADDRESS_LEN: usize = 58;

/// Errors produced when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Wrong number of characters.
    #[error("address must be {ADDRESS_LEN} characters, got {0}")]
    InvalidLength(usize),

    /// A character outside the base32 alphabet, or non-zero padding bits.
    #[error("address is not valid base32")]
    InvalidEncoding,

    /// The trailing checksum does not match the key.
    #[error("address checksum mismatch")]
    ChecksumMismatch,
}

/// A 32-byte account public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; KEY_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0; KEY_LEN]);

    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = Sha512_256::digest(self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(KEY_LEN + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&raw))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let raw = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|_| AddressError::InvalidEncoding)?;
        if raw.len() != KEY_LEN + CHECKSUM_LEN {
            return Err(AddressError::InvalidEncoding);
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&raw[..KEY_LEN]);
        let address = Address(key);
        if address.checksum()[..] != raw[KEY_LEN..] {
            return Err(AddressError::ChecksumMismatch);
        }
        Ok(address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
