//! Unsigned transaction decoding.

use rmpv::Value;
use std::fmt;
use thiserror::Error;

use crate::algorand::address::Address;

/// Domain-separation prefix prepended to transaction bytes before signing.
pub const SIGNING_PREFIX: &[u8] = b"TX";

/// Errors produced while decoding an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The bytes are not valid msgpack.
    #[error("invalid msgpack: {0}")]
    Msgpack(String),

    /// A complete value was read but bytes remain.
    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    /// The top-level value is not a map.
    #[error("transaction is not a map")]
    NotAMap,

    /// A map key is not a string.
    #[error("transaction map has a non-string key")]
    NonStringKey,

    /// A required field is absent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field has the wrong type or size.
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The `type` field names no known transaction type.
    #[error("unknown transaction type '{0}'")]
    UnknownType(String),
}

/// Transaction type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnType {
    Payment,
    KeyRegistration,
    AssetConfig,
    AssetTransfer,
    AssetFreeze,
    ApplicationCall,
    StateProof,
    Heartbeat,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Payment => "pay",
            TxnType::KeyRegistration => "keyreg",
            TxnType::AssetConfig => "acfg",
            TxnType::AssetTransfer => "axfer",
            TxnType::AssetFreeze => "afrz",
            TxnType::ApplicationCall => "appl",
            TxnType::StateProof => "stpf",
            TxnType::Heartbeat => "hb",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pay" => Some(TxnType::Payment),
            "keyreg" => Some(TxnType::KeyRegistration),
            "acfg" => Some(TxnType::AssetConfig),
            "axfer" => Some(TxnType::AssetTransfer),
            "afrz" => Some(TxnType::AssetFreeze),
            "appl" => Some(TxnType::ApplicationCall),
            "stpf" => Some(TxnType::StateProof),
            "hb" => Some(TxnType::Heartbeat),
            _ => None,
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A decoded unsigned transaction.
///
/// Holds a structured view of the common header and the payment / asset /
/// application fields a host typically shows before asking for consent, plus
/// the exact bytes it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub txn_type: TxnType,
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: Option<String>,
    pub genesis_hash: Option<[u8; 32]>,
    pub group: Option<[u8; 32]>,
    pub lease: Option<[u8; 32]>,
    pub note: Option<Vec<u8>>,
    pub rekey_to: Option<Address>,
    /// Payment receiver (`pay`).
    pub receiver: Option<Address>,
    /// Payment amount in microAlgos (`pay`).
    pub amount: u64,
    pub close_remainder_to: Option<Address>,
    /// Asset being transferred (`axfer`).
    pub asset_id: Option<u64>,
    pub asset_amount: u64,
    pub asset_receiver: Option<Address>,
    pub asset_close_to: Option<Address>,
    /// Application being called (`appl`).
    pub app_id: Option<u64>,
    encoded: Vec<u8>,
}

impl Transaction {
    /// Decode a msgpack-encoded unsigned transaction.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = bytes;
        let value = rmpv::decode::read_value(&mut cursor)
            .map_err(|e| DecodeError::Msgpack(e.to_string()))?;
        if !cursor.is_empty() {
            return Err(DecodeError::TrailingBytes(cursor.len()));
        }

        let fields = Fields::from_value(&value)?;

        let tag = fields
            .string("type")?
            .ok_or(DecodeError::MissingField("type"))?;
        let txn_type = TxnType::from_tag(&tag).ok_or(DecodeError::UnknownType(tag))?;

        Ok(Self {
            txn_type,
            sender: fields
                .address("snd")?
                .ok_or(DecodeError::MissingField("snd"))?,
            fee: fields.uint("fee")?.unwrap_or(0),
            first_valid: fields.uint("fv")?.unwrap_or(0),
            last_valid: fields.uint("lv")?.unwrap_or(0),
            genesis_id: fields.string("gen")?,
            genesis_hash: fields.bytes32("gh")?,
            group: fields.bytes32("grp")?,
            lease: fields.bytes32("lx")?,
            note: fields.binary("note")?,
            rekey_to: fields.address("rekey")?,
            receiver: fields.address("rcv")?,
            amount: fields.uint("amt")?.unwrap_or(0),
            close_remainder_to: fields.address("close")?,
            asset_id: fields.uint("xaid")?,
            asset_amount: fields.uint("aamt")?.unwrap_or(0),
            asset_receiver: fields.address("arcv")?,
            asset_close_to: fields.address("aclose")?,
            app_id: fields.uint("apid")?,
            encoded: bytes.to_vec(),
        })
    }

    /// The bytes this transaction was decoded from.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Bytes a key signs: `"TX"` followed by the encoded transaction.
    pub fn bytes_to_sign(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNING_PREFIX.len() + self.encoded.len());
        out.extend_from_slice(SIGNING_PREFIX);
        out.extend_from_slice(&self.encoded);
        out
    }
}

/// Borrowed view over the string-keyed entries of a msgpack map.
struct Fields<'a> {
    entries: Vec<(&'a str, &'a Value)>,
}

impl<'a> Fields<'a> {
    fn from_value(value: &'a Value) -> Result<Self, DecodeError> {
        let map = value.as_map().ok_or(DecodeError::NotAMap)?;
        let entries = map
            .iter()
            .map(|(k, v)| k.as_str().map(|k| (k, v)).ok_or(DecodeError::NonStringKey))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    fn uint(&self, field: &'static str) -> Result<Option<u64>, DecodeError> {
        self.get(field)
            .map(|v| {
                v.as_u64().ok_or_else(|| DecodeError::InvalidField {
                    field,
                    reason: "expected unsigned integer".into(),
                })
            })
            .transpose()
    }

    fn string(&self, field: &'static str) -> Result<Option<String>, DecodeError> {
        self.get(field)
            .map(|v| {
                v.as_str().map(str::to_owned).ok_or_else(|| DecodeError::InvalidField {
                    field,
                    reason: "expected string".into(),
                })
            })
            .transpose()
    }

    fn binary(&self, field: &'static str) -> Result<Option<Vec<u8>>, DecodeError> {
        self.get(field)
            .map(|v| match v {
                Value::Binary(b) => Ok(b.clone()),
                _ => Err(DecodeError::InvalidField {
                    field,
                    reason: "expected binary".into(),
                }),
            })
            .transpose()
    }

    fn bytes32(&self, field: &'static str) -> Result<Option<[u8; 32]>, DecodeError> {
        self.binary(field)?
            .map(|b| {
                <[u8; 32]>::try_from(b.as_slice()).map_err(|_| DecodeError::InvalidField {
                    field,
                    reason: format!("expected 32 bytes, got {}", b.len()),
                })
            })
            .transpose()
    }

    fn address(&self, field: &'static str) -> Result<Option<Address>, DecodeError> {
        Ok(self.bytes32(field)?.map(Address::from_bytes))
    }
}
