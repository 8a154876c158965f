use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::Log;

use crate::error::MalformedLogError;

/// An event log as returned by the node, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl RawLog {
    /// Build a log from `0x`-prefixed hex strings, the shape JSON-RPC returns them in.
    /// Each topic must be a full 32-byte word.
    pub fn from_hex(
        data: &str,
        topics: &[&str],
        block_number: u64,
        transaction_hash: B256,
    ) -> Result<Self, MalformedLogError> {
        let data = decode_hex("data", data)?;

        let topics = topics
            .iter()
            .map(|topic| {
                let bytes = decode_hex("topic", topic)?;
                if bytes.len() != 32 {
                    return Err(MalformedLogError::InvalidHex {
                        field: "topic",
                        reason: format!("expected 32 bytes, found {}", bytes.len()),
                    });
                }
                Ok(B256::from_slice(&bytes))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            topics,
            data: Bytes::from(data),
            block_number,
            transaction_hash,
            log_index: 0,
        })
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, MalformedLogError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| MalformedLogError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

impl From<&Log> for RawLog {
    fn from(log: &Log) -> Self {
        let inner = &log.inner;
        Self {
            topics: inner.data.topics().to_vec(),
            data: inner.data.data.clone(),
            block_number: log.block_number.unwrap_or(0),
            transaction_hash: log.transaction_hash.unwrap_or_default(),
            log_index: log.log_index.unwrap_or(0),
        }
    }
}

/// A decoded token transfer. Only the decoder produces these.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TransferEvent {
    pub from_address: Address,
    pub to_address: Address,
    /// Token base units.
    pub amount: U256,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl TransferEvent {
    pub(crate) fn new(
        from_address: Address,
        to_address: Address,
        amount: U256,
        raw: &RawLog,
    ) -> Self {
        Self {
            from_address,
            to_address,
            amount,
            block_number: raw.block_number,
            transaction_hash: raw.transaction_hash,
            log_index: raw.log_index,
        }
    }

    pub fn address(&self, role: AddressRole) -> Address {
        match role {
            AddressRole::Sender => self.from_address,
            AddressRole::Receiver => self.to_address,
        }
    }
}

/// Which side of a transfer an address is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressRole {
    Sender,
    Receiver,
}

/// Lowercase `0x`-prefixed rendering, as the node prints addresses in topics.
pub fn short_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_parses_topics_and_data() {
        let raw = RawLog::from_hex(
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
            &[
                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
                "0x0000000000000000000000002222222222222222222222222222222222222222",
            ],
            42,
            B256::ZERO,
        )
        .unwrap();

        assert_eq!(raw.topics.len(), 2);
        assert_eq!(raw.data.len(), 32);
        assert_eq!(raw.block_number, 42);
    }

    #[test]
    fn test_from_hex_rejects_short_topic() {
        // 39 hex characters of address: one nibble short of a full word
        let err = RawLog::from_hex(
            "0x00",
            &["0x000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"],
            1,
            B256::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, MalformedLogError::InvalidHex { field: "topic", .. }));
    }

    #[test]
    fn test_from_hex_rejects_non_hex_data() {
        let err = RawLog::from_hex("0xzz", &[], 1, B256::ZERO).unwrap_err();
        assert!(matches!(err, MalformedLogError::InvalidHex { field: "data", .. }));
    }

    #[test]
    fn test_short_hex_is_lowercase() {
        let address = Address::from([0xab; 20]);
        assert_eq!(short_hex(&address), format!("0x{}", "ab".repeat(20)));
    }
}
