use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use serde::Deserialize;

use crate::error::MalformedLogError;

use super::transfer_set::TransferSet;
use super::types::{short_hex, RawLog, TransferEvent};

// Generate the Transfer event ABI using alloy's sol! macro.
// Transfer::SIGNATURE_HASH is the default topic 0 the decoder accepts.
sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Signature hash of `Transfer(address,address,uint256)`.
pub const TRANSFER_SIGNATURE: B256 = Transfer::SIGNATURE_HASH;

/// What a batch decode does when it meets a log it cannot decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// The first malformed log aborts the batch with its error.
    #[default]
    FailFast,
    /// Malformed logs are dropped and reported next to the decoded set.
    SkipMalformed,
}

/// A log dropped by [`LogDecoder::decode_batch_lossy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLog {
    pub index: usize,
    pub error: MalformedLogError,
}

/// Decodes logs of an event with two indexed addresses and one `uint256` in data.
#[derive(Debug, Clone, Copy)]
pub struct LogDecoder {
    signature: B256,
}

impl Default for LogDecoder {
    fn default() -> Self {
        Self::new(TRANSFER_SIGNATURE)
    }
}

impl LogDecoder {
    pub fn new(signature: B256) -> Self {
        Self { signature }
    }

    pub fn signature(&self) -> B256 {
        self.signature
    }

    /// Decode a single log.
    ///
    /// Fails if the log does not carry exactly 3 topics (signature + from + to),
    /// if topic 0 is not the configured signature, or if the data payload is not
    /// a single 32-byte word.
    pub fn decode(&self, raw: &RawLog) -> Result<TransferEvent, MalformedLogError> {
        let topics = &raw.topics;
        if topics.len() != 3 {
            return Err(MalformedLogError::TopicCount {
                found: topics.len(),
            });
        }

        if topics[0] != self.signature {
            return Err(MalformedLogError::SignatureMismatch {
                expected: self.signature,
                found: topics[0],
            });
        }

        let data = raw.data.as_ref();
        if data.len() != 32 {
            return Err(MalformedLogError::DataLength { found: data.len() });
        }

        let from = topic_address(&topics[1], raw);
        let to = topic_address(&topics[2], raw);
        let amount = U256::from_be_slice(data);

        Ok(TransferEvent::new(from, to, amount, raw))
    }

    /// Decode every log, aborting on the first malformed one.
    pub fn decode_batch(&self, logs: &[RawLog]) -> Result<TransferSet, MalformedLogError> {
        let mut transfers = Vec::with_capacity(logs.len());
        for (index, log) in logs.iter().enumerate() {
            match self.decode(log) {
                Ok(transfer) => transfers.push(transfer),
                Err(e) => {
                    tracing::debug!(
                        index,
                        block = log.block_number,
                        tx_hash = %log.transaction_hash,
                        error = %e,
                        "Malformed log, aborting batch"
                    );
                    return Err(e);
                }
            }
        }
        Ok(TransferSet::new(transfers))
    }

    /// Decode every log, dropping malformed ones and returning them alongside the set.
    pub fn decode_batch_lossy(&self, logs: &[RawLog]) -> (TransferSet, Vec<SkippedLog>) {
        let mut transfers = Vec::with_capacity(logs.len());
        let mut skipped = Vec::new();

        for (index, log) in logs.iter().enumerate() {
            match self.decode(log) {
                Ok(transfer) => transfers.push(transfer),
                Err(error) => {
                    tracing::warn!(
                        index,
                        block = log.block_number,
                        tx_hash = %log.transaction_hash,
                        error = %error,
                        "Skipping malformed log"
                    );
                    skipped.push(SkippedLog { index, error });
                }
            }
        }

        if !skipped.is_empty() {
            tracing::warn!(
                skipped = skipped.len(),
                decoded = transfers.len(),
                "Skipped malformed logs"
            );
        }

        (TransferSet::new(transfers), skipped)
    }
}

/// The address is the low 20 bytes of the topic word. Topics are left-zero-padded;
/// anything in the high 12 bytes means the source broke that convention.
fn topic_address(topic: &B256, raw: &RawLog) -> Address {
    if topic[..12].iter().any(|b| *b != 0) {
        tracing::warn!(
            topic = %topic,
            block = raw.block_number,
            tx_hash = %raw.transaction_hash,
            "Address topic is not zero-padded, using low 20 bytes"
        );
    }
    let address = Address::from_word(*topic);
    tracing::trace!(address = %short_hex(&address), "Decoded topic address");
    address
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, Bytes};

    fn transfer_log(data: &str, from: &str, to: &str) -> RawLog {
        RawLog::from_hex(
            data,
            &[
                "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef",
                from,
                to,
            ],
            15_000_000,
            B256::ZERO,
        )
        .unwrap()
    }

    #[test]
    fn test_signature_constant() {
        assert_eq!(
            TRANSFER_SIGNATURE,
            b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
        );
    }

    #[test]
    fn test_decode_transfer() {
        let log = transfer_log(
            "0x00000000000000000000000000000000000000000000000006f05b59d3b20000",
            "0x000000000000000000000000123456789abcdef123456789abcdef123456789a",
            "0x000000000000000000000000abcdef123456789abcdef123456789abcdef1234",
        );

        let transfer = LogDecoder::default().decode(&log).unwrap();
        assert_eq!(
            transfer.from_address,
            address!("123456789abcdef123456789abcdef123456789a")
        );
        assert_eq!(
            transfer.to_address,
            address!("abcdef123456789abcdef123456789abcdef1234")
        );
        assert_eq!(transfer.amount, U256::from(500_000_000_000_000_000u64));
        assert_eq!(transfer.block_number, 15_000_000);
    }

    #[test]
    fn test_amount_is_big_endian_word() {
        let mut word = [0u8; 32];
        word[0] = 0x01;
        word[31] = 0x02;
        let mut log = transfer_log(
            "0x00",
            "0x0000000000000000000000002222222222222222222222222222222222222222",
            "0x0000000000000000000000003333333333333333333333333333333333333333",
        );
        log.data = Bytes::copy_from_slice(&word);

        let transfer = LogDecoder::default().decode(&log).unwrap();
        assert_eq!(transfer.amount, (U256::from(1) << 248usize) + U256::from(2));
    }

    #[test]
    fn test_wrong_topic_count() {
        let mut log = transfer_log(
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
            "0x0000000000000000000000002222222222222222222222222222222222222222",
            "0x0000000000000000000000003333333333333333333333333333333333333333",
        );
        log.topics.pop();

        let err = LogDecoder::default().decode(&log).unwrap_err();
        assert_eq!(err, MalformedLogError::TopicCount { found: 2 });
    }

    #[test]
    fn test_wrong_signature() {
        let approval = b256!("8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925");
        let log = transfer_log(
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
            "0x0000000000000000000000002222222222222222222222222222222222222222",
            "0x0000000000000000000000003333333333333333333333333333333333333333",
        );

        let err = LogDecoder::new(approval).decode(&log).unwrap_err();
        assert!(matches!(err, MalformedLogError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_configured_signature_accepted() {
        let approval = b256!("8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925");
        let mut log = transfer_log(
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
            "0x0000000000000000000000002222222222222222222222222222222222222222",
            "0x0000000000000000000000003333333333333333333333333333333333333333",
        );
        log.topics[0] = approval;

        assert!(LogDecoder::new(approval).decode(&log).is_ok());
    }

    #[test]
    fn test_wrong_data_length() {
        let log = transfer_log(
            "0x0de0b6b3a7640000",
            "0x0000000000000000000000002222222222222222222222222222222222222222",
            "0x0000000000000000000000003333333333333333333333333333333333333333",
        );

        let err = LogDecoder::default().decode(&log).unwrap_err();
        assert_eq!(err, MalformedLogError::DataLength { found: 8 });
    }

    #[test]
    fn test_unpadded_topic_takes_low_bytes() {
        let log = transfer_log(
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
            "0xffffffffffffffffffffffff2222222222222222222222222222222222222222",
            "0x0000000000000000000000003333333333333333333333333333333333333333",
        );

        let transfer = LogDecoder::default().decode(&log).unwrap();
        assert_eq!(
            transfer.from_address,
            address!("2222222222222222222222222222222222222222")
        );
    }

    #[test]
    fn test_batch_fail_fast_and_lossy() {
        let good = transfer_log(
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
            "0x0000000000000000000000002222222222222222222222222222222222222222",
            "0x0000000000000000000000003333333333333333333333333333333333333333",
        );
        let mut short_data = good.clone();
        short_data.data = Bytes::new();
        let mut missing_topic = good.clone();
        missing_topic.topics.pop();
        let logs = vec![good.clone(), short_data, good.clone(), missing_topic, good];
        let decoder = LogDecoder::default();

        // The first bad log wins, not the later one
        let err = decoder.decode_batch(&logs).unwrap_err();
        assert_eq!(err, MalformedLogError::DataLength { found: 0 });

        let (set, skipped) = decoder.decode_batch_lossy(&logs);
        assert_eq!(set.len(), 3);
        assert_eq!(
            skipped,
            vec![
                SkippedLog {
                    index: 1,
                    error: MalformedLogError::DataLength { found: 0 },
                },
                SkippedLog {
                    index: 3,
                    error: MalformedLogError::TopicCount { found: 2 },
                },
            ]
        );
    }
}
