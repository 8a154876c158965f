use alloy::primitives::{Address, U256};
use bigdecimal::num_bigint::{BigInt, Sign};
use std::collections::HashSet;

use crate::error::EmptySetError;

use super::types::{AddressRole, TransferEvent};

/// Transfers decoded from one query, in decode order. Read-only once built;
/// filtered views are new sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSet {
    transfers: Vec<TransferEvent>,
}

impl TransferSet {
    pub(crate) fn new(transfers: Vec<TransferEvent>) -> Self {
        Self { transfers }
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransferEvent> {
        self.transfers.iter()
    }

    /// The transfer with the greatest amount. On ties the earliest one wins.
    pub fn max_by_amount(&self) -> Result<&TransferEvent, EmptySetError> {
        let mut iter = self.transfers.iter();
        let first = iter.next().ok_or(EmptySetError)?;
        Ok(iter.fold(first, |best, t| if t.amount > best.amount { t } else { best }))
    }

    /// Up to `k` transfers, largest first. Equal amounts keep decode order.
    pub fn top_k(&self, k: usize) -> Vec<&TransferEvent> {
        let mut ranked: Vec<&TransferEvent> = self.transfers.iter().collect();
        // sort_by is stable, so ties stay in insertion order
        ranked.sort_by(|a, b| b.amount.cmp(&a.amount));
        ranked.truncate(k);
        ranked
    }

    pub fn filter_by_address(&self, address: Address, role: AddressRole) -> TransferSet {
        self.transfers
            .iter()
            .filter(|t| t.address(role) == address)
            .cloned()
            .collect()
    }

    pub fn unique_addresses(&self, role: AddressRole) -> HashSet<Address> {
        self.transfers.iter().map(|t| t.address(role)).collect()
    }

    /// Sum of all amounts without a width limit.
    pub fn total_amount(&self) -> BigInt {
        self.transfers
            .iter()
            .fold(BigInt::from(0u8), |acc, t| acc + to_bigint(t.amount))
    }
}

impl FromIterator<TransferEvent> for TransferSet {
    fn from_iter<I: IntoIterator<Item = TransferEvent>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TransferSet {
    type Item = &'a TransferEvent;
    type IntoIter = std::slice::Iter<'a, TransferEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.transfers.iter()
    }
}

pub fn to_bigint(amount: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &amount.to_be_bytes::<32>())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::B256;

    use crate::indexer::types::RawLog;

    pub(crate) fn transfer(from: u8, to: u8, amount: u64) -> TransferEvent {
        let raw = RawLog {
            topics: Vec::new(),
            data: Default::default(),
            block_number: 100,
            transaction_hash: B256::with_last_byte(from),
            log_index: 0,
        };
        TransferEvent::new(
            Address::repeat_byte(from),
            Address::repeat_byte(to),
            U256::from(amount),
            &raw,
        )
    }

    fn sample() -> TransferSet {
        TransferSet::new(vec![
            transfer(1, 2, 10),
            transfer(3, 4, 30),
            transfer(5, 2, 30),
            transfer(1, 6, 20),
        ])
    }

    #[test]
    fn test_max_by_amount_prefers_first_on_tie() {
        let set = sample();
        let max = set.max_by_amount().unwrap();
        assert_eq!(max.from_address, Address::repeat_byte(3));
        assert_eq!(max, set.top_k(1)[0]);
    }

    #[test]
    fn test_max_by_amount_empty() {
        assert_eq!(TransferSet::default().max_by_amount(), Err(EmptySetError));
    }

    #[test]
    fn test_top_k_order_and_length() {
        let set = sample();
        let top: Vec<u64> = set.top_k(3).iter().map(|t| t.amount.to::<u64>()).collect();
        assert_eq!(top, vec![30, 30, 20]);
        assert_eq!(set.top_k(3)[0].from_address, Address::repeat_byte(3));
        assert_eq!(set.top_k(3)[1].from_address, Address::repeat_byte(5));

        assert_eq!(set.top_k(10).len(), 4);
        assert!(set.top_k(0).is_empty());
    }

    #[test]
    fn test_filter_by_address_keeps_order() {
        let set = sample();
        let sent = set.filter_by_address(Address::repeat_byte(1), AddressRole::Sender);
        let amounts: Vec<u64> = sent.iter().map(|t| t.amount.to::<u64>()).collect();
        assert_eq!(amounts, vec![10, 20]);

        let received = set.filter_by_address(Address::repeat_byte(2), AddressRole::Receiver);
        assert_eq!(received.len(), 2);
    }

    #[test]
    fn test_unique_addresses() {
        let set = sample();
        assert_eq!(set.unique_addresses(AddressRole::Sender).len(), 3);
        assert_eq!(set.unique_addresses(AddressRole::Receiver).len(), 3);
    }

    #[test]
    fn test_total_amount_does_not_wrap() {
        let raw = RawLog {
            topics: Vec::new(),
            data: Default::default(),
            block_number: 1,
            transaction_hash: B256::ZERO,
            log_index: 0,
        };
        let big = TransferEvent::new(Address::ZERO, Address::ZERO, U256::MAX, &raw);
        let set = TransferSet::new(vec![big.clone(), big]);

        let expected = to_bigint(U256::MAX) * BigInt::from(2u8);
        assert_eq!(set.total_amount(), expected);
    }
}
