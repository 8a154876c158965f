use crate::indexer::transfer_set::TransferSet;
use crate::indexer::types::AddressRole;

use super::types::PatternTag;

/// More than `threshold` outgoing transfers, every one to the same receiver.
pub fn check_fan_out(sent: &TransferSet, threshold: usize) -> Option<PatternTag> {
    concentrated(sent, AddressRole::Receiver, threshold).then_some(PatternTag::FanOutToSameAddress)
}

/// More than `threshold` incoming transfers, every one from the same sender.
pub fn check_fan_in(received: &TransferSet, threshold: usize) -> Option<PatternTag> {
    concentrated(received, AddressRole::Sender, threshold)
        .then_some(PatternTag::FanInFromSameAddress)
}

fn concentrated(transfers: &TransferSet, counterparty: AddressRole, threshold: usize) -> bool {
    transfers.len() > threshold && transfers.unique_addresses(counterparty).len() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::transfer_set::tests::transfer;

    fn repeated(from: u8, to: u8, n: usize) -> TransferSet {
        (0..n).map(|_| transfer(from, to, 1)).collect()
    }

    #[test]
    fn test_fan_out_strictly_above_threshold() {
        assert_eq!(
            check_fan_out(&repeated(1, 0xa, 51), 50),
            Some(PatternTag::FanOutToSameAddress)
        );
        assert_eq!(check_fan_out(&repeated(1, 0xa, 50), 50), None);
    }

    #[test]
    fn test_fan_out_needs_single_receiver() {
        let mut transfers: Vec<_> = repeated(1, 0xa, 60).iter().cloned().collect();
        transfers.push(transfer(1, 0xb, 1));
        let sent: TransferSet = transfers.into_iter().collect();
        assert_eq!(check_fan_out(&sent, 50), None);
    }

    #[test]
    fn test_fan_in() {
        assert_eq!(
            check_fan_in(&repeated(0xa, 1, 51), 50),
            Some(PatternTag::FanInFromSameAddress)
        );
        assert_eq!(check_fan_in(&repeated(0xa, 1, 50), 50), None);
        assert_eq!(check_fan_in(&TransferSet::default(), 0), None);
    }
}
