use crate::indexer::transfer_set::TransferSet;

use super::rules;
use super::types::SuspicionResult;

pub const DEFAULT_THRESHOLD: usize = 50;

/// Runs the concentration rules over one address's sent and received transfers.
#[derive(Debug, Clone, Copy)]
pub struct SuspicionDetector {
    threshold: usize,
}

impl Default for SuspicionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SuspicionDetector {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn detect(&self, sent: &TransferSet, received: &TransferSet) -> SuspicionResult {
        let mut result = SuspicionResult {
            total_sent: sent.total_amount(),
            total_received: received.total_amount(),
            transaction_count: sent.len() + received.len(),
            patterns: Default::default(),
        };

        // Rules are independent; both may fire
        result
            .patterns
            .extend(rules::check_fan_out(sent, self.threshold));
        result
            .patterns
            .extend(rules::check_fan_in(received, self.threshold));

        for pattern in &result.patterns {
            tracing::warn!(
                pattern = pattern.as_str(),
                threshold = self.threshold,
                sent = sent.len(),
                received = received.len(),
                "SUSPICIOUS PATTERN"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::types::PatternTag;
    use crate::indexer::transfer_set::tests::transfer;
    use bigdecimal::num_bigint::BigInt;

    #[test]
    fn test_detect_totals_and_count() {
        let sent: TransferSet = vec![transfer(1, 2, 10), transfer(1, 3, 5)]
            .into_iter()
            .collect();
        let received: TransferSet = vec![transfer(4, 1, 7)].into_iter().collect();

        let result = SuspicionDetector::default().detect(&sent, &received);
        assert_eq!(result.total_sent, BigInt::from(15u8));
        assert_eq!(result.total_received, BigInt::from(7u8));
        assert_eq!(result.transaction_count, 3);
        assert!(!result.is_suspicious());
    }

    #[test]
    fn test_both_rules_fire() {
        let sent: TransferSet = (0..51).map(|_| transfer(1, 0xa, 1)).collect();
        let received: TransferSet = (0..51).map(|_| transfer(0xb, 1, 1)).collect();

        let result = SuspicionDetector::default().detect(&sent, &received);
        assert!(result.patterns.contains(&PatternTag::FanOutToSameAddress));
        assert!(result.patterns.contains(&PatternTag::FanInFromSameAddress));
        assert_eq!(result.transaction_count, 102);
    }

    #[test]
    fn test_boundary_at_threshold() {
        let sent: TransferSet = (0..50).map(|_| transfer(1, 0xa, 1)).collect();
        let result = SuspicionDetector::default().detect(&sent, &TransferSet::default());
        assert!(result.patterns.is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let sent: TransferSet = (0..3).map(|_| transfer(1, 0xa, 1)).collect();
        let result = SuspicionDetector::new(2).detect(&sent, &TransferSet::default());
        assert_eq!(
            result.patterns.into_iter().collect::<Vec<_>>(),
            vec![PatternTag::FanOutToSameAddress]
        );
    }
}
