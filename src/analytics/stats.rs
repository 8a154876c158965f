use bigdecimal::num_bigint::BigInt;

use crate::indexer::transfer_set::TransferSet;
use crate::indexer::types::AddressRole;

/// Aggregate figures over a set of transfers. Volumes are in token base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsResult {
    pub count: usize,
    pub total_volume: BigInt,
    pub unique_senders: usize,
    pub unique_receivers: usize,
    /// Floor of `total_volume / count`; zero for an empty set.
    pub average_volume: BigInt,
}

pub struct StatsAggregator;

impl StatsAggregator {
    pub fn aggregate(transfers: &TransferSet) -> StatsResult {
        let count = transfers.len();
        let total_volume = transfers.total_amount();

        let average_volume = if count > 0 {
            // Integer division truncates, which is floor for non-negative totals
            &total_volume / BigInt::from(count)
        } else {
            BigInt::from(0u8)
        };

        let stats = StatsResult {
            count,
            unique_senders: transfers.unique_addresses(AddressRole::Sender).len(),
            unique_receivers: transfers.unique_addresses(AddressRole::Receiver).len(),
            total_volume,
            average_volume,
        };

        tracing::debug!(
            count = stats.count,
            unique_senders = stats.unique_senders,
            unique_receivers = stats.unique_receivers,
            total_volume = %stats.total_volume,
            "Aggregated transfer stats"
        );

        stats
    }
}
