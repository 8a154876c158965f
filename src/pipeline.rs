use alloy::primitives::Address;
use futures::future;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::analytics::stats::{StatsAggregator, StatsResult};
use crate::anomaly::{SuspicionDetector, SuspicionResult};
use crate::config::{Config, WindowConfig};
use crate::error::AnalyticsError;
use crate::indexer::chain::{AddressInfo, LedgerSource, LogQuery, TransactionInfo};
use crate::indexer::decoder::{DecodePolicy, LogDecoder};
use crate::indexer::transfer_set::TransferSet;
use crate::indexer::types::{short_hex, TransferEvent};

/// Everything the full report shows. Enrichment that could not be fetched is `None`.
#[derive(Debug, Clone)]
pub struct Report {
    pub largest: TransferEvent,
    pub block_timestamp: Option<u64>,
    pub recipient: Option<AddressInfo>,
    pub gas_price: Option<u128>,
    pub transaction: Option<TransactionInfo>,
    pub stats_blocks: u64,
    pub stats: Option<StatsResult>,
    pub suspicion: Option<SuspicionResult>,
    /// Malformed logs dropped while building the report.
    pub skipped_logs: usize,
}

/// Fetches logs for the watched token, decodes them and runs the analytics over them.
pub struct ReportPipeline<L> {
    ledger: L,
    contract: Address,
    decoder: LogDecoder,
    policy: DecodePolicy,
    detector: SuspicionDetector,
    window: WindowConfig,
    skipped: AtomicUsize,
}

impl<L: LedgerSource> ReportPipeline<L> {
    pub fn new(ledger: L, config: &Config) -> eyre::Result<Self> {
        Ok(Self {
            ledger,
            contract: config.contract_address()?,
            decoder: LogDecoder::new(config.event_signature()?),
            policy: config.decoder.policy,
            detector: SuspicionDetector::new(config.suspicion.threshold),
            window: config.window.clone(),
            skipped: AtomicUsize::new(0),
        })
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Malformed logs dropped under [`DecodePolicy::SkipMalformed`] so far.
    pub fn skipped_logs(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    fn query(&self, from_block: u64) -> LogQuery {
        LogQuery::new(self.contract, self.decoder.signature(), from_block)
    }

    async fn fetch_transfers(&self, query: &LogQuery) -> Result<TransferSet, AnalyticsError> {
        let logs = self.ledger.fetch_logs(query).await?;
        match self.policy {
            DecodePolicy::FailFast => Ok(self.decoder.decode_batch(&logs)?),
            DecodePolicy::SkipMalformed => {
                let (transfers, skipped) = self.decoder.decode_batch_lossy(&logs);
                self.skipped.fetch_add(skipped.len(), Ordering::Relaxed);
                Ok(transfers)
            }
        }
    }

    /// Transfers in the last `max_block_history` blocks.
    pub async fn recent_transfers(&self) -> Result<TransferSet, AnalyticsError> {
        let tip = self.ledger.current_block_number().await?;
        let from_block = tip.saturating_sub(self.window.max_block_history);
        tracing::info!(from_block, tip, "Fetching recent transfers");
        self.fetch_transfers(&self.query(from_block)).await
    }

    /// The largest transfer in the recent window. An empty window is `EmptySet`.
    pub async fn largest_transfer(&self) -> Result<TransferEvent, AnalyticsError> {
        let transfers = self.recent_transfers().await?;
        let largest = transfers.max_by_amount()?.clone();
        tracing::info!(
            candidates = transfers.len(),
            amount = %largest.amount,
            to = %short_hex(&largest.to_address),
            block = largest.block_number,
            "Largest transfer found"
        );
        Ok(largest)
    }

    /// Stats over `[from_block, to_block]`; `to_block` defaults to the current tip.
    pub async fn transfer_stats(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<StatsResult, AnalyticsError> {
        let to_block = match to_block {
            Some(block) => block,
            None => self.ledger.current_block_number().await?,
        };

        let transfers = self
            .fetch_transfers(&self.query(from_block).to_block(to_block))
            .await?;
        Ok(StatsAggregator::aggregate(&transfers))
    }

    /// Check the last `blocks` blocks of an address's activity for suspicious patterns.
    pub async fn check_suspicious(
        &self,
        address: Address,
        blocks: u64,
    ) -> Result<SuspicionResult, AnalyticsError> {
        let tip = self.ledger.current_block_number().await?;
        let from_block = tip.saturating_sub(blocks);

        let sent_query = self.query(from_block).sender(address);
        let received_query = self.query(from_block).receiver(address);
        let (sent, received) = future::try_join(
            self.fetch_transfers(&sent_query),
            self.fetch_transfers(&received_query),
        )
        .await?;

        tracing::info!(
            address = %short_hex(&address),
            from_block,
            sent = sent.len(),
            received = received.len(),
            "Checking for suspicious activity"
        );

        Ok(self.detector.detect(&sent, &received))
    }

    /// Largest transfer in the recent window, enriched with ledger details, followed by
    /// window stats and a suspicion check on the recipient.
    pub async fn run_report(&self) -> Result<Report, AnalyticsError> {
        let skipped_before = self.skipped_logs();
        let largest = self.largest_transfer().await?;

        let (block_timestamp, recipient, gas_price, transaction) = future::join4(
            self.ledger.block_timestamp(largest.block_number),
            self.ledger.address_info(largest.to_address),
            self.ledger.gas_price(),
            self.ledger.transaction_info(largest.transaction_hash),
        )
        .await;

        let block_timestamp = enrichment("block timestamp", block_timestamp).flatten();
        let recipient = enrichment("recipient details", recipient);
        let gas_price = enrichment("gas price", gas_price);
        let transaction = enrichment("transaction details", transaction).flatten();

        let stats_blocks = self.window.stats_blocks;
        let stats = match self.ledger.current_block_number().await {
            Ok(tip) => enrichment(
                "transfer stats",
                self.transfer_stats(tip.saturating_sub(stats_blocks), Some(tip))
                    .await,
            ),
            Err(e) => enrichment::<StatsResult, _>("transfer stats", Err(e)),
        };

        let suspicion = enrichment(
            "suspicion check",
            self.check_suspicious(largest.to_address, self.window.suspicion_blocks)
                .await,
        );

        Ok(Report {
            largest,
            block_timestamp,
            recipient,
            gas_price,
            transaction,
            stats_blocks,
            stats,
            suspicion,
            skipped_logs: self.skipped_logs() - skipped_before,
        })
    }
}

/// Report sections beyond the largest transfer are best-effort.
fn enrichment<T, E: std::fmt::Display>(section: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(section, error = %e, "Report section unavailable");
            None
        }
    }
}
