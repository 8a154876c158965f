use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter};
use async_trait::async_trait;
use std::time::Duration;

use crate::error::FetchError;

use super::types::RawLog;

/// Parameters of one `eth_getLogs` query against the watched token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub from_block: u64,
    /// `None` queries up to the latest block.
    pub to_block: Option<u64>,
    pub contract: Address,
    pub event_signature: B256,
    /// Restrict topic 1 (the sender) to this address.
    pub sender: Option<Address>,
    /// Restrict topic 2 (the receiver) to this address.
    pub receiver: Option<Address>,
}

impl LogQuery {
    pub fn new(contract: Address, event_signature: B256, from_block: u64) -> Self {
        Self {
            from_block,
            to_block: None,
            contract,
            event_signature,
            sender: None,
            receiver: None,
        }
    }

    pub fn to_block(mut self, to_block: u64) -> Self {
        self.to_block = Some(to_block);
        self
    }

    pub fn sender(mut self, address: Address) -> Self {
        self.sender = Some(address);
        self
    }

    pub fn receiver(mut self, address: Address) -> Self {
        self.receiver = Some(address);
        self
    }

    fn to_filter(&self) -> Filter {
        let mut filter = Filter::new()
            .address(self.contract)
            .event_signature(self.event_signature)
            .from_block(self.from_block);

        if let Some(to_block) = self.to_block {
            filter = filter.to_block(to_block);
        }
        // Indexed addresses are left-padded 32-byte words
        if let Some(sender) = self.sender {
            filter = filter.topic1(sender.into_word());
        }
        if let Some(receiver) = self.receiver {
            filter = filter.topic2(receiver.into_word());
        }
        filter
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInfo {
    pub address: Address,
    pub is_contract: bool,
    /// Wei.
    pub native_balance: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    /// Wei.
    pub value: U256,
    pub gas_used: u64,
    /// Wei per gas actually paid.
    pub gas_price: u128,
    pub success: bool,
}

/// Read access to the ledger. Everything here may fail with a transport error,
/// which callers receive as an opaque [`FetchError`].
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn current_block_number(&self) -> Result<u64, FetchError>;

    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, FetchError>;

    async fn address_info(&self, address: Address) -> Result<AddressInfo, FetchError>;

    /// `None` if the node does not know the transaction.
    async fn transaction_info(&self, hash: B256) -> Result<Option<TransactionInfo>, FetchError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, FetchError>;

    /// Unix timestamp of a block, `None` if the node does not have it.
    async fn block_timestamp(&self, block_number: u64) -> Result<Option<u64>, FetchError>;
}

/// [`LedgerSource`] backed by a JSON-RPC node over HTTP.
pub struct RpcLedger {
    provider: DynProvider,
    max_retries: u32,
}

impl RpcLedger {
    pub fn connect_http(url: &str, max_retries: u32) -> eyre::Result<Self> {
        let provider = ProviderBuilder::new()
            .connect_http(url.parse().map_err(|e| eyre::eyre!("Invalid RPC URL: {}", e))?)
            .erased();

        tracing::info!(max_retries, "RPC provider ready");
        Ok(Self {
            provider,
            max_retries,
        })
    }
}

#[async_trait]
impl LedgerSource for RpcLedger {
    async fn current_block_number(&self) -> Result<u64, FetchError> {
        let provider = &self.provider;
        retry_rpc(self.max_retries, || async move { provider.get_block_number().await }).await
    }

    async fn fetch_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>, FetchError> {
        let provider = &self.provider;
        let filter = query.to_filter();
        let filter = &filter;

        let logs = retry_rpc(self.max_retries, || async move { provider.get_logs(filter).await })
            .await?;

        tracing::debug!(
            from = query.from_block,
            to = ?query.to_block,
            sender = ?query.sender,
            receiver = ?query.receiver,
            logs = logs.len(),
            "Fetched logs"
        );

        Ok(logs.iter().map(RawLog::from).collect())
    }

    async fn address_info(&self, address: Address) -> Result<AddressInfo, FetchError> {
        let provider = &self.provider;
        let code = retry_rpc(self.max_retries, || async move {
            provider.get_code_at(address).await
        })
        .await?;
        let native_balance = retry_rpc(self.max_retries, || async move {
            provider.get_balance(address).await
        })
        .await?;

        Ok(AddressInfo {
            address,
            is_contract: !code.is_empty(),
            native_balance,
        })
    }

    async fn transaction_info(&self, hash: B256) -> Result<Option<TransactionInfo>, FetchError> {
        let provider = &self.provider;
        let tx = retry_rpc(self.max_retries, || async move {
            provider.get_transaction_by_hash(hash).await
        })
        .await?;
        let receipt = retry_rpc(self.max_retries, || async move {
            provider.get_transaction_receipt(hash).await
        })
        .await?;

        let (Some(tx), Some(receipt)) = (tx, receipt) else {
            tracing::debug!(tx_hash = %hash, "Transaction or receipt not found");
            return Ok(None);
        };

        Ok(Some(TransactionInfo {
            hash,
            from: receipt.from,
            to: receipt.to,
            value: tx.value(),
            gas_used: receipt.gas_used,
            gas_price: receipt.effective_gas_price,
            success: receipt.status(),
        }))
    }

    async fn gas_price(&self) -> Result<u128, FetchError> {
        let provider = &self.provider;
        retry_rpc(self.max_retries, || async move { provider.get_gas_price().await }).await
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<Option<u64>, FetchError> {
        let provider = &self.provider;
        let block = retry_rpc(self.max_retries, || async move {
            provider
                .get_block_by_number(BlockNumberOrTag::Number(block_number))
                .await
        })
        .await?;

        Ok(block.map(|b| b.header.timestamp))
    }
}

/// Retry an RPC call with exponential backoff, then give up with a [`FetchError`].
pub async fn retry_rpc<F, Fut, T, E>(max_retries: u32, mut f: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut delay = Duration::from_millis(500);

    for attempt in 0..max_retries {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "RPC call failed, retrying..."
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }
        }
    }

    // Final attempt, propagate the error
    f().await.map_err(FetchError::new)
}
